use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::tsconfig::AliasTable;
use super::{FileSystem, OsFileSystem, Resolution, ResolveHook};

/// Extensions probed, in priority order, when an alias target has none.
pub const PROBE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".json"];

/// Extensions trusted as-is on an alias target; such targets are never probed.
const RECOGNIZED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "json", "mts", "cts", "mjs", "cjs", "css",
];

/// Resolves tsconfig `paths` aliases for the bundler.
///
/// Specifiers that match no alias key are rejected without touching the
/// filesystem. Matching specifiers are rewritten through the alias table and
/// then probed: `<candidate><ext>` for every extension first, then
/// `<candidate>/index<ext>`. Anything that cannot be pinned to a regular file
/// is left to the bundler.
pub struct AliasResolutionPlugin {
    table: AliasTable,
    fs: Box<dyn FileSystem>,
}

impl AliasResolutionPlugin {
    /// Create a plugin probing the real filesystem.
    pub fn new(table: AliasTable) -> Self {
        Self::with_file_system(table, Box::new(OsFileSystem))
    }

    /// Create a plugin probing through the given existence oracle.
    pub fn with_file_system(table: AliasTable, fs: Box<dyn FileSystem>) -> Self {
        AliasResolutionPlugin { table, fs }
    }
}

impl ResolveHook for AliasResolutionPlugin {
    fn resolve(&self, specifier: &str, _importer: &Path) -> Resolution {
        if !self.table.matches(specifier) {
            return Resolution::NoOpinion;
        }

        let candidate = match self.table.lookup(specifier) {
            Some(candidate) => candidate,
            None => return Resolution::NoOpinion,
        };

        if has_recognized_extension(&candidate) {
            log::debug!("{} -> {} (explicit extension)", specifier, candidate.display());
            return Resolution::Resolved(candidate);
        }

        match probe(&candidate, PROBE_EXTENSIONS, self.fs.as_ref()) {
            Some(resolved) => {
                log::debug!("{} -> {}", specifier, resolved.display());
                Resolution::Resolved(resolved)
            }
            None => {
                log::debug!(
                    "{} matched an alias but nothing exists at {}",
                    specifier,
                    candidate.display()
                );
                Resolution::NoOpinion
            }
        }
    }
}

/// Probe `candidate` for an existing regular file.
///
/// Tries every extension appended directly to the candidate, then every
/// extension on `<candidate>/index`. The first hit wins.
pub fn probe(candidate: &Path, extensions: &[&str], fs: &dyn FileSystem) -> Option<PathBuf> {
    let direct = extensions
        .iter()
        .map(|ext| with_suffix(candidate, ext))
        .find(|path| fs.is_file(path));
    if direct.is_some() {
        return direct;
    }

    extensions
        .iter()
        .map(|ext| candidate.join(format!("index{ext}")))
        .find(|path| fs.is_file(path))
}

/// Whether the path already ends in an extension we hand over unprobed.
pub fn has_recognized_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RECOGNIZED_EXTENSIONS.contains(&ext))
}

/// Append `suffix` to the final component without treating it as an extension swap.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory filesystem that counts every existence check.
    #[derive(Default)]
    struct MemoryFs {
        files: HashSet<PathBuf>,
        checks: Arc<AtomicUsize>,
    }

    impl MemoryFs {
        fn with_files(files: &[&str]) -> Self {
            MemoryFs {
                files: files.iter().map(PathBuf::from).collect(),
                checks: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FileSystem for MemoryFs {
        fn is_file(&self, path: &Path) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.files.contains(path)
        }
    }

    fn alias_table(paths: &str) -> AliasTable {
        let value: serde_json::Value = serde_json::from_str(paths).unwrap();
        AliasTable::from_config(value.as_object(), Some(Path::new("/project")), Path::new("/project"))
            .unwrap()
    }

    fn plugin(files: &[&str]) -> (AliasResolutionPlugin, Arc<AtomicUsize>) {
        let fs = MemoryFs::with_files(files);
        let checks = Arc::clone(&fs.checks);
        let table = alias_table(r#"{ "@/*": ["src/*"], "config": ["src/config"] }"#);
        (AliasResolutionPlugin::with_file_system(table, Box::new(fs)), checks)
    }

    fn importer() -> &'static Path {
        Path::new("/project/src/index.ts")
    }

    // -------------------------------------------------------
    // probe
    // -------------------------------------------------------

    #[test]
    fn test_probe_extension_order() {
        let fs = MemoryFs::with_files(&["/p/util.js", "/p/util.tsx", "/p/util.json"]);
        assert_eq!(
            probe(Path::new("/p/util"), PROBE_EXTENSIONS, &fs),
            Some(PathBuf::from("/p/util.tsx"))
        );
    }

    #[test]
    fn test_probe_direct_file_beats_index() {
        let fs = MemoryFs::with_files(&["/p/util.json", "/p/util/index.ts"]);
        assert_eq!(
            probe(Path::new("/p/util"), PROBE_EXTENSIONS, &fs),
            Some(PathBuf::from("/p/util.json"))
        );
    }

    #[test]
    fn test_probe_index_fallback() {
        let fs = MemoryFs::with_files(&["/p/services/index.jsx", "/p/services/index.js"]);
        assert_eq!(
            probe(Path::new("/p/services"), PROBE_EXTENSIONS, &fs),
            Some(PathBuf::from("/p/services/index.js"))
        );
    }

    #[test]
    fn test_probe_miss() {
        let fs = MemoryFs::with_files(&["/p/other.ts"]);
        assert_eq!(probe(Path::new("/p/util"), PROBE_EXTENSIONS, &fs), None);
        assert_eq!(fs.checks.load(Ordering::SeqCst), PROBE_EXTENSIONS.len() * 2);
    }

    #[test]
    fn test_probe_keeps_dotted_names() {
        let fs = MemoryFs::with_files(&["/p/user.service.ts"]);
        assert_eq!(
            probe(Path::new("/p/user.service"), PROBE_EXTENSIONS, &fs),
            Some(PathBuf::from("/p/user.service.ts"))
        );
    }

    #[test]
    fn test_probe_custom_extension_list() {
        let fs = MemoryFs::with_files(&["/p/a.ts", "/p/a.js"]);
        assert_eq!(
            probe(Path::new("/p/a"), &[".js", ".ts"], &fs),
            Some(PathBuf::from("/p/a.js"))
        );
    }

    // -------------------------------------------------------
    // plugin
    // -------------------------------------------------------

    #[test]
    fn test_resolves_alias_to_direct_file() {
        let (plugin, _) = plugin(&["/project/src/utils/format.ts"]);
        assert_eq!(
            plugin.resolve("@/utils/format", importer()),
            Resolution::Resolved(PathBuf::from("/project/src/utils/format.ts"))
        );
    }

    #[test]
    fn test_resolves_alias_to_index_file() {
        let (plugin, _) = plugin(&["/project/src/components/index.tsx"]);
        assert_eq!(
            plugin.resolve("@/components", importer()),
            Resolution::Resolved(PathBuf::from("/project/src/components/index.tsx"))
        );
    }

    #[test]
    fn test_exact_alias() {
        let (plugin, _) = plugin(&["/project/src/config/index.ts"]);
        assert_eq!(
            plugin.resolve("config", importer()),
            Resolution::Resolved(PathBuf::from("/project/src/config/index.ts"))
        );
    }

    #[test]
    fn test_explicit_extension_is_trusted_without_probing() {
        let (plugin, checks) = plugin(&[]);
        assert_eq!(
            plugin.resolve("@/data/users.json", importer()),
            Resolution::Resolved(PathBuf::from("/project/src/data/users.json"))
        );
        assert_eq!(checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_non_matching_specifier_touches_no_files() {
        let (plugin, checks) = plugin(&["/project/src/react.ts"]);
        for specifier in ["react", "./local", "../up", "@scope/pkg", "configuration"] {
            assert_eq!(plugin.resolve(specifier, importer()), Resolution::NoOpinion);
        }
        assert_eq!(checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unresolvable_alias_has_no_opinion() {
        let (plugin, checks) = plugin(&[]);
        assert_eq!(plugin.resolve("@/missing", importer()), Resolution::NoOpinion);
        assert_eq!(checks.load(Ordering::SeqCst), PROBE_EXTENSIONS.len() * 2);
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        let fs = MemoryFs::with_files(&["/project/src/a.ts"]);
        let checks = Arc::clone(&fs.checks);
        let plugin = AliasResolutionPlugin::with_file_system(AliasTable::empty(), Box::new(fs));
        assert_eq!(plugin.resolve("@/a", importer()), Resolution::NoOpinion);
        assert_eq!(plugin.resolve("a", importer()), Resolution::NoOpinion);
        assert_eq!(checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_calls_are_independent() {
        let (plugin, _) = plugin(&["/project/src/a.ts"]);
        let first = plugin.resolve("@/a", importer());
        let second = plugin.resolve("@/a", Path::new("/project/src/deep/other.ts"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_has_recognized_extension() {
        assert!(has_recognized_extension(Path::new("/p/a.ts")));
        assert!(has_recognized_extension(Path::new("/p/styles.css")));
        assert!(!has_recognized_extension(Path::new("/p/a")));
        assert!(!has_recognized_extension(Path::new("/p/user.service")));
    }

    #[test]
    fn test_resolves_on_real_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/lib")).unwrap();
        std::fs::write(dir.path().join("src/lib/index.ts"), "export {};").unwrap();

        let value: serde_json::Value = serde_json::from_str(r#"{ "@lib": ["src/lib"] }"#).unwrap();
        let table = AliasTable::from_config(value.as_object(), None, dir.path()).unwrap();
        let plugin = AliasResolutionPlugin::new(table);

        assert_eq!(
            plugin.resolve("@lib", &dir.path().join("src/main.ts")),
            Resolution::Resolved(dir.path().join("src/lib/index.ts"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_errors_count_as_missing() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let dir = tempfile::TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/index.ts"), "export {};").unwrap();
        // lib.ts points into a directory nobody may search
        symlink(locked.join("lib.ts"), dir.path().join("lib.ts")).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let fs = OsFileSystem;
        assert_eq!(
            probe(&dir.path().join("lib"), PROBE_EXTENSIONS, &fs),
            Some(dir.path().join("lib/index.ts"))
        );
        assert_eq!(probe(&locked.join("mod"), PROBE_EXTENSIONS, &fs), None);

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
