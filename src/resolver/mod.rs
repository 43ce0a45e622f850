use std::path::{Component, Path, PathBuf};

pub mod alias;
pub mod tsconfig;

/// Result of asking a resolve hook about an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The hook owns the specifier and maps it to this absolute file path.
    Resolved(PathBuf),
    /// The hook has nothing to say; the bundler should use its own resolution.
    NoOpinion,
}

/// Resolution hook installed into the bundler.
///
/// The bundler calls it once per distinct specifier it meets while walking
/// the import graph. Implementations hold only immutable state, so calls are
/// independent and may happen from any thread.
pub trait ResolveHook: Send + Sync {
    /// Resolve `specifier`, imported from the file at `importer`.
    fn resolve(&self, specifier: &str, importer: &Path) -> Resolution;
}

/// Existence oracle used while probing candidate paths.
pub trait FileSystem: Send + Sync {
    /// True only for an existing regular file. Directories, broken links and
    /// anything the OS refuses to stat count as absent.
    fn is_file(&self, path: &Path) -> bool;
}

/// [`FileSystem`] backed by the real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(metadata) => metadata.is_file(),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::debug!("treating {} as missing: {}", path.display(), err);
                }
                false
            }
        }
    }
}

/// Normalize a path by resolving `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop if there's a normal component to pop
                if components
                    .last()
                    .is_some_and(|c| matches!(c, Component::Normal(_)))
                {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}
