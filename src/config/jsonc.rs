/// Strip JSONC syntax (`//` line comments, `/* */` block comments and
/// trailing commas) so the result parses as strict JSON.
///
/// String literals are copied verbatim, so `"https://example.com"` survives.
/// Comments are replaced by nothing, but newlines inside them are kept so
/// parse errors still report the original line numbers.
pub fn strip_comments(input: &str) -> String {
    let without_comments = strip_comment_spans(input);
    strip_trailing_commas(&without_comments)
}

fn strip_comment_spans(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                out.push('"');
                copy_string_body(&mut chars, &mut out);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Remove commas that are followed (after whitespace) by `}` or `]`.
fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                out.push('"');
                copy_string_body(&mut chars, &mut out);
            }
            ',' => {
                let rest: String = chars.clone().take_while(|c| c.is_whitespace()).collect();
                let next = chars.clone().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(',');
                }
                out.push_str(&rest);
                for _ in 0..rest.chars().count() {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Copy a string literal up to and including its closing quote.
fn copy_string_body(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == '"' {
            break;
        }
    }
}
