//! Route patterns as written in the route table, converted to axum paths.
//!
//! | stored pattern      | axum path        |
//! |---------------------|------------------|
//! | `/page/{id}`        | `/page/{id}`     |
//! | `/page/{id:\d+}`    | `/page/{id}`     |
//! | `/files/*rest`      | `/files/{*rest}` |
//! | `about`             | `/about`         |

/// Convert a stored pattern into an axum path.
///
/// Regex constraints cannot be expressed in axum paths and are dropped with a
/// warning; the handler still receives the parameter.
pub fn to_axum_path(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('/') {
        out.push('/');
    }

    let mut chars = pattern.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '{' => {
                let mut body = String::new();
                let mut depth = 1usize;
                for (_, inner) in chars.by_ref() {
                    match inner {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    body.push(inner);
                }
                let name = match body.split_once(':') {
                    Some((name, regex)) => {
                        tracing::warn!(
                            pattern,
                            param = name,
                            regex,
                            "regex constraint dropped from route pattern"
                        );
                        name
                    }
                    None => body.as_str(),
                };
                out.push('{');
                out.push_str(name.trim());
                out.push('}');
            }
            '*' if index == 0 || pattern[..index].ends_with('/') => {
                let rest: String = chars.by_ref().map(|(_, c)| c).collect();
                out.push_str("{*");
                out.push_str(&rest);
                out.push('}');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Reject converted paths that axum refuses outright: empty parameter names
/// and segments still starting with `:` or `*`.
pub fn check_axum_path(path: &str) -> Result<(), String> {
    for segment in path.split('/').skip(1) {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(format!("segment `{segment}` uses an unsupported parameter syntax"));
        }
        if segment.contains("{}") || segment.contains("{*}") {
            return Err(format!("segment `{segment}` has an empty parameter name"));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
