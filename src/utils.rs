//! # Utility Functions Module
//!
//! Small helpers used when building argument vectors for external tools.

use std::ffi::OsStr;

/// Converts any iterable of string-like items to `Vec<String>`.
///
/// # Example
/// ```rust
/// use photocopy::utils::to_string_vec;
///
/// let quality = 85;
/// let args = to_string_vec(["-quality", &quality.to_string()]);
/// assert_eq!(args, vec!["-quality".to_string(), "85".to_string()]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Builds an argument vector from mixed displayable items.
///
/// ```rust
/// let percent = 30;
/// let args = photocopy::args!["-resize", format!("{}%", percent)];
/// assert_eq!(args, vec!["-resize", "30%"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$(::std::string::ToString::to_string(&$item)),*]
    };
}

/// Render an argument vector as a single line for reports.
///
/// Arguments containing whitespace or quotes are single-quoted. The result
/// is only meant to be read by humans: commands are never run through a shell.
pub fn render_command<A: AsRef<OsStr>>(program: &str, args: &[A]) -> String {
    std::iter::once(quote_arg(program))
        .chain(args.iter().map(|arg| quote_arg(&arg.as_ref().to_string_lossy())))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\' | '$' | '`' | '*' | '&' | ';'));

    if needs_quotes {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}
