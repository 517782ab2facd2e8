//! # Utility Functions Module
//!
//! Helpers that keep external-tool argument lists readable.

/// Converts an iterable of string-like items into owned command arguments.
///
/// # Example
/// ```rust,ignore
/// let quality = 68;
/// let args = to_string_vec(["-q", &quality.to_string(), "-m", "4"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Builds a `Vec<String>` of tool arguments from mixed values.
///
/// # Example
/// ```rust,ignore
/// let args = args!["-Z", 960, input, "--out", output];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($item.to_string()),*]
    };
}
