/// The extension appended to include names that are not found as given.
pub const DEFAULT_EXTENSION: &str = ".html";

/// How deeply includes may nest before rendering fails.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;
