/// Default base URL for the local backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Normalize a configured base URL: trim whitespace, drop trailing slashes,
/// and fall back to the default when empty.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}
