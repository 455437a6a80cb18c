pub mod bottle;
pub mod client;
pub mod lead;
pub mod location;
pub mod sale;

/// Trims free-text form input, mapping blank values to `None`.
pub fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
