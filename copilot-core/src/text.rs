/// Normalizes free-text user input into an intent payload.
///
/// Returns `None` for input that is empty after trimming; such submissions must not
/// produce a transcript unit or an outbound event.
pub fn normalize_intent(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Treats empty strings the same as missing values.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
