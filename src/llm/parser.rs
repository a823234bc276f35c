//! Pull a JSON object out of a completion
//!
//! Models wrap JSON in prose or code fences often enough that we never feed
//! a completion to serde directly.

/// Slice from the first `{` to the last `}`, if both exist in that order
pub fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}
