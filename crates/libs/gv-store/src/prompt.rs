//! Prompt normalization and hashing.
//!
//! The producer hashes the normalized prompt, so a recorded `prompt_hash` can be checked
//! against the recorded prompt text.

use sha2::{Digest, Sha256};

/// Collapse whitespace runs to one space and format commas as `", "`.
///
/// # Examples
///
/// ```rust
/// use gv_store::prompt::normalize_prompt;
///
/// assert_eq!(normalize_prompt(" 1girl,  solo ,smile,"), "1girl, solo, smile, ");
/// ```
pub fn normalize_prompt(prompt: &str) -> String {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .split(',')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lowercase hex SHA-256 of the normalized prompt.
pub fn prompt_hash(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_prompt(prompt).as_bytes());
    format!("{:x}", hasher.finalize())
}
