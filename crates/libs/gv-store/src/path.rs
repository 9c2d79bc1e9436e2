//! Syntactic policy for caller-supplied relative paths.
//!
//! [`sanitize`] is pure and total: it never touches the filesystem and returns either a
//! normalized [`SafeRelativePath`] or the first [`Rejection`] that applies.

use std::fmt;

use serde::Serialize;

/// Reason a relative path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Empty or whitespace only.
    Empty,
    /// Contains a NUL byte.
    NullByte,
    /// Contains `%`; percent-encoded segments are never accepted.
    EncodedChars,
    /// Contains a backslash.
    Backslash,
    /// Absolute under POSIX or Windows conventions.
    Absolute,
    /// Starts with a drive prefix such as `c:`.
    DriveLetter,
    /// Contains `//`, or a leading or trailing `/`.
    EmptySegment,
    /// Contains a `.` or `..` segment.
    DotSegment,
    /// Normalizes to a location outside the base.
    Escapes,
    /// Resolved outside the root directory.
    RootEscape,
}

impl Rejection {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::NullByte => "null_byte",
            Rejection::EncodedChars => "encoded_chars",
            Rejection::Backslash => "backslash",
            Rejection::Absolute => "absolute",
            Rejection::DriveLetter => "drive_letter",
            Rejection::EmptySegment => "empty_segment",
            Rejection::DotSegment => "dot_segment",
            Rejection::Escapes => "escapes",
            Rejection::RootEscape => "root_escape",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relative path that passed [`sanitize`].
///
/// Segments are separated by `/`, none is empty, `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeRelativePath(String);

impl SafeRelativePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl AsRef<str> for SafeRelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeRelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate `candidate` against the relative path policy.
///
/// Checks run in a fixed order and the first failing one is reported:
/// empty, NUL, `%`, backslash, absolute, drive prefix, empty segment, dot segment, escape.
/// The caller is expected to have removed exactly one layer of percent-encoding already.
///
/// # Examples
///
/// ```rust
/// use gv_store::path::{Rejection, sanitize};
///
/// assert_eq!(sanitize("images/x0-y0.png").unwrap().as_str(), "images/x0-y0.png");
/// assert_eq!(sanitize("..%2fsecret"), Err(Rejection::EncodedChars));
/// ```
pub fn sanitize(candidate: &str) -> Result<SafeRelativePath, Rejection> {
    if candidate.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    if candidate.contains('\0') {
        return Err(Rejection::NullByte);
    }
    if candidate.contains('%') {
        return Err(Rejection::EncodedChars);
    }
    if candidate.contains('\\') {
        return Err(Rejection::Backslash);
    }
    if is_absolute(candidate) {
        return Err(Rejection::Absolute);
    }
    if has_drive_prefix(candidate) {
        return Err(Rejection::DriveLetter);
    }

    let segments: Vec<&str> = candidate.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(Rejection::EmptySegment);
    }
    if segments
        .iter()
        .any(|segment| *segment == "." || *segment == "..")
    {
        return Err(Rejection::DotSegment);
    }

    let normalized = normalize(&segments);
    if normalized == "."
        || normalized == ".."
        || normalized.starts_with("../")
        || normalized.contains("/../")
    {
        return Err(Rejection::Escapes);
    }
    Ok(SafeRelativePath(normalized))
}

fn is_absolute(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    candidate.starts_with('/')
        || (bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/')
}

fn has_drive_prefix(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Lexical normalization: drop `.`, fold `name/..`, keep unmatched `..`.
fn normalize(segments: &[&str]) -> String {
    let mut stack: Vec<&str> = Vec::with_capacity(segments.len());
    for segment in segments {
        match *segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(last) if *last != ".." => {
                    stack.pop();
                }
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        String::from(".")
    } else {
        stack.join("/")
    }
}
