//! Comment hints that steer what enters a snapshot.

/// Marker that excludes the following message or service (and everything
/// nested in it) from the lock.
pub const COMMENT_SKIP: &str = "@protolock:skip";

/// A hint found in a declaration's leading comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Skip,
}

/// Returns the hint carried by a leading comment, if any. The marker may sit
/// anywhere on any line of the comment.
pub fn hint<S: AsRef<str>>(comment_lines: &[S]) -> Option<Hint> {
    comment_lines
        .iter()
        .any(|line| line.as_ref().contains(COMMENT_SKIP))
        .then_some(Hint::Skip)
}
