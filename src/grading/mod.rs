//! Synthetic grading for submissions.

/// Entropy- or seed-driven grader.
pub mod random;
/// Grade source trait.
pub mod traits;
