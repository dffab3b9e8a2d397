use crate::record::Grade;

/// Exclusive upper bound of a synthesized runtime, in milliseconds.
pub const RUNTIME_LIMIT_MS: u32 = 1500;
/// Exclusive upper bound of a synthesized memory figure, in kilobytes.
pub const MEMORY_LIMIT_KB: u32 = 15_000;

/// Produces the grading metadata for a new submission. No code is run.
pub trait GradeSource: Send {
    /// Next grade.
    fn grade(&mut self) -> Grade;
}

impl<F> GradeSource for F
where
    F: FnMut() -> Grade + Send,
{
    fn grade(&mut self) -> Grade {
        self()
    }
}
