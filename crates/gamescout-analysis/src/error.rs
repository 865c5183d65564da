use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Raised by [`crate::farthest_pair`] when fewer than two points are supplied.
    #[error("insufficient data: need at least {required} points, got {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("no categories supplied for scoring")]
    NoCategories,
}
