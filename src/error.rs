//! Error taxonomy shared by board validation and the search engine.
//!
//! Nothing is retried internally. Whatever working set a search owns at the
//! point of failure is dropped before the error reaches the caller, and no
//! partial path is ever produced.

use thiserror::Error;

/// Every failure the solver can surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// The tile count is not a perfect square, or the side is below 3.
    #[error("invalid map size: {0} tiles do not form a square grid with side 3 or more")]
    InvalidMapSize(usize),
    /// The tiles are not a permutation of `0..N*N`.
    #[error("invalid map: {0}")]
    InvalidMap(&'static str),
    /// Start and goal lie in different permutation-parity classes.
    #[error("the puzzle is unsolvable for the selected goal layout")]
    Unsolvable,
    /// The heuristic name did not match any known heuristic.
    #[error("unknown heuristic `{0}`")]
    UnknownHeuristic(String),
    /// The caller flipped the cancellation flag.
    #[error("search cancelled")]
    Cancelled,
    /// The open set drained after a passing solvability check. A bug.
    #[error("internal error: {0}")]
    Internal(&'static str),
}
