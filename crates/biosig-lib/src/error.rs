//! Error taxonomy shared by the data model, the procedure contract and the analyzer.

/// Error type for every fallible operation of the core.
///
/// All variants are deterministic, input-dependent failures; nothing here is
/// worth retrying.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A time range lies outside a series' valid domain, or `begin >= end`.
    #[error("time range [{begin}, {end}) is invalid: {reason}")]
    Range {
        begin: f64,
        end: f64,
        reason: String,
    },

    /// A structural invariant does not hold (array lengths, durations).
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A procedure module is malformed, was used through the wrong entry
    /// point, or returned output that does not fit its kind.
    #[error("procedure '{name}' violates the procedure contract: {reason}")]
    ProcedureContract { name: String, reason: String },

    /// `calculate_time_range` found no span shared by every requested channel.
    #[error("no common time range: {0}")]
    EmptyIntersection(String),

    /// A channel key is already taken in the target mapping.
    #[error("{mapping} channel '{key}' already exists")]
    ChannelExists { mapping: &'static str, key: String },

    /// A request or procedure argument is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The procedure itself reported a failure.
    #[error("procedure '{name}' failed: {message}")]
    ProcedureFailed { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn range(begin: f64, end: f64, reason: impl Into<String>) -> Self {
        Self::Range {
            begin,
            end,
            reason: reason.into(),
        }
    }

    pub(crate) fn contract(name: &str, reason: impl Into<String>) -> Self {
        Self::ProcedureContract {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
