// Error types shared across the engine and command boundary.

use thiserror::Error;

/// Coarse classification reported alongside command errors, so transports
/// can phrase or route failures without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: bad team spec, ambiguous item query.
    Validation,
    /// Uniqueness or duplicate-registration conflicts.
    Conflict,
    /// Operation invalid for the current draft phase.
    State,
    /// Unknown participant or item.
    NotFound,
    /// Persistence failure while committing the operation.
    Internal,
}

/// A command-triggered failure, reported synchronously to the caller and
/// never retried.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("you're already registered")]
    AlreadyRegistered,

    #[error("the draft has already started")]
    DraftAlreadyStarted,

    #[error("the draft is over")]
    DraftFinished,

    #[error("you're not registered")]
    NotRegistered,

    #[error("no participants are registered")]
    NoParticipants,

    #[error("{0}")]
    InvalidTeamSpec(String),

    #[error("the team name '{0}' is already in use")]
    NameInUse(String),

    #[error("the abbreviation '{0}' is already in use")]
    AbbreviationInUse(String),

    #[error("no item matches '{0}'")]
    NoMatch(String),

    #[error("'{query}' matches more than one item: {}", .matches.join(", "))]
    AmbiguousQuery {
        query: String,
        matches: Vec<String>,
    },

    #[error("your want list is full ({0} entries max)")]
    WantListFull(usize),

    #[error("'{0}' has already been drafted")]
    ItemAlreadyTaken(String),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::InvalidTeamSpec(_)
            | CommandError::AmbiguousQuery { .. }
            | CommandError::WantListFull(_)
            | CommandError::NoParticipants => ErrorKind::Validation,
            CommandError::AlreadyRegistered
            | CommandError::NameInUse(_)
            | CommandError::AbbreviationInUse(_)
            | CommandError::ItemAlreadyTaken(_) => ErrorKind::Conflict,
            CommandError::DraftAlreadyStarted | CommandError::DraftFinished => ErrorKind::State,
            CommandError::NotRegistered | CommandError::NoMatch(_) => ErrorKind::NotFound,
            CommandError::Persistence(_) => ErrorKind::Internal,
        }
    }
}

/// A failure inside the periodic auto-pick tick.
#[derive(Debug, Error)]
pub enum TickError {
    /// An invariant breach (e.g. a taken item still queued in a want-list).
    /// Fatal: automatic picking must halt for operator intervention rather
    /// than risk corrupting draft history.
    #[error("draft state consistency violation: {0}")]
    Consistency(String),

    /// A transient failure persisting the tick's mutations. The pick counter
    /// has not advanced; the next scheduled tick retries.
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}
