use thiserror::Error;

/// Why a mutation request was dropped.
///
/// These never escape as faults: callers get `false` back and the reason is
/// only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectedMutation {
    #[error("name is blank")]
    BlankName,
    #[error("category {0:?} is reserved")]
    ReservedCategory(String),
    #[error("category {0:?} already exists")]
    DuplicateCategory(String),
    #[error("category {0:?} does not exist")]
    UnknownCategory(String),
    #[error("index {index} out of bounds for {len} items")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("no edit session is open")]
    NoEditSession,
}
