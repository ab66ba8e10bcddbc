use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not reach backend: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("unexpected response from backend: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Why a submission was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("backend is not ready")]
    NotReady,
    #[error("a question is already being answered")]
    Busy,
    #[error("Please enter a question.")]
    EmptyInput,
}
