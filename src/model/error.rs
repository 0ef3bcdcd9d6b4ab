use thiserror::Error;

// Request payload validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Title must be 1 to 200 characters, got {0}.")]
    InvalidTitle(usize),
    #[error("Field `done` must be an explicit boolean.")]
    MissingDone,
}
