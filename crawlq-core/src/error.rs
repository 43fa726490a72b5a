use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Backlog store error: {0}")]
    Backlog(String),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
