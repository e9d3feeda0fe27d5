use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum VecError {
    #[error("vecsim: invalid input: {0}")]
    InvalidInput(String),
}
