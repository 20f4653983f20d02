use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}
