use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            CodecError::Decode(err.to_string())
        } else {
            CodecError::Encode(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
