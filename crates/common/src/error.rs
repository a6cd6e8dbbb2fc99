use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported Content-Type")]
    UnsupportedContentType,

    #[error("Full Name and Email are required")]
    MissingRequiredFields,

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Upload exceeds the maximum allowed size of {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Attachment store error: {0}")]
    AttachmentStore(String),

    #[error("Ticket number {0} is already assigned")]
    DuplicateTicket(u64),

    #[error("Storage operation timed out: {0}")]
    Timeout(&'static str),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's request rather than a
    /// failing dependency. Input errors are raised before any side effect.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedContentType
                | Error::MissingRequiredFields
                | Error::InvalidField { .. }
                | Error::MalformedBody(_)
                | Error::PayloadTooLarge(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
