use thiserror::Error;

/// Faults raised by the code generators.
///
/// These never escape the generation controller; they are turned into the
/// `Failed` state and shown as a message.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// A segment cannot be represented at all (character count overflow).
    #[error("segment too long")]
    SegmentTooLong,

    #[error("data length = {0} bits, max capacity = {1} bits")]
    DataOverCapacity(usize, usize),

    #[error("character {ch:?} at position {position} cannot be encoded in CODE128")]
    UnsupportedCharacter { ch: char, position: usize },

    #[error("card token is {len} characters, limit is {max}")]
    TokenTooLong { len: usize, max: usize },

    #[error("nothing to encode")]
    EmptyPayload,

    #[error("image error: {0}")]
    Image(Box<image::ImageError>),

    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("font error: {0}")]
    Font(String),

    #[error("generator task failed: {0}")]
    Task(String),
}

impl From<image::ImageError> for GenerateError {
    fn from(error: image::ImageError) -> Self {
        GenerateError::Image(Box::new(error))
    }
}

impl From<std::io::Error> for GenerateError {
    fn from(error: std::io::Error) -> Self {
        GenerateError::Io(Box::new(error))
    }
}

impl From<tokio::task::JoinError> for GenerateError {
    fn from(error: tokio::task::JoinError) -> Self {
        GenerateError::Task(error.to_string())
    }
}

/// Why a card token failed to decode. Only used for diagnostics; the public
/// decode path collapses every variant into "no card".
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token is not valid url-safe base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("token payload is not a record list: {0}")]
    Grammar(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
