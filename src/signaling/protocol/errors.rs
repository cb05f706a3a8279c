use std::fmt;

/// Why an inbound frame was discarded.
#[derive(Debug)]
pub enum ProtoError {
    /// Not JSON, not a JSON object, or a known field has the wrong JSON type.
    InvalidJson(serde_json::Error),
    /// Binary frame that is not UTF-8 text.
    InvalidUtf8,
    /// Parsed, but missing something a message of its type requires.
    InvalidFormat(&'static str),
    /// An outbound frame could not be serialized.
    Encode(serde_json::Error),
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(e) => write!(f, "invalid JSON frame: {e}"),
            Self::InvalidUtf8 => write!(f, "binary frame is not valid UTF-8"),
            Self::InvalidFormat(what) => write!(f, "malformed frame: {what}"),
            Self::Encode(e) => write!(f, "failed to encode outbound frame: {e}"),
        }
    }
}

impl std::error::Error for ProtoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidJson(e) | Self::Encode(e) => Some(e),
            Self::InvalidUtf8 | Self::InvalidFormat(_) => None,
        }
    }
}

impl From<serde_json::Error> for ProtoError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidJson(e)
    }
}
