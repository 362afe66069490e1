use thiserror::Error;

/// Result type for SoundTouch operations
pub type Result<T> = std::result::Result<T, SoundTouchError>;

/// Errors that can occur when interacting with SoundTouch speakers
#[derive(Error, Debug)]
pub enum SoundTouchError {
    /// HTTP transport error (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Device answered with a non-success HTTP status
    #[error("HTTP {status} from {path}")]
    Status {
        /// Resource path that was requested
        path: String,
        /// HTTP status code returned by the device
        status: u16,
    },

    /// A status query needed to make a decision returned no usable data
    #[error("Status unavailable: {0}")]
    StatusUnavailable(String),

    /// Malformed XML document or failure to render one
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON configuration could not be deserialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No device could be resolved for the given name
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// mDNS daemon failure
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// The state update channel was closed
    #[error("Update channel closed")]
    UpdatesClosed,

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl SoundTouchError {
    /// Whether this error means the device could not be reached or did not
    /// answer usefully. The capability layer reports these as a transient
    /// communication failure.
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            SoundTouchError::Http(_)
                | SoundTouchError::Status { .. }
                | SoundTouchError::StatusUnavailable(_)
        )
    }
}
