use crate::keymap::Key;

/// Errors from the event synthesis backends.
#[derive(Debug, thiserror::Error)]
pub enum HidError {
    /// Failed to initialize the backend.
    #[error("failed to initialize input backend: {0}")]
    Init(String),

    /// The backend has no way to perform this operation.
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    /// The operating system rejected an event.
    #[error("OS event call failed: {0}")]
    Os(String),

    /// The key has no native code on this platform.
    #[error("key {0} has no keycode on this platform")]
    UnmappedKey(Key),
}
