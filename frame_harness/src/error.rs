//! Error types for the frame harness
//!
//! Every construction, resize, allocation and submission operation returns
//! a [`Result`]. Each variant names the operation that failed and carries a
//! human-readable context message.

use std::fmt;

/// Result type for frame harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame harness errors
#[derive(Debug, Clone)]
pub enum Error {
    /// No adapter met the minimum capability level (software adapters excluded)
    AdapterSelectionFailed(String),

    /// A capable adapter was found but the logical device could not be created
    DeviceCreationFailed(String),

    /// The direct submission queue could not be created
    QueueCreationFailed(String),

    /// The presentation chain or its images could not be created
    SurfaceCreationFailed(String),

    /// The presentation chain could not be rebuilt at the new size
    SurfaceResizeFailed(String),

    /// The presentation chain no longer matches its window and must be rebuilt
    /// before the next image can be acquired
    SurfaceOutOfDate(String),

    /// A buffer or texture allocation failed
    ResourceAllocationFailed(String),

    /// Map/unmap/write on a buffer in the wrong state
    InvalidBufferState(String),

    /// The command allocator/list could not be reset for recording
    CommandListResetFailed(String),

    /// The command list could not be closed
    CommandListCloseFailed(String),

    /// A resource descriptor violates a creation precondition
    InvalidDescriptor(String),

    /// Command list used outside the recording state
    InvalidCommandListState(String),

    /// Queue submission, fence signal or present failed
    SubmissionFailed(String),

    /// Any other backend failure (Vulkan, Direct3D, etc.)
    BackendError(String),
}

impl Error {
    /// Short name of the operation that failed
    ///
    /// Used for the one-line diagnostic printed before a non-zero exit.
    pub fn operation(&self) -> &'static str {
        match self {
            Error::AdapterSelectionFailed(_) => "adapter selection",
            Error::DeviceCreationFailed(_) => "device creation",
            Error::QueueCreationFailed(_) => "queue creation",
            Error::SurfaceCreationFailed(_) => "surface creation",
            Error::SurfaceResizeFailed(_) => "surface resize",
            Error::SurfaceOutOfDate(_) => "image acquisition",
            Error::ResourceAllocationFailed(_) => "resource allocation",
            Error::InvalidBufferState(_) => "buffer access",
            Error::CommandListResetFailed(_) => "command list reset",
            Error::CommandListCloseFailed(_) => "command list close",
            Error::InvalidDescriptor(_) => "resource descriptor validation",
            Error::InvalidCommandListState(_) => "command recording",
            Error::SubmissionFailed(_) => "queue submission",
            Error::BackendError(_) => "backend",
        }
    }

    /// Context message attached to the error
    pub fn message(&self) -> &str {
        match self {
            Error::AdapterSelectionFailed(msg)
            | Error::DeviceCreationFailed(msg)
            | Error::QueueCreationFailed(msg)
            | Error::SurfaceCreationFailed(msg)
            | Error::SurfaceResizeFailed(msg)
            | Error::SurfaceOutOfDate(msg)
            | Error::ResourceAllocationFailed(msg)
            | Error::InvalidBufferState(msg)
            | Error::CommandListResetFailed(msg)
            | Error::CommandListCloseFailed(msg)
            | Error::InvalidDescriptor(msg)
            | Error::InvalidCommandListState(msg)
            | Error::SubmissionFailed(msg)
            | Error::BackendError(msg) => msg,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AdapterSelectionFailed(msg) => write!(f, "Adapter selection failed: {}", msg),
            Error::DeviceCreationFailed(msg) => write!(f, "Device creation failed: {}", msg),
            Error::QueueCreationFailed(msg) => write!(f, "Queue creation failed: {}", msg),
            Error::SurfaceCreationFailed(msg) => write!(f, "Surface creation failed: {}", msg),
            Error::SurfaceResizeFailed(msg) => write!(f, "Surface resize failed: {}", msg),
            Error::SurfaceOutOfDate(msg) => write!(f, "Surface out of date: {}", msg),
            Error::ResourceAllocationFailed(msg) => write!(f, "Resource allocation failed: {}", msg),
            Error::InvalidBufferState(msg) => write!(f, "Invalid buffer state: {}", msg),
            Error::CommandListResetFailed(msg) => write!(f, "Command list reset failed: {}", msg),
            Error::CommandListCloseFailed(msg) => write!(f, "Command list close failed: {}", msg),
            Error::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {}", msg),
            Error::InvalidCommandListState(msg) => write!(f, "Invalid command list state: {}", msg),
            Error::SubmissionFailed(msg) => write!(f, "Submission failed: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR (with file:line) and build an `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use frame_harness::harness_err;
/// let err = harness_err!("harness::vulkan", "vkQueueSubmit failed: {}", -4);
/// ```
#[macro_export]
macro_rules! harness_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::harness_error!($source, "{}", message);
        $crate::harness::Error::BackendError(message)
    }};
}

/// Log an ERROR (with file:line) and return early with `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use frame_harness::harness_bail;
/// fn check(index: u32) -> frame_harness::harness::Result<()> {
///     if index > 3 {
///         harness_bail!("harness::vulkan", "image index {} out of range", index);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! harness_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::harness_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
