/// CommandRecorder - the single reusable command allocator/list pair

use crate::device::{CommandList, Queue};
use crate::device_context::DeviceContext;
use crate::error::{Error, Result};
use crate::frame_sync::FrameSync;
use crate::{harness_error, harness_trace};

/// Recording state of the command list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Closed (initial state, or closed after recording and not yet submitted)
    Closed,
    /// Open for recording
    Recording,
    /// Enqueued on the queue; reset only after the GPU is idle
    Submitted,
}

/// One command list reset once per frame
///
/// The recorder is serialized by `FrameSync`: `reset` refuses to run while
/// work enqueued since the last wait may still reference the list.
pub struct CommandRecorder {
    list: Box<dyn CommandList>,
    state: RecorderState,
    /// Closed after a recording pass, so it can be submitted once
    submittable: bool,
}

impl CommandRecorder {
    /// Create the list (closed, like a freshly created allocator/list pair)
    pub fn new(device: &DeviceContext) -> Result<Self> {
        let list = device.device().create_command_list().map_err(|e| {
            harness_error!("harness::CommandRecorder", "Failed to create command list: {}", e);
            e
        })?;
        Ok(Self {
            list,
            state: RecorderState::Closed,
            submittable: false,
        })
    }

    /// Reset the allocator and list for a new frame
    ///
    /// Must follow `FrameSync::wait_for_idle` for the current frame.
    ///
    /// # Errors
    ///
    /// `Error::CommandListResetFailed` if work was enqueued since the last
    /// wait, or if the backend reset fails.
    pub fn reset(&mut self, frame_sync: &FrameSync, queue: &dyn Queue) -> Result<()> {
        if !frame_sync.is_idle(queue) {
            harness_error!(
                "harness::CommandRecorder",
                "reset requested while GPU work is pending (wait for idle first)"
            );
            return Err(Error::CommandListResetFailed(
                "GPU work enqueued since the last wait may still use the list".to_string(),
            ));
        }

        self.list.reset().map_err(|e| {
            harness_error!("harness::CommandRecorder", "Command list reset failed: {}", e);
            match e {
                Error::CommandListResetFailed(_) => e,
                other => Error::CommandListResetFailed(other.to_string()),
            }
        })?;

        self.state = RecorderState::Recording;
        self.submittable = false;
        harness_trace!("harness::CommandRecorder", "command list reset");
        Ok(())
    }

    /// The list, for recording
    ///
    /// # Errors
    ///
    /// `Error::InvalidCommandListState` unless the recorder is `Recording`.
    pub fn list(&mut self) -> Result<&mut dyn CommandList> {
        if self.state != RecorderState::Recording {
            return Err(Error::InvalidCommandListState(format!(
                "cannot record into a {:?} command list (reset it first)",
                self.state
            )));
        }
        Ok(self.list.as_mut())
    }

    /// Finalize the recorded commands
    pub fn close(&mut self) -> Result<()> {
        if self.state != RecorderState::Recording {
            return Err(Error::CommandListCloseFailed(format!(
                "command list is {:?}, not recording",
                self.state
            )));
        }

        let result = self.list.close();
        self.state = RecorderState::Closed;
        result.map_err(|e| {
            harness_error!("harness::CommandRecorder", "Command list close failed: {}", e);
            match e {
                Error::CommandListCloseFailed(_) => e,
                other => Error::CommandListCloseFailed(other.to_string()),
            }
        })?;

        self.submittable = true;
        Ok(())
    }

    /// Enqueue the closed list on `queue`
    ///
    /// # Errors
    ///
    /// * `Error::InvalidCommandListState` - the list was not closed after a recording pass
    /// * `Error::SubmissionFailed` - the backend rejected the submission
    pub fn submit(&mut self, queue: &dyn Queue) -> Result<()> {
        if self.state != RecorderState::Closed || !self.submittable {
            return Err(Error::InvalidCommandListState(format!(
                "only a list closed after recording can be submitted (state {:?})",
                self.state
            )));
        }

        queue.submit(self.list.as_ref()).map_err(|e| {
            harness_error!("harness::CommandRecorder", "Queue submission failed: {}", e);
            match e {
                Error::SubmissionFailed(_) => e,
                other => Error::SubmissionFailed(other.to_string()),
            }
        })?;

        self.state = RecorderState::Submitted;
        self.submittable = false;
        Ok(())
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }
}

#[cfg(test)]
#[path = "command_recorder_tests.rs"]
mod tests;
