/// GraphicsContext - explicit owner of every harness component and the frame loop
///
/// Replaces process-wide device/queue singletons: everything lives in one
/// value whose fields drop in teardown order (command objects, surface,
/// fence, queue, device).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::command_recorder::CommandRecorder;
use crate::config::Config;
use crate::device::{Backend, CommandList, ResourceState, SurfaceHandle, Texture};
use crate::device_context::DeviceContext;
use crate::error::{Error, Result};
use crate::frame_sync::{FrameSync, WaitOutcome};
use crate::presentation_surface::{PresentationSurface, SurfaceDesc};
use crate::resource_factory::{GpuTexture, ImageData, ResourceFactory};
use crate::{harness_debug, harness_error, harness_info};

// ===== STOP FLAG =====

/// Process-wide "stop running" signal
///
/// Clones share the same flag. The first error that stops the loop is kept
/// so the application can report it after teardown.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    stopped: Arc<AtomicBool>,
    error: Arc<Mutex<Option<Error>>>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a clean stop (window closed, user quit)
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Stop because of `error` (only the first error is kept)
    pub fn stop_with_error(&self, error: Error) {
        if let Ok(mut slot) = self.error.lock() {
            if slot.is_none() {
                *slot = Some(error);
            }
        }
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Error that stopped the loop, if any
    pub fn error(&self) -> Option<Error> {
        self.error.lock().ok().and_then(|slot| slot.clone())
    }
}

// ===== FRAME =====

/// Result of one `render_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame recorded, submitted and presented
    Rendered,
    /// Nothing to draw into (window minimized)
    Skipped,
    /// The stop flag is set; the loop must exit
    Stopped,
}

/// Targets and command list of the frame being recorded
pub struct FrameRecording<'a> {
    pub list: &'a mut dyn CommandList,
    /// Color image chosen by the presentation engine
    pub image_index: u32,
    /// Color target, in the `RenderTarget` state and already cleared
    pub color_target: &'a dyn Texture,
    /// Depth target, in the `DepthWrite` state and cleared to 1.0 / 0
    pub depth_target: &'a dyn Texture,
    pub width: u32,
    pub height: u32,
}

// ===== GRAPHICS CONTEXT =====

/// Device, surface, fence and command recorder driven as one frame loop
pub struct GraphicsContext {
    // Declaration order is drop order; the recorder goes first in teardown
    recorder: Option<CommandRecorder>,
    surface: PresentationSurface,
    frame_sync: FrameSync,
    device: DeviceContext,
    config: Config,
    stop: StopFlag,
    pending_resize: Option<(u32, u32)>,
    minimized: bool,
    current_image: Option<u32>,
    frame_count: u64,
    shut_down: bool,
}

impl GraphicsContext {
    /// Create the device, fence, surface and command recorder
    ///
    /// Any failure here is fatal: the caller must not enter the frame loop.
    ///
    /// # Arguments
    ///
    /// * `backend` - Graphics API backend
    /// * `surface` - Native window the presentation chain is bound to
    /// * `width` / `height` - Current window size in pixels
    /// * `config` - Harness configuration
    pub fn new(
        backend: &mut dyn Backend,
        surface: &SurfaceHandle,
        width: u32,
        height: u32,
        config: Config,
    ) -> Result<Self> {
        let device = DeviceContext::new(backend, &config)?;
        let frame_sync = FrameSync::new(&device)?;
        let surface = PresentationSurface::create(
            &device,
            surface,
            &SurfaceDesc {
                width,
                height,
                image_count: config.image_count,
                color_format: config.color_format,
                depth_format: config.depth_format,
                present_interval: config.present_interval,
                allow_tearing: config.allow_tearing,
            },
        )?;
        let recorder = CommandRecorder::new(&device)?;

        harness_info!(
            "harness::GraphicsContext",
            "graphics context ready on '{}' ({} x {}, {} images)",
            device.adapter().name, surface.width(), surface.height(), surface.image_count()
        );

        Ok(Self {
            recorder: Some(recorder),
            surface,
            frame_sync,
            device,
            config,
            stop: StopFlag::new(),
            pending_resize: None,
            minimized: false,
            current_image: None,
            frame_count: 0,
            shut_down: false,
        })
    }

    // ===== FRAME LOOP =====

    /// Run one frame: wait, reset, clear, `record`, submit, present
    ///
    /// Steady-state errors never escape: they set the stop flag, are logged
    /// at ERROR and yield `FrameOutcome::Stopped`.
    pub fn render_frame<F>(&mut self, record: F) -> FrameOutcome
    where
        F: FnOnce(&mut FrameRecording<'_>) -> Result<()>,
    {
        let recorded = match self.begin_frame() {
            Ok(Some(mut frame)) => Some(record(&mut frame)),
            Ok(None) => None,
            Err(_) => return FrameOutcome::Stopped,
        };

        match recorded {
            None if self.stop.is_stopped() => FrameOutcome::Stopped,
            None => FrameOutcome::Skipped,
            Some(Err(e)) => {
                self.fail(e);
                FrameOutcome::Stopped
            }
            Some(Ok(())) => match self.end_frame() {
                Ok(()) => FrameOutcome::Rendered,
                Err(_) => FrameOutcome::Stopped,
            },
        }
    }

    /// First half of a frame, up to and including the target clears
    ///
    /// Returns `None` when the loop is stopped or the window is minimized.
    /// The recording must be finished with `end_frame`.
    pub fn begin_frame(&mut self) -> Result<Option<FrameRecording<'_>>> {
        if self.stop.is_stopped() || self.minimized {
            return Ok(None);
        }
        if self.current_image.is_some() {
            let error = Error::InvalidCommandListState(
                "begin_frame called twice without end_frame".to_string(),
            );
            return Err(self.fail(error));
        }

        if let Err(e) = self.prepare_frame() {
            return Err(self.fail(e));
        }
        self.frame_recording().map(Some)
    }

    /// Second half of a frame: transition to present, close, submit, present
    pub fn end_frame(&mut self) -> Result<()> {
        match self.finish_frame() {
            Ok(()) => {
                self.frame_count += 1;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn prepare_frame(&mut self) -> Result<()> {
        if let Some((width, height)) = self.pending_resize.take() {
            self.surface
                .resize(&self.device, &mut self.frame_sync, width, height)?;
        }

        self.frame_sync.wait_for_idle(self.device.queue())?;
        active(&mut self.recorder)?.reset(&self.frame_sync, self.device.queue())?;
        let index = self.surface.acquire_image(&self.device, &mut self.frame_sync)?;

        let color = self.surface.color_image(index).ok_or_else(|| {
            Error::SurfaceCreationFailed(format!("color image {} is not available", index))
        })?;
        let depth = self
            .surface
            .depth_image()
            .ok_or_else(|| Error::SurfaceCreationFailed("depth image is not available".to_string()))?;

        let list = active(&mut self.recorder)?.list()?;
        list.transition(color, ResourceState::Present, ResourceState::RenderTarget)?;
        list.clear_render_target(color, self.config.clear_color)?;
        list.clear_depth_stencil(depth.raw(), 1.0, 0)?;

        self.current_image = Some(index);
        Ok(())
    }

    fn frame_recording(&mut self) -> Result<FrameRecording<'_>> {
        let image_index = self.current_image.ok_or_else(|| {
            Error::InvalidCommandListState("no frame is being recorded".to_string())
        })?;
        let color_target = self.surface.color_image(image_index).ok_or_else(|| {
            Error::SurfaceCreationFailed(format!("color image {} is not available", image_index))
        })?;
        let depth_target = self
            .surface
            .depth_image()
            .ok_or_else(|| Error::SurfaceCreationFailed("depth image is not available".to_string()))?
            .raw();
        let list = active(&mut self.recorder)?.list()?;

        Ok(FrameRecording {
            list,
            image_index,
            color_target,
            depth_target,
            width: self.surface.width(),
            height: self.surface.height(),
        })
    }

    fn finish_frame(&mut self) -> Result<()> {
        let index = self.current_image.take().ok_or_else(|| {
            Error::InvalidCommandListState("end_frame called without begin_frame".to_string())
        })?;

        let color = self.surface.color_image(index).ok_or_else(|| {
            Error::SurfaceCreationFailed(format!("color image {} is not available", index))
        })?;
        let recorder = active(&mut self.recorder)?;
        recorder
            .list()?
            .transition(color, ResourceState::RenderTarget, ResourceState::Present)?;
        recorder.close()?;
        recorder.submit(self.device.queue())?;
        self.surface
            .present_frame(self.device.queue(), self.config.present_interval)
    }

    /// Record a steady-state failure and raise the stop flag
    fn fail(&mut self, error: Error) -> Error {
        harness_error!(
            "harness::GraphicsContext",
            "Stopping frame loop after {} failure: {}",
            error.operation(), error
        );
        self.current_image = None;
        self.stop.stop_with_error(error.clone());
        error
    }

    // ===== RESIZE =====

    /// Record a new window size, applied at the start of the next frame
    ///
    /// Repeated requests before the next frame are coalesced (last one wins).
    /// A zero extent marks the window as minimized and frames are skipped.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            harness_debug!("harness::GraphicsContext", "window minimized, skipping frames");
            self.minimized = true;
            return;
        }
        self.minimized = false;
        self.pending_resize = Some((width, height));
    }

    /// Resize the surface now (waits for the GPU first)
    ///
    /// A zero extent marks the window as minimized. A failure stops the loop.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            self.minimized = true;
            return Ok(());
        }
        self.minimized = false;
        self.pending_resize = None;
        match self
            .surface
            .resize(&self.device, &mut self.frame_sync, width, height)
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    // ===== SYNCHRONIZATION AND RESOURCES =====

    /// Block until the GPU has finished all enqueued work
    pub fn wait_for_idle(&mut self) -> Result<WaitOutcome> {
        self.frame_sync.wait_for_idle(self.device.queue())
    }

    /// Buffer and texture factory on this context's device
    pub fn factory(&self) -> ResourceFactory<'_> {
        ResourceFactory::new(&self.device)
    }

    /// Synchronous texture upload (blocks until the GPU consumed the data)
    ///
    /// # Errors
    ///
    /// `Error::InvalidCommandListState` between `begin_frame` and `end_frame`:
    /// the upload submission would run ahead of the frame's own commands.
    pub fn upload_texture(&mut self, texture: &mut GpuTexture, image: &ImageData) -> Result<()> {
        if let Some(index) = self.current_image {
            harness_error!(
                "harness::GraphicsContext",
                "texture upload requested while frame image {} is being recorded",
                index
            );
            return Err(Error::InvalidCommandListState(
                "texture upload between begin_frame and end_frame".to_string(),
            ));
        }
        ResourceFactory::new(&self.device).upload_texture(&mut self.frame_sync, texture, image)
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &DeviceContext {
        &self.device
    }

    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    pub fn frame_sync(&self) -> &FrameSync {
        &self.frame_sync
    }

    /// Frame command recorder (None after shutdown)
    pub fn recorder(&self) -> Option<&CommandRecorder> {
        self.recorder.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of frames presented so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Shared handle on the stop flag (for event handlers)
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    // ===== SHUTDOWN =====

    /// Final GPU wait and orderly teardown
    ///
    /// Returns the error that stopped the loop, if any.
    pub fn shutdown(mut self) -> Option<Error> {
        self.teardown();
        self.stop.error()
    }

    fn teardown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.stop.request_stop();

        if let Err(e) = self.frame_sync.wait_for_idle(self.device.queue()) {
            harness_error!("harness::GraphicsContext", "Final GPU wait failed: {}", e);
        }
        self.current_image = None;
        self.recorder = None;
        self.surface.destroy();
        harness_info!(
            "harness::GraphicsContext",
            "graphics context shut down after {} frames",
            self.frame_count
        );
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        // Fence, queue and device drop in declaration order afterwards
        self.teardown();
    }
}

fn active(recorder: &mut Option<CommandRecorder>) -> Result<&mut CommandRecorder> {
    recorder.as_mut().ok_or_else(|| {
        Error::InvalidCommandListState("command recorder was released at shutdown".to_string())
    })
}

#[cfg(test)]
#[path = "graphics_context_tests.rs"]
mod tests;
