/*!
# Frame Harness

Frame synchronization and GPU resource lifetime for a minimal real-time renderer.

This crate is backend-agnostic. It owns the frame loop logic and talks to the
GPU only through the traits in [`device`]. Backend implementations (Vulkan,
Direct3D 12, etc.) live in their own crates.

## Architecture

- **DeviceContext**: Adapter selection, logical device, direct queue, feature flags
- **PresentationSurface**: Rotating color images and the shared depth image
- **FrameSync**: One counting fence, the only blocking point (`wait_for_idle`)
- **ResourceFactory**: Buffers and textures with explicit state and heap placement
- **CommandRecorder**: One command list, reset once per frame
- **GraphicsContext**: Owns all of the above and drives one frame at a time

Exactly one frame is ever in flight: the CPU waits for the GPU at the start of
every frame before it touches any shared resource.
*/

// Internal modules
mod error;
mod config;
mod device_context;
mod frame_sync;
mod resource_factory;
mod command_recorder;
mod presentation_surface;
mod graphics_context;
pub mod log;
pub mod device;

// Main harness namespace module
pub mod harness {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{Config, DEFAULT_HEIGHT, DEFAULT_IMAGE_COUNT, DEFAULT_WIDTH};

    // Components
    pub use crate::device_context::DeviceContext;
    pub use crate::frame_sync::{spin_wait, FrameSync, WaitOutcome};
    pub use crate::resource_factory::{
        align_constant_buffer_size, validate_texture_desc, BufferState, GpuBuffer, GpuTexture,
        ImageData, ResourceFactory, CONSTANT_BUFFER_ALIGNMENT,
    };
    pub use crate::command_recorder::{CommandRecorder, RecorderState};
    pub use crate::presentation_surface::{PresentationSurface, SurfaceDesc, SurfaceState};
    pub use crate::graphics_context::{FrameOutcome, FrameRecording, GraphicsContext, StopFlag};

    // Logging sub-module (types and functions; harness_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{
            log, log_detailed, reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity,
            Logger,
        };
    }

    // Backend traits and descriptor types
    pub mod device {
        pub use crate::device::*;
    }
}
