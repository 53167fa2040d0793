//! Frame Harness demo
//!
//! Opens a window, uploads a small textured scene and runs the frame loop
//! until the window is closed or Escape is pressed.

mod frame_timer;
mod scene;

use frame_harness::harness::device::SurfaceHandle;
use frame_harness::harness::{
    Config, Error, FrameOutcome, GraphicsContext, Result, DEFAULT_HEIGHT, DEFAULT_WIDTH,
};
use frame_harness::{harness_error, harness_info};
use frame_harness_renderer_vulkan::VulkanBackend;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use frame_timer::FrameTimer;
use scene::DemoScene;

const WINDOW_TITLE: &str = "Frame Harness";
const TITLE_REFRESH: Duration = Duration::from_millis(500);

struct App {
    config: Config,
    // Declaration order is drop order: resources, then context, then window
    scene: Option<DemoScene>,
    context: Option<GraphicsContext>,
    window: Option<Window>,
    timer: FrameTimer,
    last_title_update: Instant,
    /// Error that ended the run (startup failure or stop reason)
    fatal: Option<Error>,
    shut_down: bool,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            scene: None,
            context: None,
            window: None,
            timer: FrameTimer::new(),
            last_title_update: Instant::now(),
            fatal: None,
            shut_down: false,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT));
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::SurfaceCreationFailed(format!("window creation failed: {}", e)))?;

        let display = window
            .display_handle()
            .map_err(|e| Error::SurfaceCreationFailed(format!("no display handle: {}", e)))?
            .as_raw();
        let surface = SurfaceHandle::new(
            display,
            window
                .window_handle()
                .map_err(|e| Error::SurfaceCreationFailed(format!("no window handle: {}", e)))?
                .as_raw(),
        );
        let size = window.inner_size();

        let mut backend = VulkanBackend::new(&self.config, display)?;
        let mut context =
            GraphicsContext::new(&mut backend, &surface, size.width, size.height, self.config.clone())?;
        let scene = DemoScene::create(&mut context)?;
        harness_info!(
            "demo",
            "{} indices, {} KiB resident",
            scene.index_count(),
            scene.resident_bytes() / 1024
        );

        self.scene = Some(scene);
        self.context = Some(context);
        self.window = Some(window);
        self.timer.reset();
        Ok(())
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(context), Some(scene)) = (self.context.as_mut(), self.scene.as_mut()) else {
            return;
        };

        self.timer.tick();
        let time_ms = self.timer.time_since_start_ms();
        let outcome = context.render_frame(|frame| {
            let aspect_ratio = frame.width as f32 / frame.height.max(1) as f32;
            scene.update(time_ms, aspect_ratio)
        });

        match outcome {
            FrameOutcome::Stopped => event_loop.exit(),
            FrameOutcome::Rendered => self.update_title(),
            FrameOutcome::Skipped => {}
        }
    }

    fn update_title(&mut self) {
        if self.last_title_update.elapsed() < TITLE_REFRESH {
            return;
        }
        self.last_title_update = Instant::now();
        if let Some(window) = &self.window {
            window.set_title(&format!(
                "{} - {:.2} ms ({:.0} fps)",
                WINDOW_TITLE,
                self.timer.delta_time_ms(),
                self.timer.fps()
            ));
        }
    }

    /// Wait for the GPU, release the scene, then tear the context down
    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(context) = self.context.as_mut() {
            if let Err(e) = context.wait_for_idle() {
                harness_error!("demo", "GPU wait before releasing the scene failed: {}", e);
            }
        }
        self.scene = None;
        if let Some(context) = self.context.take() {
            if let Some(error) = context.shutdown() {
                self.fatal.get_or_insert(error);
            }
        }
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.shut_down {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            harness_error!("demo", "startup failed: {}", e);
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(context) = &self.context {
                    context.stop_flag().request_stop();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(context) = self.context.as_mut() {
                    context.request_resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.render(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn fatal(operation: &str, message: &str) -> ! {
    eprintln!("[frame_harness] fatal: {}: {}", operation, message);
    std::process::exit(1);
}

fn main() {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => fatal("event loop creation", &e.to_string()),
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(Config::default());
    let run_result = event_loop.run_app(&mut app);
    app.shutdown();

    if let Some(error) = app.fatal.take() {
        fatal(error.operation(), error.message());
    }
    if let Err(e) = run_result {
        fatal("event loop", &e.to_string());
    }
}
