use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use lightrays::{
    backing_size, AnimationSession, HostEvents, Listener, ListenerHandle, SessionState,
    SurfaceGeometry, WgpuBackend,
};
use rayconfig::RaysConfig;
use scheduler::{FrameScheduler, TickScheduler, TickToken};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

/// Event-loop side of the session: frame pacing plus the listener registry
/// that decides which window events get forwarded.
pub(crate) struct WindowHost {
    frames: FrameScheduler,
    listeners: HashMap<u64, Listener>,
    next_handle: u64,
}

impl WindowHost {
    pub(crate) fn new(target_fps: Option<f32>) -> Self {
        Self {
            frames: FrameScheduler::new(target_fps),
            listeners: HashMap::new(),
            next_handle: 0,
        }
    }

    pub(crate) fn is_listening(&self, listener: Listener) -> bool {
        self.listeners.values().any(|active| *active == listener)
    }

    pub(crate) fn frames(&self) -> &FrameScheduler {
        &self.frames
    }

    pub(crate) fn take_due(&mut self, now: Instant) -> Option<TickToken> {
        self.frames.take_due(now)
    }
}

impl TickScheduler for WindowHost {
    fn schedule_tick(&mut self) -> TickToken {
        self.frames.schedule_tick()
    }

    fn cancel_tick(&mut self, token: TickToken) -> bool {
        self.frames.cancel_tick(token)
    }
}

impl HostEvents for WindowHost {
    fn listen(&mut self, listener: Listener) -> ListenerHandle {
        self.next_handle += 1;
        self.listeners.insert(self.next_handle, listener);
        tracing::trace!(?listener, handle = self.next_handle, "window listener attached");
        ListenerHandle(self.next_handle)
    }

    fn unlisten(&mut self, handle: ListenerHandle) {
        self.listeners.remove(&handle.0);
    }
}

/// Session and the window its surface borrows; fields drop in order, so the
/// surface goes before the window.
struct Preview {
    session: AnimationSession<WgpuBackend, WindowHost>,
    window: Arc<Window>,
    occluded: bool,
    minimized: bool,
}

impl Preview {
    fn geometry(&self) -> SurfaceGeometry {
        geometry_for(self.window.inner_size(), self.window.scale_factor())
    }

    fn visible_fraction(&self) -> f32 {
        if self.occluded || self.minimized {
            0.0
        } else {
            1.0
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        let host = self.session.host();
        let pointer = host.is_listening(Listener::PointerMove);
        let resize = host.is_listening(Listener::Resize);
        let visibility = host.is_listening(Listener::Visibility);
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => return false,
            WindowEvent::CursorMoved { position, .. } if pointer => {
                let logical = position.to_logical::<f32>(self.window.scale_factor());
                self.session.on_pointer_move(logical.x, logical.y);
            }
            WindowEvent::Resized(size) if resize => {
                self.minimized = size.width == 0 || size.height == 0;
                let geometry = self.geometry();
                self.session.on_resize(geometry);
                self.session.on_visibility(self.visible_fraction());
            }
            WindowEvent::ScaleFactorChanged { .. } if resize => {
                let geometry = self.geometry();
                self.session.on_resize(geometry);
            }
            WindowEvent::Occluded(occluded) if visibility => {
                self.occluded = occluded;
                self.session.on_visibility(self.visible_fraction());
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if let Some(token) = self.session.host_mut().take_due(now) {
                    self.session.tick(token, now);
                }
            }
            _ => {}
        }
        true
    }

    fn control_flow(&self, now: Instant) -> ControlFlow {
        let frames = self.session.host().frames();
        if frames.ready(now) {
            tracing::trace!("scheduler: issuing redraw now");
            self.window.request_redraw();
            ControlFlow::Wait
        } else if let Some(deadline) = frames.next_deadline() {
            let ms = deadline.saturating_duration_since(now).as_millis();
            tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
            ControlFlow::WaitUntil(deadline)
        } else {
            tracing::trace!("scheduler: idle (no tick pending)");
            ControlFlow::Wait
        }
    }
}

fn geometry_for(size: PhysicalSize<u32>, scale_factor: f64) -> SurfaceGeometry {
    let logical = size.to_logical::<f32>(scale_factor);
    SurfaceGeometry::sized(logical.width, logical.height, scale_factor as f32)
}

pub fn run(config: RaysConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ))
        .with_transparent(true)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let geometry = geometry_for(window.inner_size(), window.scale_factor());
    let initial = backing_size(geometry.width, geometry.height, geometry.pixel_density);
    let mut session = AnimationSession::new(WindowHost::new(config.window.fps), config.effect);
    let state = session.activate(
        || WgpuBackend::new(window.as_ref(), initial),
        geometry,
        1.0,
        Instant::now(),
    );
    if state == SessionState::Inactive {
        let reason = session
            .last_error()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown error".to_string());
        anyhow::bail!("light rays failed to start: {reason}");
    }

    let mut preview = Preview {
        session,
        window,
        occluded: false,
        minimized: false,
    };
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == preview.window.id() => {
            if !preview.handle_window_event(event) {
                preview.session.deactivate();
                elwt.exit();
            }
        }
        Event::AboutToWait => {
            elwt.set_control_flow(preview.control_flow(Instant::now()));
        }
        Event::LoopExiting => {
            preview.session.deactivate();
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
