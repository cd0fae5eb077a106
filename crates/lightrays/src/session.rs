use std::time::{Duration, Instant};

use scheduler::{TickScheduler, TickToken};
use tracing::{debug, trace, warn};

use crate::backend::{BufferId, GraphicsBackend, ProgramId, UniformValue};
use crate::color::hex_to_rgb;
use crate::host::{HostEvents, Subscriptions};
use crate::origin::resolve_anchor_and_direction;
use crate::pointer::PointerTracker;
use crate::program::{ProgramBuilder, ProgramError};
use crate::resize::ResizeController;
use crate::shaders::{FRAGMENT_SHADER, QUAD_VERTICES, VERTEX_SHADER};
use crate::types::{RenderConfig, SurfaceGeometry};
use crate::uniforms::{self, UniformTable, UNIFORM_NAMES};
use crate::visibility::{VisibilityGate, VisibilityTransition};

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of an [`AnimationSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Initializing,
    /// Visible with a tick pending.
    Running,
    /// Resources held, loop stopped because the surface is off screen.
    Paused,
    TearingDown,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("graphics context unavailable: {0}")]
    ContextUnavailable(String),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("failed to upload quad vertices: {log}")]
    Buffer { log: String },
}

/// GPU objects owned by one activation.
struct Resources<B> {
    backend: B,
    program: ProgramId,
    buffer: BufferId,
    uniforms: UniformTable,
    resize: ResizeController,
    started_at: Instant,
}

#[derive(Debug, Default)]
struct FrameCounter {
    frames: u32,
    window_start: Option<Instant>,
}

impl FrameCounter {
    fn record(&mut self, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.frames = self.frames.saturating_add(1);
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= FPS_LOG_INTERVAL {
            let fps = self.frames as f32 / elapsed.as_secs_f32();
            debug!(fps = %format!("{fps:.1}"), frames = self.frames, "light rays frame rate");
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Drives the light rays effect on one surface.
///
/// The session owns every GPU handle for the effect and the host listeners
/// that feed it. Ticks are requested from the host through
/// [`TickScheduler::schedule_tick`]; the host hands the token back via
/// [`AnimationSession::tick`] when the frame is due.
///
/// ```text
///   activate ─▶ Initializing ─▶ Paused ⇄ Running ─▶ deactivate ─▶ Inactive
///                    │ failure                          (also on drop)
///                    └──────────────▶ Inactive
/// ```
pub struct AnimationSession<B: GraphicsBackend, H: TickScheduler + HostEvents> {
    host: H,
    state: SessionState,
    config: RenderConfig,
    resources: Option<Resources<B>>,
    subscriptions: Option<Subscriptions>,
    pending_tick: Option<TickToken>,
    pointer: PointerTracker,
    visibility: VisibilityGate,
    frames: FrameCounter,
    last_error: Option<SessionError>,
}

impl<B: GraphicsBackend, H: TickScheduler + HostEvents> AnimationSession<B, H> {
    pub fn new(host: H, config: RenderConfig) -> Self {
        Self {
            host,
            state: SessionState::Inactive,
            config: config.sanitized(),
            resources: None,
            subscriptions: None,
            pending_tick: None,
            pointer: PointerTracker::new(),
            visibility: VisibilityGate::new(),
            frames: FrameCounter::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Failure recorded by the most recent activation, if any.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn backend(&self) -> Option<&B> {
        self.resources.as_ref().map(|resources| &resources.backend)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Paused)
    }

    /// Mounts the effect on a surface.
    ///
    /// `acquire` produces the graphics backend. Any failure along the way is
    /// logged, stored in [`AnimationSession::last_error`], and leaves the
    /// session `Inactive` with nothing held. Activating an active session is a
    /// no-op.
    pub fn activate<F>(
        &mut self,
        acquire: F,
        geometry: SurfaceGeometry,
        visible_fraction: f32,
        now: Instant,
    ) -> SessionState
    where
        F: FnOnce() -> anyhow::Result<B>,
    {
        if self.state != SessionState::Inactive {
            debug!(state = ?self.state, "light rays session already active");
            return self.state;
        }
        self.state = SessionState::Initializing;
        self.last_error = None;

        let resources = match acquire() {
            Ok(backend) => Self::initialise(backend, geometry, now),
            Err(err) => Err(SessionError::ContextUnavailable(format!("{err:#}"))),
        };
        let resources = match resources {
            Ok(resources) => resources,
            Err(err) => {
                warn!(error = %err, "light rays effect disabled");
                self.last_error = Some(err);
                self.state = SessionState::Inactive;
                return self.state;
            }
        };

        self.resources = Some(resources);
        self.pointer.reset();
        self.visibility.reset();
        self.frames.reset();
        self.subscriptions = Some(Subscriptions::start(&mut self.host));
        self.state = SessionState::Paused;
        debug!(
            width = geometry.width,
            height = geometry.height,
            density = geometry.pixel_density,
            "light rays session activated"
        );

        self.on_visibility(visible_fraction);
        self.state
    }

    fn initialise(
        mut backend: B,
        geometry: SurfaceGeometry,
        now: Instant,
    ) -> Result<Resources<B>, SessionError> {
        let program = ProgramBuilder::new(&mut backend).build(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let uniforms = UniformTable::build(&mut backend, program, &UNIFORM_NAMES);
        let buffer = match backend.create_vertex_buffer(&QUAD_VERTICES) {
            Ok(buffer) => buffer,
            Err(log) => {
                backend.delete_program(program);
                return Err(SessionError::Buffer { log });
            }
        };
        let mut resize = ResizeController::new(geometry);
        resize.apply_pending(&mut backend);
        Ok(Resources {
            backend,
            program,
            buffer,
            uniforms,
            resize,
            started_at: now,
        })
    }

    /// Replaces the configuration; the next tick renders with it.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config.sanitized();
        trace!(config = ?self.config, "light rays config replaced");
    }

    /// Pointer position in the host's top-down logical coordinates.
    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        let Some(resources) = &self.resources else {
            return;
        };
        if !self.pointer.record(x, y, resources.resize.geometry()) {
            trace!(x, y, "pointer outside light rays surface");
        }
    }

    /// New on-screen geometry; applied at the start of the next tick.
    pub fn on_resize(&mut self, geometry: SurfaceGeometry) {
        if let Some(resources) = &mut self.resources {
            resources.resize.request(geometry);
        }
    }

    /// Latest intersection ratio between the surface and the viewport.
    pub fn on_visibility(&mut self, intersection_ratio: f32) {
        if !self.is_active() {
            return;
        }
        match self.visibility.observe(intersection_ratio) {
            Some(VisibilityTransition::Shown) => {
                if self.pending_tick.is_none() {
                    self.pending_tick = Some(self.host.schedule_tick());
                }
                self.state = SessionState::Running;
                debug!("light rays visible; animation resumed");
            }
            Some(VisibilityTransition::Hidden) => {
                self.cancel_pending_tick();
                self.state = SessionState::Paused;
                debug!("light rays hidden; animation paused");
            }
            None => {}
        }
    }

    /// Runs one frame for `token`. Tokens the session no longer waits on are
    /// ignored and `false` is returned.
    pub fn tick(&mut self, token: TickToken, now: Instant) -> bool {
        if self.pending_tick != Some(token) {
            trace!(token = token.id(), "ignoring stale light rays tick");
            return false;
        }
        self.pending_tick = None;
        if self.state != SessionState::Running {
            return false;
        }

        self.render_frame(now);
        self.frames.record(now);
        self.pending_tick = Some(self.host.schedule_tick());
        true
    }

    fn render_frame(&mut self, now: Instant) {
        let Some(resources) = &mut self.resources else {
            return;
        };
        let backend = &mut resources.backend;
        let Some(size) = resources.resize.apply_pending(backend) else {
            return;
        };
        let pointer = self.pointer.advance();
        let [width, height] = size.backing.as_f32();
        let placement = resolve_anchor_and_direction(self.config.origin, width, height);
        let config = &self.config;
        let elapsed = now.saturating_duration_since(resources.started_at).as_secs_f32();

        let table = &resources.uniforms;
        let values = [
            (uniforms::U_TIME, UniformValue::Float(elapsed)),
            (uniforms::U_RESOLUTION, UniformValue::Vec2([width, height])),
            (uniforms::U_ANCHOR, UniformValue::Vec2(placement.anchor)),
            (uniforms::U_DIRECTION, UniformValue::Vec2(placement.direction)),
            (uniforms::U_COLOR, UniformValue::Vec3(hex_to_rgb(&config.color))),
            (uniforms::U_SPEED, UniformValue::Float(config.speed)),
            (uniforms::U_SPREAD, UniformValue::Float(config.spread)),
            (uniforms::U_LENGTH, UniformValue::Float(config.length)),
            (uniforms::U_POINTER, UniformValue::Vec2(pointer.as_array())),
            (
                uniforms::U_POINTER_INFLUENCE,
                UniformValue::Float(config.effective_pointer_influence()),
            ),
            (uniforms::U_NOISE, UniformValue::Float(config.noise_amount)),
            (uniforms::U_DISTORTION, UniformValue::Float(config.distortion)),
            (
                uniforms::U_PULSATING,
                UniformValue::Float(if config.pulsating { 1.0 } else { 0.0 }),
            ),
            (uniforms::U_FADE_DISTANCE, UniformValue::Float(config.fade_distance)),
            (uniforms::U_SATURATION, UniformValue::Float(config.saturation)),
        ];
        for (name, value) in values {
            table.set(backend, name, value);
        }

        if let Err(err) = backend.draw(resources.program, resources.buffer, QUAD_VERTICES.len() as u32) {
            warn!(error = %format!("{err:#}"), "light rays draw failed");
        }
    }

    fn cancel_pending_tick(&mut self) {
        if let Some(token) = self.pending_tick.take() {
            if !self.host.cancel_tick(token) {
                trace!(token = token.id(), "tick already consumed by host");
            }
        }
    }

    /// Releases everything the session holds. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        if self.state == SessionState::Inactive && self.resources.is_none() {
            return;
        }
        self.state = SessionState::TearingDown;
        self.cancel_pending_tick();
        if let Some(subscriptions) = self.subscriptions.take() {
            subscriptions.stop(&mut self.host);
        }
        if let Some(mut resources) = self.resources.take() {
            resources.backend.delete_program(resources.program);
            resources.backend.delete_buffer(resources.buffer);
        }
        self.visibility.reset();
        self.state = SessionState::Inactive;
        debug!("light rays session torn down");
    }
}

impl<B: GraphicsBackend, H: TickScheduler + HostEvents> Drop for AnimationSession<B, H> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::ShaderStage;
    use crate::host::Listener;
    use crate::origin::RayOrigin;
    use crate::testing::{FakeHost, Journal, RecordingBackend};
    use crate::uniforms::{U_COLOR, U_DIRECTION, U_POINTER_INFLUENCE, U_SPEED, U_TIME};

    type TestSession = AnimationSession<RecordingBackend, FakeHost>;

    fn session(config: RenderConfig) -> TestSession {
        AnimationSession::new(FakeHost::new(), config)
    }

    fn geometry() -> SurfaceGeometry {
        SurfaceGeometry::sized(800.0, 600.0, 1.0)
    }

    fn activate(session: &mut TestSession, journal: &Rc<RefCell<Journal>>, visible: f32) -> Instant {
        let now = Instant::now();
        let journal = journal.clone();
        session.activate(|| Ok(RecordingBackend::new(journal)), geometry(), visible, now);
        now
    }

    fn fire(session: &mut TestSession, now: Instant) -> bool {
        let token = session.host_mut().scheduler.fire().expect("pending tick");
        session.tick(token, now)
    }

    #[test]
    fn visible_activation_schedules_one_tick() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        activate(&mut session, &journal, 1.0);

        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.host().scheduler.scheduled(), 1);
        assert_eq!(session.host().scheduler.pending(), 1);
        assert_eq!(session.host().active_listeners(), 3);
        assert_eq!(journal.borrow().resizes.len(), 1);
    }

    #[test]
    fn hidden_activation_waits_for_visibility() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        activate(&mut session, &journal, 0.0);

        assert_eq!(session.state(), SessionState::Paused);
        assert_eq!(session.host().scheduler.scheduled(), 0);

        session.on_visibility(0.5);
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.host().scheduler.scheduled(), 1);

        session.on_visibility(0.8);
        assert_eq!(session.host().scheduler.scheduled(), 1);
    }

    #[test]
    fn hiding_cancels_exactly_one_tick() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let start = activate(&mut session, &journal, 1.0);
        assert!(fire(&mut session, start + Duration::from_millis(16)));

        session.on_visibility(0.0);
        assert_eq!(session.state(), SessionState::Paused);
        assert_eq!(session.host().scheduler.cancelled(), 1);
        assert_eq!(session.host().scheduler.pending(), 0);

        let scheduled = session.host().scheduler.scheduled();
        session.on_visibility(0.001);
        assert_eq!(session.host().scheduler.scheduled(), scheduled);
        assert_eq!(session.host().scheduler.cancelled(), 1);

        session.on_visibility(1.0);
        assert_eq!(session.host().scheduler.scheduled(), scheduled + 1);
        assert_eq!(session.host().scheduler.pending(), 1);
    }

    #[test]
    fn stale_tokens_are_ignored() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let start = activate(&mut session, &journal, 1.0);
        let token = session.host_mut().scheduler.fire().expect("tick");
        assert!(session.tick(token, start));
        assert!(!session.tick(token, start));
        assert_eq!(journal.borrow().draws.len(), 1);
    }

    #[test]
    fn context_failure_leaves_session_inactive() {
        let mut session = session(RenderConfig::default());
        let state = session.activate(
            || Err(anyhow::anyhow!("no adapter")),
            geometry(),
            1.0,
            Instant::now(),
        );

        assert_eq!(state, SessionState::Inactive);
        assert!(matches!(
            session.last_error(),
            Some(SessionError::ContextUnavailable(message)) if message.contains("no adapter")
        ));
        assert_eq!(session.host().active_listeners(), 0);
        assert_eq!(session.host().scheduler.scheduled(), 0);
    }

    #[test]
    fn compile_failure_releases_everything() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let backend_journal = journal.clone();
        session.activate(
            move || {
                let mut backend = RecordingBackend::new(backend_journal);
                backend.fail_compile(ShaderStage::Fragment, "syntax error");
                Ok(backend)
            },
            geometry(),
            1.0,
            Instant::now(),
        );

        assert_eq!(session.state(), SessionState::Inactive);
        assert!(matches!(
            session.last_error(),
            Some(SessionError::Program(ProgramError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            }))
        ));
        let journal = journal.borrow();
        assert_eq!(journal.live_shaders(), 0);
        assert!(journal.live_programs.is_empty());
        assert!(journal.live_buffers.is_empty());
        assert_eq!(session.host().active_listeners(), 0);
    }

    #[test]
    fn buffer_failure_releases_program() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let backend_journal = journal.clone();
        session.activate(
            move || {
                let mut backend = RecordingBackend::new(backend_journal);
                backend.fail_buffer("out of memory");
                Ok(backend)
            },
            geometry(),
            1.0,
            Instant::now(),
        );

        assert_eq!(session.state(), SessionState::Inactive);
        assert!(matches!(session.last_error(), Some(SessionError::Buffer { .. })));
        assert!(journal.borrow().live_programs.is_empty());
        assert_eq!(journal.borrow().programs_deleted.len(), 1);
    }

    #[test]
    fn teardown_is_idempotent() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        activate(&mut session, &journal, 1.0);

        session.deactivate();
        session.deactivate();

        assert_eq!(session.state(), SessionState::Inactive);
        assert_eq!(session.host().scheduler.pending(), 0);
        assert_eq!(session.host().scheduler.cancelled(), 1);
        assert_eq!(session.host().active_listeners(), 0);
        let journal = journal.borrow();
        assert_eq!(journal.programs_deleted.len(), 1);
        assert_eq!(journal.buffers_deleted.len(), 1);
        assert_eq!(journal.double_releases, 0);
    }

    #[test]
    fn dropping_the_session_releases_gpu_handles() {
        let journal = Journal::shared();
        {
            let mut session = session(RenderConfig::default());
            activate(&mut session, &journal, 1.0);
            assert_eq!(journal.borrow().live_programs.len(), 1);
        }
        let journal = journal.borrow();
        assert!(journal.live_programs.is_empty());
        assert!(journal.live_buffers.is_empty());
        assert_eq!(journal.double_releases, 0);
    }

    #[test]
    fn repeated_activation_cycles_leak_no_listeners() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        for _ in 0..5 {
            activate(&mut session, &journal, 1.0);
            assert_eq!(session.host().active_listeners(), 3);
            for listener in Listener::ALL {
                assert!(session.host().is_listening(listener));
            }
            session.deactivate();
            assert_eq!(session.host().active_listeners(), 0);
        }
        assert_eq!(session.host().detached, 15);
        assert!(journal.borrow().live_programs.is_empty());
    }

    #[test]
    fn ticks_push_every_uniform_and_draw_the_quad() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let start = activate(&mut session, &journal, 1.0);
        assert!(fire(&mut session, start + Duration::from_millis(500)));

        let journal = journal.borrow();
        let draw = journal.draws.last().expect("draw");
        assert_eq!(draw.vertex_count, 6);
        assert!(journal.live_programs.contains(&draw.program));
        assert!(journal.live_buffers.contains(&draw.buffer));
        for name in UNIFORM_NAMES {
            assert!(draw.uniforms.contains_key(name), "{name} not pushed");
        }
        assert_eq!(draw.uniforms[U_TIME], UniformValue::Float(0.5));
        assert_eq!(draw.uniforms[U_DIRECTION], UniformValue::Vec2([0.0, -1.0]));
        assert_eq!(draw.uniforms[U_POINTER_INFLUENCE], UniformValue::Float(0.1));
        let UniformValue::Vec3(color) = draw.uniforms[U_COLOR] else {
            panic!("color uniform is not a vec3");
        };
        assert!((color[0] - 0.424).abs() < 1e-3);
    }

    #[test]
    fn only_time_changes_between_frames_without_pointer_or_pulse() {
        let journal = Journal::shared();
        let config = RenderConfig {
            follow_pointer: false,
            pulsating: false,
            ..RenderConfig::default()
        };
        let mut session = session(config);
        let start = activate(&mut session, &journal, 1.0);
        fire(&mut session, start + Duration::from_millis(100));
        fire(&mut session, start + Duration::from_millis(300));

        let journal = journal.borrow();
        assert_eq!(journal.draws.len(), 2);
        let mut first = journal.draws[0].uniforms.clone();
        let mut second = journal.draws[1].uniforms.clone();
        assert_ne!(first.remove(U_TIME), second.remove(U_TIME));
        assert_eq!(first, second);
        assert_eq!(second[U_POINTER_INFLUENCE], UniformValue::Float(0.0));
    }

    #[test]
    fn config_change_is_seen_on_next_tick() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let start = activate(&mut session, &journal, 1.0);
        fire(&mut session, start);

        session.set_config(RenderConfig {
            origin: RayOrigin::Left,
            speed: -3.0,
            ..RenderConfig::default()
        });
        assert_eq!(session.state(), SessionState::Running);
        fire(&mut session, start + Duration::from_millis(16));

        let journal = journal.borrow();
        let draw = journal.draws.last().expect("draw");
        assert_eq!(draw.uniforms[U_DIRECTION], UniformValue::Vec2([1.0, 0.0]));
        assert_eq!(draw.uniforms[U_SPEED], UniformValue::Float(0.0));
    }

    #[test]
    fn resize_between_ticks_applies_on_next_tick() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let start = activate(&mut session, &journal, 1.0);

        session.on_resize(SurfaceGeometry::sized(1024.0, 768.0, 1.0));
        session.on_resize(SurfaceGeometry::sized(640.0, 480.0, 3.0));
        assert_eq!(journal.borrow().resizes.len(), 1);

        fire(&mut session, start);
        let journal = journal.borrow();
        assert_eq!(
            journal.resizes.last().copied(),
            Some(crate::types::BackingSize {
                width: 1280,
                height: 960
            })
        );
        assert_eq!(
            journal.draws[0].uniforms[crate::uniforms::U_RESOLUTION],
            UniformValue::Vec2([1280.0, 960.0])
        );
    }

    #[test]
    fn pointer_moves_feed_the_smoothed_sample() {
        let journal = Journal::shared();
        let mut session = session(RenderConfig::default());
        let start = activate(&mut session, &journal, 1.0);

        session.on_pointer_move(800.0, 0.0);
        fire(&mut session, start);

        let journal = journal.borrow();
        let UniformValue::Vec2(pointer) = journal.draws[0].uniforms[crate::uniforms::U_POINTER]
        else {
            panic!("pointer uniform is not a vec2");
        };
        assert!((pointer[0] - (0.5 * 0.92 + 0.08)).abs() < 1e-6);
        assert!((pointer[1] - (0.5 * 0.92 + 0.08)).abs() < 1e-6);
    }
}
