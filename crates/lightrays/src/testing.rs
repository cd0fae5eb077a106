//! In-memory backend and host used by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use scheduler::{ManualScheduler, TickScheduler, TickToken};

use crate::backend::{
    BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage, UniformKind, UniformLocation,
    UniformSlot, UniformValue,
};
use crate::host::{HostEvents, Listener, ListenerHandle};
use crate::types::BackingSize;
use crate::uniforms::UNIFORM_NAMES;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawRecord {
    pub program: ProgramId,
    pub buffer: BufferId,
    pub vertex_count: u32,
    pub uniforms: BTreeMap<String, UniformValue>,
}

/// Everything the recording backend observed, kept alive past the backend.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub live_shader_ids: HashSet<ShaderId>,
    pub shaders_deleted: usize,
    pub live_programs: HashSet<ProgramId>,
    pub programs_deleted: Vec<ProgramId>,
    pub live_buffers: HashSet<BufferId>,
    pub buffers_deleted: Vec<BufferId>,
    pub double_releases: usize,
    pub resizes: Vec<BackingSize>,
    pub writes: Vec<(String, UniformValue)>,
    pub draws: Vec<DrawRecord>,
}

impl Journal {
    pub fn shared() -> Rc<RefCell<Journal>> {
        Rc::new(RefCell::new(Journal::default()))
    }

    pub fn live_shaders(&self) -> usize {
        self.live_shader_ids.len()
    }
}

pub(crate) struct RecordingBackend {
    journal: Rc<RefCell<Journal>>,
    next_id: u32,
    declared: Vec<&'static str>,
    compile_failure: Option<(ShaderStage, String)>,
    link_failure: Option<String>,
    buffer_failure: Option<String>,
    values: HashMap<ProgramId, BTreeMap<String, UniformValue>>,
}

impl RecordingBackend {
    pub fn new(journal: Rc<RefCell<Journal>>) -> Self {
        Self {
            journal,
            next_id: 1,
            declared: UNIFORM_NAMES.to_vec(),
            compile_failure: None,
            link_failure: None,
            buffer_failure: None,
            values: HashMap::new(),
        }
    }

    pub fn fail_compile(&mut self, stage: ShaderStage, log: &str) {
        self.compile_failure = Some((stage, log.to_string()));
    }

    pub fn fail_link(&mut self, log: &str) {
        self.link_failure = Some(log.to_string());
    }

    pub fn fail_buffer(&mut self, log: &str) {
        self.buffer_failure = Some(log.to_string());
    }

    /// Drops `name` from the uniforms the linked program reports.
    pub fn undeclare(&mut self, name: &str) {
        self.declared.retain(|declared| *declared != name);
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn kind_of(name: &str) -> UniformKind {
        match name {
            "u_resolution" | "u_anchor" | "u_direction" | "u_pointer" => UniformKind::Vec2,
            "u_color" => UniformKind::Vec3,
            _ => UniformKind::Float,
        }
    }
}

impl GraphicsBackend for RecordingBackend {
    fn compile_shader(&mut self, stage: ShaderStage, _source: &str) -> Result<ShaderId, String> {
        if let Some((failing, log)) = &self.compile_failure {
            if *failing == stage {
                return Err(log.clone());
            }
        }
        let id = ShaderId(self.next());
        self.journal.borrow_mut().live_shader_ids.insert(id);
        Ok(id)
    }

    fn link_program(&mut self, _vertex: ShaderId, _fragment: ShaderId) -> Result<ProgramId, String> {
        if let Some(log) = &self.link_failure {
            return Err(log.clone());
        }
        let id = ProgramId(self.next());
        self.journal.borrow_mut().live_programs.insert(id);
        self.values.insert(id, BTreeMap::new());
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        let mut journal = self.journal.borrow_mut();
        if journal.live_shader_ids.remove(&shader) {
            journal.shaders_deleted += 1;
        } else {
            journal.double_releases += 1;
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        let mut journal = self.journal.borrow_mut();
        if journal.live_programs.remove(&program) {
            journal.programs_deleted.push(program);
        } else {
            journal.double_releases += 1;
        }
        self.values.remove(&program);
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation {
        if !self.values.contains_key(&program) {
            return UniformLocation::INERT;
        }
        self.declared
            .iter()
            .position(|declared| *declared == name)
            .map(|index| {
                UniformLocation::new(UniformSlot {
                    offset: index as u32 * 16,
                    kind: Self::kind_of(name),
                })
            })
            .unwrap_or(UniformLocation::INERT)
    }

    fn create_vertex_buffer(&mut self, _positions: &[[f32; 2]]) -> Result<BufferId, String> {
        if let Some(log) = &self.buffer_failure {
            return Err(log.clone());
        }
        let id = BufferId(self.next());
        self.journal.borrow_mut().live_buffers.insert(id);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        let mut journal = self.journal.borrow_mut();
        if journal.live_buffers.remove(&buffer) {
            journal.buffers_deleted.push(buffer);
        } else {
            journal.double_releases += 1;
        }
    }

    fn resize_surface(&mut self, size: BackingSize) {
        self.journal.borrow_mut().resizes.push(size);
    }

    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let Some(slot) = location.slot() else {
            return;
        };
        if slot.kind != value.kind() {
            return;
        }
        let Some(name) = self.declared.get((slot.offset / 16) as usize).copied() else {
            return;
        };
        if let Some(values) = self.values.get_mut(&program) {
            values.insert(name.to_string(), value);
            self.journal.borrow_mut().writes.push((name.to_string(), value));
        }
    }

    fn draw(&mut self, program: ProgramId, buffer: BufferId, vertex_count: u32) -> anyhow::Result<()> {
        let uniforms = self
            .values
            .get(&program)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("draw with released program {program:?}"))?;
        self.journal.borrow_mut().draws.push(DrawRecord {
            program,
            buffer,
            vertex_count,
            uniforms,
        });
        Ok(())
    }
}

/// Host double: manual ticks plus a listener registry with leak accounting.
#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub scheduler: ManualScheduler,
    listeners: HashMap<u64, Listener>,
    next_handle: u64,
    pub detached: usize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_listening(&self, listener: Listener) -> bool {
        self.listeners.values().any(|active| *active == listener)
    }
}

impl TickScheduler for FakeHost {
    fn schedule_tick(&mut self) -> TickToken {
        self.scheduler.schedule_tick()
    }

    fn cancel_tick(&mut self, token: TickToken) -> bool {
        self.scheduler.cancel_tick(token)
    }
}

impl HostEvents for FakeHost {
    fn listen(&mut self, listener: Listener) -> ListenerHandle {
        self.next_handle += 1;
        self.listeners.insert(self.next_handle, listener);
        ListenerHandle(self.next_handle)
    }

    fn unlisten(&mut self, handle: ListenerHandle) {
        if self.listeners.remove(&handle.0).is_some() {
            self.detached += 1;
        }
    }
}
