use std::fmt;

use crate::types::BackingSize;

/// Pipeline stage a shader source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Opaque handle to a compiled shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Opaque handle to a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Opaque handle to a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Scalar shape of a uniform declared by a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
}

/// Where a uniform lives inside its program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Resolved uniform handle. An inert location swallows writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UniformLocation(Option<UniformSlot>);

impl UniformLocation {
    pub const INERT: UniformLocation = UniformLocation(None);

    pub fn new(slot: UniformSlot) -> Self {
        Self(Some(slot))
    }

    pub fn slot(self) -> Option<UniformSlot> {
        self.0
    }

    pub fn is_inert(self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<UniformSlot>> for UniformLocation {
    fn from(value: Option<UniformSlot>) -> Self {
        Self(value)
    }
}

/// Value written to a uniform before a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
        }
    }

    pub fn components(&self) -> &[f32] {
        match self {
            UniformValue::Float(value) => std::slice::from_ref(value),
            UniformValue::Vec2(values) => values,
            UniformValue::Vec3(values) => values,
        }
    }
}

/// GPU operations the effect needs, in the order a session uses them.
///
/// Implementations own the real device objects and hand out opaque ids. The
/// `Err(String)` variants carry the driver's info log verbatim.
pub trait GraphicsBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;

    fn delete_shader(&mut self, shader: ShaderId);

    fn delete_program(&mut self, program: ProgramId);

    /// Looks up `name` in the program's declared uniforms.
    ///
    /// Undeclared names resolve to [`UniformLocation::INERT`], never an error.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> UniformLocation;

    /// Uploads a static vertex buffer of interleaved `vec2` positions.
    fn create_vertex_buffer(&mut self, positions: &[[f32; 2]]) -> Result<BufferId, String>;

    fn delete_buffer(&mut self, buffer: BufferId);

    /// Applies a new backing resolution to the surface and the viewport.
    fn resize_surface(&mut self, size: BackingSize);

    /// Writes a uniform value. Inert locations and kind mismatches are ignored.
    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue);

    /// Clears the surface and draws `vertex_count` vertices as a triangle list.
    fn draw(
        &mut self,
        program: ProgramId,
        buffer: BufferId,
        vertex_count: u32,
    ) -> anyhow::Result<()>;
}
