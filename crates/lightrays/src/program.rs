use tracing::debug;

use crate::backend::{GraphicsBackend, ProgramId, ShaderId, ShaderStage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {log}")]
    ProgramLink { log: String },
}

/// Compiles and links a vertex/fragment pair on a [`GraphicsBackend`].
///
/// Shader objects never outlive [`ProgramBuilder::build`]: they are released
/// right after linking, whether the link succeeds or not.
pub struct ProgramBuilder<'a, B: GraphicsBackend> {
    backend: &'a mut B,
}

impl<'a, B: GraphicsBackend> ProgramBuilder<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self { backend }
    }

    pub fn compile(&mut self, source: &str, stage: ShaderStage) -> Result<ShaderId, ProgramError> {
        self.backend
            .compile_shader(stage, source)
            .map_err(|log| ProgramError::ShaderCompile { stage, log })
    }

    /// Links two compiled shaders and releases both afterwards.
    pub fn link(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, ProgramError> {
        let linked = self.backend.link_program(vertex, fragment);
        self.backend.delete_shader(vertex);
        self.backend.delete_shader(fragment);
        linked.map_err(|log| ProgramError::ProgramLink { log })
    }

    /// Compiles both stages and links them into a program.
    pub fn build(&mut self, vertex_source: &str, fragment_source: &str) -> Result<ProgramId, ProgramError> {
        let vertex = self.compile(vertex_source, ShaderStage::Vertex)?;
        let fragment = match self.compile(fragment_source, ShaderStage::Fragment) {
            Ok(fragment) => fragment,
            Err(err) => {
                self.backend.delete_shader(vertex);
                return Err(err);
            }
        };
        let program = self.link(vertex, fragment)?;
        debug!(program = program.0, "linked light rays program");
        Ok(program)
    }
}
