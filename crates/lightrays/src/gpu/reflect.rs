use std::collections::HashMap;

use wgpu::naga;

use crate::backend::{ShaderStage, UniformKind, UniformSlot};

/// Uniform block declared by one shader stage, as laid out by naga.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct UniformBlock {
    pub size: u32,
    pub members: HashMap<String, UniformSlot>,
}

impl UniformBlock {
    /// Combines the blocks of both stages; they share binding 0.
    pub fn merge(&mut self, other: &UniformBlock) {
        self.size = self.size.max(other.size);
        for (name, slot) in &other.members {
            self.members.entry(name.clone()).or_insert(*slot);
        }
    }

    /// Buffer size rounded up to the 16-byte std140 block alignment.
    pub fn buffer_size(&self) -> u64 {
        let size = u64::from(self.size.max(16));
        size.div_ceil(16) * 16
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// Parses GLSL 450 and returns the module, or the frontend's diagnostics.
pub(crate) fn parse_glsl(stage: ShaderStage, source: &str) -> Result<naga::Module, String> {
    let mut frontend = naga::front::glsl::Frontend::default();
    frontend
        .parse(&naga::front::glsl::Options::from(naga_stage(stage)), source)
        .map_err(|errors| errors.emit_to_string(source))
}

fn member_kind(inner: &naga::TypeInner) -> Option<UniformKind> {
    match *inner {
        naga::TypeInner::Scalar(naga::Scalar::F32) => Some(UniformKind::Float),
        naga::TypeInner::Vector {
            size: naga::VectorSize::Bi,
            scalar: naga::Scalar::F32,
        } => Some(UniformKind::Vec2),
        naga::TypeInner::Vector {
            size: naga::VectorSize::Tri,
            scalar: naga::Scalar::F32,
        } => Some(UniformKind::Vec3),
        _ => None,
    }
}

/// Collects the float, vec2 and vec3 members of the module's uniform block.
///
/// Members of other types are left out and so resolve to inert locations.
pub(crate) fn uniform_block(module: &naga::Module) -> UniformBlock {
    let mut block = UniformBlock::default();
    for (_, global) in module.global_variables.iter() {
        if global.space != naga::AddressSpace::Uniform {
            continue;
        }
        let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
            continue;
        };
        block.size = block.size.max(*span);
        for member in members {
            let Some(name) = member.name.as_ref() else {
                continue;
            };
            let Some(kind) = member_kind(&module.types[member.ty].inner) else {
                tracing::debug!(%name, "skipping uniform member with unsupported type");
                continue;
            };
            block.members.insert(
                name.clone(),
                UniformSlot {
                    offset: member.offset,
                    kind,
                },
            );
        }
    }
    block
}
