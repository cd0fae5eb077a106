use std::collections::HashMap;

use tracing::debug;

use crate::backend::{GraphicsBackend, ProgramId, UniformLocation, UniformValue};

pub const U_TIME: &str = "u_time";
pub const U_RESOLUTION: &str = "u_resolution";
pub const U_ANCHOR: &str = "u_anchor";
pub const U_DIRECTION: &str = "u_direction";
pub const U_COLOR: &str = "u_color";
pub const U_SPEED: &str = "u_speed";
pub const U_SPREAD: &str = "u_spread";
pub const U_LENGTH: &str = "u_length";
pub const U_POINTER: &str = "u_pointer";
pub const U_POINTER_INFLUENCE: &str = "u_pointer_influence";
pub const U_NOISE: &str = "u_noise";
pub const U_DISTORTION: &str = "u_distortion";
pub const U_PULSATING: &str = "u_pulsating";
pub const U_FADE_DISTANCE: &str = "u_fade_distance";
pub const U_SATURATION: &str = "u_saturation";

/// Every uniform the session pushes before a draw.
pub const UNIFORM_NAMES: [&str; 15] = [
    U_TIME,
    U_RESOLUTION,
    U_ANCHOR,
    U_DIRECTION,
    U_COLOR,
    U_SPEED,
    U_SPREAD,
    U_LENGTH,
    U_POINTER,
    U_POINTER_INFLUENCE,
    U_NOISE,
    U_DISTORTION,
    U_PULSATING,
    U_FADE_DISTANCE,
    U_SATURATION,
];

/// Uniform locations resolved once against a linked program.
#[derive(Debug, Clone)]
pub struct UniformTable {
    program: ProgramId,
    locations: HashMap<&'static str, UniformLocation>,
}

impl UniformTable {
    pub fn build<B: GraphicsBackend>(
        backend: &mut B,
        program: ProgramId,
        names: &[&'static str],
    ) -> Self {
        let locations: HashMap<_, _> = names
            .iter()
            .map(|&name| (name, backend.uniform_location(program, name)))
            .collect();
        let inert: Vec<_> = locations
            .iter()
            .filter(|(_, location)| location.is_inert())
            .map(|(name, _)| *name)
            .collect();
        if !inert.is_empty() {
            debug!(?inert, "program does not declare some uniforms; writes will be skipped");
        }
        Self { program, locations }
    }

    /// Location for `name`; names outside the table are inert as well.
    pub fn location(&self, name: &str) -> UniformLocation {
        self.locations
            .get(name)
            .copied()
            .unwrap_or(UniformLocation::INERT)
    }

    pub fn set<B: GraphicsBackend>(&self, backend: &mut B, name: &str, value: UniformValue) {
        let location = self.location(name);
        if location.is_inert() {
            return;
        }
        backend.set_uniform(self.program, location, value);
    }
}
