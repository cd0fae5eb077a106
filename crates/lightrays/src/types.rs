use serde::{Deserialize, Serialize};

use crate::origin::RayOrigin;

/// Tint applied when the caller does not pick one.
pub const DEFAULT_COLOR: &str = "#6c9aea";

/// Caller-supplied parameters for the effect.
///
/// The session keeps exactly one `RenderConfig` and reads it on every tick,
/// so replacing it through [`crate::AnimationSession::set_config`] takes
/// effect on the next frame without restarting anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Anchor/direction preset.
    pub origin: RayOrigin,
    /// Base tint as a hex string (`#rrggbb` or `#rgb`).
    pub color: String,
    /// Multiplier on the time term that drives the sweep.
    pub speed: f32,
    /// Angular falloff; larger values widen each ray.
    pub spread: f32,
    /// Ray reach as a multiple of the surface width.
    pub length: f32,
    /// Blend ray direction toward the pointer.
    pub follow_pointer: bool,
    /// Blend weight toward the pointer direction, in `[0, 1]`.
    pub pointer_influence: f32,
    /// Strength of per-pixel dithering.
    pub noise_amount: f32,
    /// Strength of the time-varying angular wobble.
    pub distortion: f32,
    /// Enables a slow global intensity oscillation.
    pub pulsating: bool,
    /// Distance (in surface widths) over which intensity attenuates.
    pub fade_distance: f32,
    /// Blend toward grayscale when below 1.
    pub saturation: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            origin: RayOrigin::default(),
            color: DEFAULT_COLOR.to_string(),
            speed: 1.0,
            spread: 0.5,
            length: 3.0,
            follow_pointer: true,
            pointer_influence: 0.1,
            noise_amount: 0.0,
            distortion: 0.0,
            pulsating: false,
            fade_distance: 1.0,
            saturation: 1.0,
        }
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

impl RenderConfig {
    /// Returns a copy whose numeric fields satisfy the effect's invariants:
    /// finite, non-negative, and `pointer_influence` within `[0, 1]`.
    pub fn sanitized(&self) -> Self {
        Self {
            origin: self.origin,
            color: self.color.clone(),
            speed: non_negative(self.speed),
            spread: non_negative(self.spread),
            length: non_negative(self.length),
            follow_pointer: self.follow_pointer,
            pointer_influence: non_negative(self.pointer_influence).min(1.0),
            noise_amount: non_negative(self.noise_amount),
            distortion: non_negative(self.distortion),
            pulsating: self.pulsating,
            fade_distance: non_negative(self.fade_distance),
            saturation: non_negative(self.saturation),
        }
    }

    /// Pointer influence after applying `follow_pointer`.
    pub fn effective_pointer_influence(&self) -> f32 {
        if self.follow_pointer {
            self.pointer_influence
        } else {
            0.0
        }
    }
}

/// On-screen rectangle of the rendering surface plus the display density.
///
/// Coordinates are logical units in the host's top-down frame. Hosts report a
/// complete geometry on every resize; it is never patched field by field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub pixel_density: f32,
}

impl SurfaceGeometry {
    /// Geometry anchored at the host origin.
    pub fn sized(width: f32, height: f32, pixel_density: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
            pixel_density,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left
            && y >= self.top
            && x <= self.left + self.width
            && y <= self.top + self.height
    }
}

/// Framebuffer dimensions in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackingSize {
    pub width: u32,
    pub height: u32,
}

impl BackingSize {
    pub fn as_f32(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Displayed size paired with the backing resolution derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub displayed: [f32; 2],
    pub backing: BackingSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_negative_and_non_finite_values() {
        let config = RenderConfig {
            speed: -2.0,
            spread: f32::NAN,
            length: f32::INFINITY,
            pointer_influence: 4.0,
            saturation: 0.5,
            ..RenderConfig::default()
        };
        let clean = config.sanitized();
        assert_eq!(clean.speed, 0.0);
        assert_eq!(clean.spread, 0.0);
        assert_eq!(clean.length, 0.0);
        assert_eq!(clean.pointer_influence, 1.0);
        assert_eq!(clean.saturation, 0.5);
    }

    #[test]
    fn follow_pointer_gates_influence() {
        let mut config = RenderConfig::default();
        assert_eq!(config.effective_pointer_influence(), 0.1);
        config.follow_pointer = false;
        assert_eq!(config.effective_pointer_influence(), 0.0);
    }

    #[test]
    fn geometry_contains_edges() {
        let geometry = SurfaceGeometry {
            left: 10.0,
            top: 20.0,
            width: 100.0,
            height: 50.0,
            pixel_density: 1.0,
        };
        assert!(geometry.contains(10.0, 20.0));
        assert!(geometry.contains(110.0, 70.0));
        assert!(!geometry.contains(9.9, 30.0));
        assert!(!geometry.contains(50.0, 70.1));
    }
}
