use tracing::debug;

use crate::backend::GraphicsBackend;
use crate::types::{BackingSize, SurfaceGeometry, SurfaceSize};

/// Highest pixel density honoured when sizing the backing store.
pub const MAX_PIXEL_DENSITY: f32 = 2.0;

/// Backing resolution for a displayed size at the given density.
///
/// Density is capped at [`MAX_PIXEL_DENSITY`]; non-finite or non-positive
/// densities count as 1. Each axis is floored and kept at one pixel minimum.
pub fn backing_size(displayed_width: f32, displayed_height: f32, pixel_density: f32) -> BackingSize {
    let density = if pixel_density.is_finite() && pixel_density > 0.0 {
        pixel_density.min(MAX_PIXEL_DENSITY)
    } else {
        1.0
    };
    let axis = |displayed: f32| -> u32 {
        let scaled = (displayed.max(0.0) * density).floor();
        if scaled.is_finite() {
            (scaled as u32).max(1)
        } else {
            1
        }
    };
    BackingSize {
        width: axis(displayed_width),
        height: axis(displayed_height),
    }
}

/// Keeps the surface backing store in step with its displayed geometry.
///
/// Resize signals only record the newest geometry; the size is recomputed and
/// pushed to the backend when [`ResizeController::apply_pending`] runs at the
/// start of a tick.
#[derive(Debug, Clone)]
pub struct ResizeController {
    geometry: SurfaceGeometry,
    current: Option<SurfaceSize>,
    pending: Option<SurfaceGeometry>,
}

impl ResizeController {
    pub fn new(geometry: SurfaceGeometry) -> Self {
        Self {
            geometry,
            current: None,
            pending: Some(geometry),
        }
    }

    /// Latest geometry reported by the host, applied or not.
    pub fn geometry(&self) -> &SurfaceGeometry {
        self.pending.as_ref().unwrap_or(&self.geometry)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Records a new geometry; the last one before a tick wins.
    pub fn request(&mut self, geometry: SurfaceGeometry) {
        self.pending = Some(geometry);
    }

    /// Applies the newest requested geometry, if any.
    ///
    /// The backend is only touched when the backing resolution actually
    /// changes. Returns the size in effect afterwards.
    pub fn apply_pending<B: GraphicsBackend>(&mut self, backend: &mut B) -> Option<SurfaceSize> {
        let Some(geometry) = self.pending.take() else {
            return self.current;
        };
        self.geometry = geometry;
        let backing = backing_size(geometry.width, geometry.height, geometry.pixel_density);
        let size = SurfaceSize {
            displayed: [geometry.width, geometry.height],
            backing,
        };
        let changed = self.current.map(|current| current.backing) != Some(backing);
        self.current = Some(size);
        if changed {
            debug!(
                width = backing.width,
                height = backing.height,
                density = geometry.pixel_density,
                "resizing light rays surface"
            );
            backend.resize_surface(backing);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Journal, RecordingBackend};

    #[test]
    fn density_is_capped_at_two() {
        assert_eq!(
            backing_size(800.0, 600.0, 3.0),
            BackingSize {
                width: 1600,
                height: 1200
            }
        );
    }

    #[test]
    fn fractional_sizes_floor() {
        assert_eq!(
            backing_size(100.7, 50.2, 1.5),
            BackingSize {
                width: 151,
                height: 75
            }
        );
    }

    #[test]
    fn degenerate_inputs_keep_one_pixel() {
        assert_eq!(backing_size(0.0, 0.0, 2.0), BackingSize { width: 1, height: 1 });
        assert_eq!(backing_size(-20.0, 0.3, 1.0), BackingSize { width: 1, height: 1 });
        assert_eq!(
            backing_size(640.0, 480.0, f32::NAN),
            BackingSize {
                width: 640,
                height: 480
            }
        );
        assert_eq!(
            backing_size(640.0, 480.0, 0.0),
            BackingSize {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn last_request_before_apply_wins() {
        let journal = Journal::shared();
        let mut backend = RecordingBackend::new(journal.clone());
        let mut controller = ResizeController::new(SurfaceGeometry::sized(800.0, 600.0, 1.0));
        controller.apply_pending(&mut backend);

        controller.request(SurfaceGeometry::sized(1024.0, 768.0, 1.0));
        controller.request(SurfaceGeometry::sized(400.0, 300.0, 2.0));
        let size = controller.apply_pending(&mut backend).expect("size");
        assert_eq!(size.backing, BackingSize { width: 800, height: 600 });
        assert_eq!(size.displayed, [400.0, 300.0]);

        // 400x300 at density 2 lands on the same backing store as before.
        assert_eq!(
            journal.borrow().resizes,
            vec![BackingSize { width: 800, height: 600 }]
        );
    }

    #[test]
    fn apply_without_request_is_a_no_op() {
        let journal = Journal::shared();
        let mut backend = RecordingBackend::new(journal.clone());
        let mut controller = ResizeController::new(SurfaceGeometry::sized(320.0, 200.0, 1.0));
        let first = controller.apply_pending(&mut backend);
        let second = controller.apply_pending(&mut backend);
        assert_eq!(first, second);
        assert_eq!(journal.borrow().resizes.len(), 1);
        assert!(!controller.has_pending());
    }
}
