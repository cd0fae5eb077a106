use crate::types::SurfaceGeometry;

/// Weight kept from the previous smoothed sample on every tick.
pub const POINTER_SMOOTHING: f32 = 0.92;

/// Pointer sample in surface-normalized, bottom-up coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    pub const CENTER: PointerSample = PointerSample { x: 0.5, y: 0.5 };

    pub fn as_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

/// Tracks the latest raw pointer sample and a per-tick low-pass estimate.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    raw: PointerSample,
    smoothed: PointerSample,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            raw: PointerSample::CENTER,
            smoothed: PointerSample::CENTER,
        }
    }

    /// Both samples back to the surface centre.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Records a pointer position given in the host's top-down coordinates.
    ///
    /// Positions outside `geometry` are ignored and `false` is returned.
    /// The vertical axis is flipped because the shader's frame is bottom-up.
    pub fn record(&mut self, x: f32, y: f32, geometry: &SurfaceGeometry) -> bool {
        if geometry.width <= 0.0 || geometry.height <= 0.0 || !geometry.contains(x, y) {
            return false;
        }
        self.raw = PointerSample {
            x: (x - geometry.left) / geometry.width,
            y: 1.0 - (y - geometry.top) / geometry.height,
        };
        true
    }

    /// Moves the smoothed sample one step toward the raw sample.
    pub fn advance(&mut self) -> PointerSample {
        let keep = POINTER_SMOOTHING;
        let take = 1.0 - POINTER_SMOOTHING;
        self.smoothed = PointerSample {
            x: self.smoothed.x * keep + self.raw.x * take,
            y: self.smoothed.y * keep + self.raw.y * take,
        };
        self.smoothed
    }

    pub fn raw(&self) -> PointerSample {
        self.raw
    }

    pub fn smoothed(&self) -> PointerSample {
        self.smoothed
    }

    #[cfg(test)]
    fn with_samples(raw: PointerSample, smoothed: PointerSample) -> Self {
        Self { raw, smoothed }
    }
}
