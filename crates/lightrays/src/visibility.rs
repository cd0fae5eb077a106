/// Minimum on-screen intersection ratio for the effect to count as visible.
pub const VISIBILITY_THRESHOLD: f32 = 0.01;

/// Change in on-screen presence reported by [`VisibilityGate::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityTransition {
    Shown,
    Hidden,
}

/// Tracks whether the surface is on screen and reports only the edges.
#[derive(Debug, Clone, Default)]
pub struct VisibilityGate {
    visible: bool,
}

impl VisibilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Feeds the current intersection ratio (0 = off screen, 1 = fully shown).
    ///
    /// Returns a transition only when the visible flag flips; repeated
    /// observations on the same side of the threshold return `None`.
    pub fn observe(&mut self, intersection_ratio: f32) -> Option<VisibilityTransition> {
        let visible = intersection_ratio.is_finite() && intersection_ratio >= VISIBILITY_THRESHOLD;
        if visible == self.visible {
            return None;
        }
        self.visible = visible;
        Some(if visible {
            VisibilityTransition::Shown
        } else {
            VisibilityTransition::Hidden
        })
    }

    pub fn reset(&mut self) {
        self.visible = false;
    }
}
