use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fraction of the surface dimension by which edge anchors sit outside it.
/// [`RayOrigin::Center`] is the only preset anchored inside the surface.
pub const ANCHOR_MARGIN: f32 = 0.2;

/// Named preset for where rays originate and which way they sweep.
///
/// Parsing never fails: unknown keywords resolve to [`RayOrigin::TopCenter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RayOrigin {
    #[default]
    TopCenter,
    TopLeft,
    TopRight,
    Left,
    Right,
    BottomLeft,
    BottomCenter,
    BottomRight,
    /// Anchored at the surface midpoint, sweeping upward.
    Center,
}

impl RayOrigin {
    pub const ALL: [RayOrigin; 9] = [
        RayOrigin::TopCenter,
        RayOrigin::TopLeft,
        RayOrigin::TopRight,
        RayOrigin::Left,
        RayOrigin::Right,
        RayOrigin::BottomLeft,
        RayOrigin::BottomCenter,
        RayOrigin::BottomRight,
        RayOrigin::Center,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            RayOrigin::TopCenter => "top-center",
            RayOrigin::TopLeft => "top-left",
            RayOrigin::TopRight => "top-right",
            RayOrigin::Left => "left",
            RayOrigin::Right => "right",
            RayOrigin::BottomLeft => "bottom-left",
            RayOrigin::BottomCenter => "bottom-center",
            RayOrigin::BottomRight => "bottom-right",
            RayOrigin::Center => "center",
        }
    }

    pub fn from_keyword(keyword: &str) -> Self {
        let keyword = keyword.trim();
        Self::ALL
            .into_iter()
            .find(|origin| origin.keyword().eq_ignore_ascii_case(keyword))
            .unwrap_or_default()
    }
}

impl FromStr for RayOrigin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_keyword(s))
    }
}

impl From<String> for RayOrigin {
    fn from(value: String) -> Self {
        Self::from_keyword(&value)
    }
}

impl From<RayOrigin> for String {
    fn from(value: RayOrigin) -> Self {
        value.keyword().to_string()
    }
}

impl fmt::Display for RayOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Anchor point and sweep direction in the rendering frame.
///
/// The frame is measured in backing pixels with the origin at the bottom-left
/// corner, matching the fragment shader's flipped `gl_FragCoord`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayPlacement {
    pub anchor: [f32; 2],
    pub direction: [f32; 2],
}

/// Places the ray anchor for `origin` on a `width`×`height` surface.
pub fn resolve_anchor_and_direction(origin: RayOrigin, width: f32, height: f32) -> RayPlacement {
    let outside = ANCHOR_MARGIN;
    let (anchor, direction) = match origin {
        RayOrigin::TopLeft => ([0.0, (1.0 + outside) * height], [0.0, -1.0]),
        RayOrigin::TopRight => ([width, (1.0 + outside) * height], [0.0, -1.0]),
        RayOrigin::Left => ([-outside * width, 0.5 * height], [1.0, 0.0]),
        RayOrigin::Right => ([(1.0 + outside) * width, 0.5 * height], [-1.0, 0.0]),
        RayOrigin::BottomLeft => ([0.0, -outside * height], [0.0, 1.0]),
        RayOrigin::BottomCenter => ([0.5 * width, -outside * height], [0.0, 1.0]),
        RayOrigin::BottomRight => ([width, -outside * height], [0.0, 1.0]),
        RayOrigin::Center => ([0.5 * width, 0.5 * height], [0.0, 1.0]),
        RayOrigin::TopCenter => ([0.5 * width, (1.0 + outside) * height], [0.0, -1.0]),
    };
    RayPlacement { anchor, direction }
}
