//! Scale math.
//!
//! Pure functions: no document access, no state.

use serde::{Deserialize, Serialize};

/// A width/height pair in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero, negative or NaN.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Result of one scale computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleOutcome {
    /// Scale before snapping.
    pub raw: f64,
    /// Published scale, exactly 1 when `raw` is within tolerance.
    pub scale: f64,
    /// Logical root box that fills the viewport once scaled.
    pub root: Size,
}

/// Uniform scale that fits `design` inside `viewport` without overflow.
///
/// Fits the axis whose aspect ratio is narrower.
#[must_use]
pub fn raw_scale(viewport: Size, design: Size) -> f64 {
    if viewport.width / viewport.height < design.width / design.height {
        viewport.width / design.width
    } else {
        viewport.height / design.height
    }
}

/// Snap `raw` to exactly 1 when within `tolerance` of 1.
#[must_use]
pub fn snap_to_identity(raw: f64, tolerance: f64) -> f64 {
    if (1.0 - raw).abs() <= tolerance {
        1.0
    } else {
        raw
    }
}

/// Logical root box that exactly fills `viewport` after scaling by `scale`.
#[must_use]
pub fn root_box(viewport: Size, scale: f64) -> Size {
    Size::new(
        (viewport.width / scale).round(),
        (viewport.height / scale).round(),
    )
}

/// Run the full computation for one pass.
#[must_use]
pub fn compute(viewport: Size, design: Size, tolerance: f64) -> ScaleOutcome {
    let raw = raw_scale(viewport, design);
    let scale = snap_to_identity(raw, tolerance);
    ScaleOutcome {
        raw,
        scale,
        root: root_box(viewport, scale),
    }
}

/// Format a number the way CSS expects it (`2`, `0.5`).
#[must_use]
pub fn css_number(value: f64) -> String {
    format!("{value}")
}
