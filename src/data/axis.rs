//! Axis limits and the two fitting regimes.
//!
//! Static mode autofits to exactly the drawn data. Live mode pads the tight
//! bounding box and unions it with what is already displayed, so limits only
//! ever grow while data streams in.

use serde::{Deserialize, Serialize};

/// Closed interval `[min, max]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn union(self, other: Range) -> Range {
        Range::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.min <= other.min && self.max >= other.max
    }

    /// Widen by `frac` of the span on both ends.
    pub fn padded(self, frac: f64) -> Range {
        let pad = self.span() * frac;
        Range::new(self.min - pad, self.max + pad)
    }

    /// Give zero-width ranges a visible extent.
    pub fn widen_degenerate(self) -> Range {
        if self.span() > 0.0 {
            return self;
        }
        let half = if self.min == 0.0 {
            0.5
        } else {
            self.min.abs() * 0.05
        };
        Range::new(self.min - half, self.max + half)
    }
}

/// Running min/max accumulator. Non-finite inputs are ignored.
#[derive(Debug, Clone, Copy)]
pub struct Extent {
    min: f64,
    max: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Extent {
    pub fn include(&mut self, v: f64) {
        if v.is_finite() {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    pub fn range(&self) -> Option<Range> {
        (self.min <= self.max).then(|| Range::new(self.min, self.max))
    }
}

/// Tight bounding box of a set of drawn objects; either axis may be empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataBox {
    pub x: Extent,
    pub y: Extent,
}

impl DataBox {
    pub fn include_point(&mut self, p: [f64; 2]) {
        self.x.include(p[0]);
        self.y.include(p[1]);
    }

    pub fn is_empty(&self) -> bool {
        self.x.range().is_none() && self.y.range().is_none()
    }
}

/// Displayed limits of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub x: Range,
    pub y: Range,
}

impl AxisLimits {
    pub fn neutral() -> Self {
        Self {
            x: Range::new(0.0, 1.0),
            y: Range::new(0.0, 1.0),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x.is_valid() && self.y.is_valid()
    }

    pub fn union(self, other: AxisLimits) -> AxisLimits {
        AxisLimits {
            x: self.x.union(other.x),
            y: self.y.union(other.y),
        }
    }

    /// True when `self` covers `other` on both axes.
    pub fn contains(&self, other: &AxisLimits) -> bool {
        self.x.contains_range(&other.x) && self.y.contains_range(&other.y)
    }
}

/// Static regime: exact autofit. Axes without data fall back to `neutral`.
pub fn autofit(data: &DataBox, neutral: AxisLimits) -> AxisLimits {
    AxisLimits {
        x: data.x.range().map_or(neutral.x, Range::widen_degenerate),
        y: data.y.range().map_or(neutral.y, Range::widen_degenerate),
    }
}

/// Live regime: padded bounding box unioned with the currently displayed limits.
///
/// With no data the current limits are held (or `neutral` if nothing was shown yet).
pub fn grow(
    current: Option<AxisLimits>,
    data: &DataBox,
    x_pad: f64,
    y_pad: f64,
    neutral: AxisLimits,
) -> AxisLimits {
    let x = data
        .x
        .range()
        .map(|r| r.widen_degenerate().padded(x_pad));
    let y = data
        .y
        .range()
        .map(|r| r.widen_degenerate().padded(y_pad));
    match current {
        Some(cur) => AxisLimits {
            x: x.map_or(cur.x, |r| r.union(cur.x)),
            y: y.map_or(cur.y, |r| r.union(cur.y)),
        },
        None => AxisLimits {
            x: x.unwrap_or(neutral.x),
            y: y.unwrap_or(neutral.y),
        },
    }
}
