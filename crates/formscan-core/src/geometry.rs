//! Rectangles, points and coordinate-space conversions.
//!
//! Three coordinate spaces meet in this crate, all with a top-left origin:
//! - raster pixels at some DPI (the rendered page bitmap),
//! - PDF points, 1/72 inch (token boxes and field regions),
//! - normalized page fractions in `[0, 1]` (the blueprint interchange format).

/// Points per inch in PDF user space.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Bounding box with top-left origin coordinate system.
///
/// - `x0`: left edge
/// - `top`: top edge (distance from top of page)
/// - `x1`: right edge
/// - `bottom`: bottom edge (distance from top of page)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Build a box from two corners given in any order.
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x0: ax.min(bx),
            top: ay.min(by),
            x1: ax.max(bx),
            bottom: ay.max(by),
        }
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True if any coordinate is non-finite or the box has no area.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.x0.is_finite()
            && self.top.is_finite()
            && self.x1.is_finite()
            && self.bottom.is_finite();
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Compute the union of two bounding boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Whether the two boxes share any point. Touching edges count.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x0 <= other.x1
            && other.x0 <= self.x1
            && self.top <= other.bottom
            && other.top <= self.bottom
    }

    /// Grow the box by `amount` on all four sides.
    pub fn expand(&self, amount: f64) -> BBox {
        BBox {
            x0: self.x0 - amount,
            top: self.top - amount,
            x1: self.x1 + amount,
            bottom: self.bottom + amount,
        }
    }

    /// Grow the box by `amount` above and below.
    pub fn expand_vertical(&self, amount: f64) -> BBox {
        BBox {
            top: self.top - amount,
            bottom: self.bottom + amount,
            ..*self
        }
    }

    pub fn scale(&self, factor: f64) -> BBox {
        BBox {
            x0: self.x0 * factor,
            top: self.top * factor,
            x1: self.x1 * factor,
            bottom: self.bottom * factor,
        }
    }

    /// Convert a pixel-space box rendered at `dpi` into PDF points.
    pub fn pixels_to_points(&self, dpi: f64) -> BBox {
        self.scale(POINTS_PER_INCH / dpi)
    }

    /// Convert a PDF-point box into pixel space at `dpi`.
    pub fn points_to_pixels(&self, dpi: f64) -> BBox {
        self.scale(dpi / POINTS_PER_INCH)
    }

    /// Clip the box to the page rectangle `[0, width] x [0, height]`.
    ///
    /// A box lying wholly off the page comes back degenerate.
    pub fn clip_to(&self, page: PageSize) -> BBox {
        BBox {
            x0: self.x0.max(0.0).min(page.width),
            top: self.top.max(0.0).min(page.height),
            x1: self.x1.max(0.0).min(page.width),
            bottom: self.bottom.max(0.0).min(page.height),
        }
    }

    /// Express the box as fractions of the page size.
    pub fn normalize(&self, page: PageSize) -> BBox {
        BBox {
            x0: self.x0 / page.width,
            top: self.top / page.height,
            x1: self.x1 / page.width,
            bottom: self.bottom / page.height,
        }
    }

    /// Inverse of [`BBox::normalize`]; must be given the same page size.
    pub fn denormalize(&self, page: PageSize) -> BBox {
        BBox {
            x0: self.x0 * page.width,
            top: self.top * page.height,
            x1: self.x1 * page.width,
            bottom: self.bottom * page.height,
        }
    }

    /// Corner polygon in order: top-left, top-right, bottom-right, bottom-left.
    pub fn vertices(&self) -> [Point; 4] {
        [
            Point::new(self.x0, self.top),
            Point::new(self.x1, self.top),
            Point::new(self.x1, self.bottom),
            Point::new(self.x0, self.bottom),
        ]
    }

    /// Axis-aligned hull of a polygon. Returns `None` for an empty slice.
    pub fn from_vertices(points: &[Point]) -> Option<BBox> {
        let first = points.first()?;
        let mut bbox = BBox::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bbox.x0 = bbox.x0.min(p.x);
            bbox.top = bbox.top.min(p.y);
            bbox.x1 = bbox.x1.max(p.x);
            bbox.bottom = bbox.bottom.max(p.y);
        }
        Some(bbox)
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &BBox, epsilon: f64) -> bool {
        (self.x0 - other.x0).abs() <= epsilon
            && (self.top - other.top).abs() <= epsilon
            && (self.x1 - other.x1).abs() <= epsilon
            && (self.bottom - other.bottom).abs() <= epsilon
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter, 612 x 792 pt.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// True when both dimensions are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Page width in pixels when rendered at `dpi`.
    pub fn width_px(&self, dpi: f64) -> f64 {
        self.width * dpi / POINTS_PER_INCH
    }
}
