//! Page geometry: transforms, rectangles and page boxes
//!
//! Rectangles handed to the detection code live in *page space*: origin at the
//! top-left corner of the visible page box, y growing downwards, units in PDF
//! points.
//! Content streams work in PDF user space (origin bottom-left); [`PageBox`]
//! converts between the two.

use serde::{Deserialize, Serialize};

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self` applied first, then `other` (PDF row-vector order: self × other)
    ///
    /// A `cm` operator with matrix M updates the CTM to `M.then(&ctm)`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Length of the transformed unit y-vector (used as effective font scale)
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Axis-aligned bounds of a rectangle after transformation
    pub fn transform_rect(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        let corners = [
            self.apply(x0, y0),
            self.apply(x1, y0),
            self.apply(x0, y1),
            self.apply(x1, y1),
        ];
        let mut rect = Rect::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1);
        for &(x, y) in &corners[1..] {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        rect
    }
}

/// Axis-aligned rectangle given by two corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// The visible page area: the CropBox clipped to the MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter in points, used when a page carries no MediaBox
    pub fn letter() -> Self {
        Self { llx: 0.0, lly: 0.0, urx: 612.0, ury: 792.0 }
    }

    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Overlap of two boxes, or `None` when they do not overlap
    pub fn intersect(&self, other: &PageBox) -> Option<PageBox> {
        let clipped = PageBox {
            llx: self.llx.max(other.llx),
            lly: self.lly.max(other.lly),
            urx: self.urx.min(other.urx),
            ury: self.ury.min(other.ury),
        };
        (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped)
    }

    /// Convert a user-space rectangle to top-left page space
    pub fn to_page_space(&self, user: &Rect) -> Rect {
        Rect::new(
            user.x0.min(user.x1) - self.llx,
            self.ury - user.y0.max(user.y1),
            user.x0.max(user.x1) - self.llx,
            self.ury - user.y0.min(user.y1),
        )
    }

    /// Convert a page-space rectangle back to user space as `(x, y, w, h)`,
    /// the operand order of the `re` operator
    pub fn to_user_rect(&self, page: &Rect) -> (f32, f32, f32, f32) {
        let x = self.llx + page.x0.min(page.x1);
        let y = self.ury - page.y0.max(page.y1);
        (x, y, page.width(), page.height())
    }
}

/// A rectangle anchored to the lower-right corner of a page
///
/// Starts at `left` × width and `top` × height, and extends to `inset` units
/// short of the right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub left: f32,
    pub top: f32,
    pub inset: f32,
}

impl Zone {
    pub const fn new(left: f32, top: f32, inset: f32) -> Self {
        Self { left, top, inset }
    }

    /// Resolve the zone against a page of the given size (page space)
    pub fn resolve(&self, width: f32, height: f32) -> Rect {
        Rect::new(
            width * self.left,
            height * self.top,
            width - self.inset,
            height - self.inset,
        )
    }
}
