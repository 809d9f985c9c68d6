//! Slide geometry in EMU and aspect-preserving image fitting.

use serde::{Deserialize, Serialize};

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Pixel density assumed for images without usable DPI metadata.
pub const DEFAULT_DPI: i64 = 96;

/// Share of the canvas an oversized image is shrunk to.
pub const CANVAS_SAFETY_SCALE: f64 = 0.9;

/// An axis-aligned rectangle in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    pub fn area(&self) -> i64 {
        self.cx.max(0) * self.cy.max(0)
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.cx <= self.x + self.cx
            && other.y + other.cy <= self.y + self.cy
    }

    /// Shrink by `margin` on every side; never below zero size.
    pub fn inset(&self, margin: i64) -> Rect {
        let margin_x = margin.min(self.cx / 2);
        let margin_y = margin.min(self.cy / 2);
        Rect::new(
            self.x + margin_x,
            self.y + margin_y,
            self.cx - 2 * margin_x,
            self.cy - 2 * margin_y,
        )
    }
}

/// Convert a pixel length to EMU at `dpi`.
pub fn px_to_emu(px: u32, dpi: i64) -> i64 {
    px as i64 * EMU_PER_INCH / dpi.max(1)
}

/// Fit an image of `width` × `height` into `region`, keeping its aspect
/// ratio, and center it on both axes.
///
/// A relatively wider image is constrained by the region width, otherwise
/// by its height. Degenerate sizes return the region unchanged.
pub fn fit_within(width: u32, height: u32, region: Rect) -> Rect {
    if width == 0 || height == 0 || region.cx <= 0 || region.cy <= 0 {
        return region;
    }
    let image_aspect = width as f64 / height as f64;
    let region_aspect = region.cx as f64 / region.cy as f64;

    let (cx, cy) = if image_aspect > region_aspect {
        let cy = (region.cx as f64 / image_aspect) as i64;
        (region.cx, cy.min(region.cy))
    } else {
        let cx = (region.cy as f64 * image_aspect) as i64;
        (cx.min(region.cx), region.cy)
    };

    Rect::new(
        region.x + (region.cx - cx) / 2,
        region.y + (region.cy - cy) / 2,
        cx,
        cy,
    )
}

/// Place an image at its native size centered on a `canvas_cx` × `canvas_cy`
/// slide, shrinking it to [`CANVAS_SAFETY_SCALE`] of the canvas when it
/// would overflow.
pub fn center_on_canvas(width_px: u32, height_px: u32, canvas_cx: i64, canvas_cy: i64) -> Rect {
    let mut cx = px_to_emu(width_px, DEFAULT_DPI);
    let mut cy = px_to_emu(height_px, DEFAULT_DPI);

    if (cx > canvas_cx || cy > canvas_cy) && cx > 0 && cy > 0 {
        let scale = (canvas_cx as f64 / cx as f64).min(canvas_cy as f64 / cy as f64) * CANVAS_SAFETY_SCALE;
        cx = (cx as f64 * scale) as i64;
        cy = (cy as f64 * scale) as i64;
    }

    Rect::new((canvas_cx - cx) / 2, (canvas_cy - cy) / 2, cx, cy)
}
