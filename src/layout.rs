//! Crop and placement arithmetic for two-up imposition.
//!
//! Every source page is cropped by a percentage of its width/height per edge,
//! then scaled uniformly to fit one half of a landscape A4 sheet and centred
//! there. The gutter bias skews the horizontal crop so that the content of
//! both pages is pulled toward the fold between them.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A4 landscape, in points (1/72 inch)
pub const A4_LANDSCAPE_WIDTH: f64 = 841.890;
pub const A4_LANDSCAPE_HEIGHT: f64 = 595.276;

/// Upper bound (exclusive) for any single edge crop, in percent
pub const MAX_CROP_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("crop percentage for '{edge}' must be between 0 and 50 (exclusive), got {value}")]
    CropOutOfRange { edge: Edge, value: f64 },

    #[error(
        "gutter bias {bias} pushes the {edge} crop to {value:.2}%, which leaves no content (limit is 50%)"
    )]
    BiasedCropOutOfRange { edge: Edge, bias: f64, value: f64 },

    #[error("gutter bias must be between 0 and 2, got {0}")]
    BiasOutOfRange(f64),

    #[error("{axis} offset must be a finite number of points, got {value}")]
    NonFiniteOffset { axis: char, value: f64 },

    #[error("page has no printable area ({width} x {height} pt)")]
    EmptyPage { width: f64, height: f64 },
}

/// Source page box in its own user space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    #[cfg(test)]
    pub fn new(width: f64, height: f64) -> Self {
        PageGeometry {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Build from a `[llx lly urx ury]` box; corners may be given in any order
    pub fn from_box(rect: [f64; 4]) -> Self {
        let [ax, ay, bx, by] = rect;
        PageGeometry {
            x: ax.min(bx),
            y: ay.min(by),
            width: (bx - ax).abs(),
            height: (by - ay).abs(),
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Position of a page in the imposed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    /// Parity of a 1-based slot number
    pub fn of_slot(slot: u32) -> Self {
        if slot % 2 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }

    /// Odd slots open a sheet on the left, even slots close it on the right
    pub fn half(self) -> Half {
        match self {
            Parity::Odd => Half::Left,
            Parity::Even => Half::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Half {
    Left,
    Right,
}

impl Half {
    pub fn index(self) -> u32 {
        match self {
            Half::Left => 0,
            Half::Right => 1,
        }
    }
}

/// Crop amounts per edge, in percent of the page dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgePercentages {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl EdgePercentages {
    fn iter(&self) -> impl Iterator<Item = (Edge, f64)> {
        [
            (Edge::Top, self.top),
            (Edge::Bottom, self.bottom),
            (Edge::Left, self.left),
            (Edge::Right, self.right),
        ]
        .into_iter()
    }
}

fn in_crop_range(value: f64) -> bool {
    (0.0..MAX_CROP_PERCENT).contains(&value)
}

/// Validated crop configuration.
///
/// The gutter-facing edge (right on odd pages, left on even pages) is cropped
/// by `base * bias`, the outer edge by `base * (2 - bias)`. A bias of 1.0
/// crops exactly what was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropSpec {
    edges: EdgePercentages,
    gutter_bias: f64,
}

impl Default for CropSpec {
    fn default() -> Self {
        CropSpec {
            edges: EdgePercentages {
                top: 0.0,
                bottom: 0.0,
                left: 0.0,
                right: 0.0,
            },
            gutter_bias: 1.0,
        }
    }
}

impl CropSpec {
    pub fn new(
        top: f64,
        bottom: f64,
        left: f64,
        right: f64,
        gutter_bias: f64,
    ) -> Result<Self, LayoutError> {
        let edges = EdgePercentages {
            top,
            bottom,
            left,
            right,
        };

        for (edge, value) in edges.iter() {
            if !in_crop_range(value) {
                return Err(LayoutError::CropOutOfRange { edge, value });
            }
        }

        if !(0.0..=2.0).contains(&gutter_bias) {
            return Err(LayoutError::BiasOutOfRange(gutter_bias));
        }

        let spec = CropSpec { edges, gutter_bias };

        // Both parities must still leave content once the bias is applied
        for parity in [Parity::Odd, Parity::Even] {
            for (edge, value) in spec.effective(parity).iter() {
                if !in_crop_range(value) {
                    return Err(LayoutError::BiasedCropOutOfRange {
                        edge,
                        bias: gutter_bias,
                        value,
                    });
                }
            }
        }

        Ok(spec)
    }

    pub fn edges(&self) -> EdgePercentages {
        self.edges
    }

    pub fn gutter_bias(&self) -> f64 {
        self.gutter_bias
    }

    /// Crop percentages after the gutter bias for a page of the given parity
    pub fn effective(&self, parity: Parity) -> EdgePercentages {
        let pulled = self.gutter_bias;
        let opposite = 2.0 - self.gutter_bias;

        let (left, right) = match parity {
            Parity::Odd => (self.edges.left * opposite, self.edges.right * pulled),
            Parity::Even => (self.edges.left * pulled, self.edges.right * opposite),
        };

        EdgePercentages {
            top: self.edges.top,
            bottom: self.edges.bottom,
            left,
            right,
        }
    }

    /// Area of `page` that survives cropping
    pub fn crop_rect(&self, page: &PageGeometry, parity: Parity) -> Result<CropRect, LayoutError> {
        if !(page.width > 0.0 && page.height > 0.0) {
            return Err(LayoutError::EmptyPage {
                width: page.width,
                height: page.height,
            });
        }

        let e = self.effective(parity);
        let rect = CropRect {
            x0: page.x + page.width * e.left / 100.0,
            y0: page.y + page.height * e.bottom / 100.0,
            x1: page.x + page.width - page.width * e.right / 100.0,
            y1: page.y + page.height - page.height * e.top / 100.0,
        };

        Ok(rect)
    }
}

/// Lower-left `(x0, y0)` and upper-right `(x1, y1)` corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl CropRect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// Uniform scale followed by a translation: `[s 0 0 s e f]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Transform {
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.scale * x + self.translate_x,
            self.scale * y + self.translate_y,
        )
    }

    /// Content stream fragment drawing the XObject `name` under this transform
    pub fn to_content_op(&self, name: &str) -> String {
        format!(
            "q {s:.6} 0 0 {s:.6} {e:.4} {f:.4} cm /{name} Do Q\n",
            s = self.scale,
            e = self.translate_x,
            f = self.translate_y,
        )
    }
}

/// Where on the output sheet one cropped page goes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacementSpec {
    pub sheet_width: f64,
    pub sheet_height: f64,
    pub half: Half,
    pub x_offset: f64,
    pub y_offset: f64,
}

/// Reject offsets that would put NaN or infinity into the content stream
pub fn check_offsets(x_offset: f64, y_offset: f64) -> Result<(f64, f64), LayoutError> {
    for (axis, value) in [('x', x_offset), ('y', y_offset)] {
        if !value.is_finite() {
            return Err(LayoutError::NonFiniteOffset { axis, value });
        }
    }
    Ok((x_offset, y_offset))
}

impl PlacementSpec {
    pub fn a4_landscape(half: Half, x_offset: f64, y_offset: f64) -> Self {
        PlacementSpec {
            sheet_width: A4_LANDSCAPE_WIDTH,
            sheet_height: A4_LANDSCAPE_HEIGHT,
            half,
            x_offset,
            y_offset,
        }
    }

    pub fn half_width(&self) -> f64 {
        self.sheet_width / 2.0
    }

    /// Scale `crop` to fit its half of the sheet, centre it, then apply the offsets
    pub fn transform(&self, crop: &CropRect) -> Transform {
        let half_width = self.half_width();
        let scale = (half_width / crop.width()).min(self.sheet_height / crop.height());

        let scaled_width = crop.width() * scale;
        let scaled_height = crop.height() * scale;

        let x = f64::from(self.half.index()) * half_width
            + (half_width - scaled_width) / 2.0
            + self.x_offset;
        let y = (self.sheet_height - scaled_height) / 2.0 + self.y_offset;

        // The crop origin, not the page origin, lands on (x, y)
        Transform {
            scale,
            translate_x: x - scale * crop.x0,
            translate_y: y - scale * crop.y0,
        }
    }
}

/// Complete layout of one page slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PagePlacement {
    pub slot: u32,
    pub parity: Parity,
    pub half: Half,
    pub crop_percent: EdgePercentages,
    pub crop: CropRect,
    pub transform: Transform,
}

/// Lay out the page in 1-based `slot` of the imposed sequence
pub fn layout_page(
    page: &PageGeometry,
    crop: &CropSpec,
    slot: u32,
    offset: (f64, f64),
) -> Result<PagePlacement, LayoutError> {
    let (x_offset, y_offset) = check_offsets(offset.0, offset.1)?;
    let parity = Parity::of_slot(slot);
    let half = parity.half();
    let rect = crop.crop_rect(page, parity)?;
    let placement = PlacementSpec::a4_landscape(half, x_offset, y_offset);

    Ok(PagePlacement {
        slot,
        parity,
        half,
        crop_percent: crop.effective(parity),
        crop: rect,
        transform: placement.transform(&rect),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_gutter_bias_odd_and_even() {
        let spec = CropSpec::new(0.0, 0.0, 8.0, 8.0, 1.2).unwrap();

        let odd = spec.effective(Parity::Odd);
        assert!(close(odd.right, 9.6));
        assert!(close(odd.left, 6.4));

        let even = spec.effective(Parity::Even);
        assert!(close(even.left, 9.6));
        assert!(close(even.right, 6.4));
    }

    #[test]
    fn test_neutral_bias_keeps_configured_crop() {
        let spec = CropSpec::new(3.0, 4.0, 5.0, 7.0, 1.0).unwrap();
        for parity in [Parity::Odd, Parity::Even] {
            let e = spec.effective(parity);
            assert_eq!((e.top, e.bottom, e.left, e.right), (3.0, 4.0, 5.0, 7.0));
        }
    }

    #[test]
    fn test_zero_crop_keeps_whole_page() {
        let page = PageGeometry::new(595.0, 842.0);
        let rect = CropSpec::default().crop_rect(&page, Parity::Odd).unwrap();
        assert_eq!(rect.as_array(), [0.0, 0.0, 595.0, 842.0]);
    }

    #[test]
    fn test_crop_rect_respects_box_origin() {
        let page = PageGeometry::from_box([100.0, 50.0, 300.0, 450.0]);
        let spec = CropSpec::new(10.0, 5.0, 10.0, 20.0, 1.0).unwrap();
        let rect = spec.crop_rect(&page, Parity::Even).unwrap();

        assert!(close(rect.x0, 120.0));
        assert!(close(rect.x1, 260.0));
        assert!(close(rect.y0, 70.0));
        assert!(close(rect.y1, 410.0));
    }

    #[test]
    fn test_edge_out_of_range() {
        assert_eq!(
            CropSpec::new(50.0, 0.0, 0.0, 0.0, 1.0),
            Err(LayoutError::CropOutOfRange {
                edge: Edge::Top,
                value: 50.0
            })
        );
        assert!(CropSpec::new(0.0, -1.0, 0.0, 0.0, 1.0).is_err());
        assert!(CropSpec::new(0.0, 0.0, f64::NAN, 0.0, 1.0).is_err());
        assert!(CropSpec::new(49.9, 49.9, 0.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn test_bias_out_of_range() {
        assert_eq!(
            CropSpec::new(0.0, 0.0, 5.0, 5.0, 2.5),
            Err(LayoutError::BiasOutOfRange(2.5))
        );
        assert!(CropSpec::new(0.0, 0.0, 5.0, 5.0, -0.1).is_err());
    }

    #[test]
    fn test_bias_that_eats_the_page() {
        let err = CropSpec::new(0.0, 0.0, 30.0, 30.0, 1.8).unwrap_err();
        assert!(matches!(err, LayoutError::BiasedCropOutOfRange { .. }));
    }

    #[test]
    fn test_empty_page_rejected() {
        let page = PageGeometry::new(0.0, 842.0);
        assert!(CropSpec::default().crop_rect(&page, Parity::Odd).is_err());
    }

    #[test]
    fn test_parity_and_half() {
        assert_eq!(Parity::of_slot(1), Parity::Odd);
        assert_eq!(Parity::of_slot(2), Parity::Even);
        assert_eq!(Parity::of_slot(7).half(), Half::Left);
        assert_eq!(Parity::of_slot(8).half(), Half::Right);
    }

    #[test]
    fn test_portrait_page_fills_half_height() {
        // A4 portrait into half of A4 landscape: height-bound
        let page = PageGeometry::new(595.276, 841.890);
        let placed = layout_page(&page, &CropSpec::default(), 1, (0.0, 0.0)).unwrap();
        let t = placed.transform;

        let (_, bottom) = t.apply(0.0, 0.0);
        let (_, top) = t.apply(0.0, page.height);
        assert!(close(bottom, 0.0));
        assert!(close(top, A4_LANDSCAPE_HEIGHT));
        assert!(close(t.scale, A4_LANDSCAPE_HEIGHT / 841.890));
    }

    #[test]
    fn test_landscape_page_fills_half_width() {
        let page = PageGeometry::new(800.0, 400.0);
        assert!(page.is_landscape());
        let placed = layout_page(&page, &CropSpec::default(), 2, (0.0, 0.0)).unwrap();
        let t = placed.transform;

        let half = A4_LANDSCAPE_WIDTH / 2.0;
        let (left, bottom) = t.apply(0.0, 0.0);
        let (right, top) = t.apply(800.0, 400.0);
        assert!(close(left, half));
        assert!(close(right, A4_LANDSCAPE_WIDTH));
        // Vertically centred
        assert!(close(bottom, A4_LANDSCAPE_HEIGHT - top));
    }

    #[test]
    fn test_cropped_region_centred_in_its_half() {
        let page = PageGeometry::from_box([10.0, 20.0, 622.0, 812.0]);
        let spec = CropSpec::new(8.0, 6.0, 8.0, 8.0, 1.2).unwrap();
        let half = A4_LANDSCAPE_WIDTH / 2.0;

        for slot in [1, 2] {
            let placed = layout_page(&page, &spec, slot, (0.0, 0.0)).unwrap();
            let (x0, y0) = placed.transform.apply(placed.crop.x0, placed.crop.y0);
            let (x1, y1) = placed.transform.apply(placed.crop.x1, placed.crop.y1);

            let origin = f64::from(placed.half.index()) * half;
            assert!(x0 >= origin - EPS && x1 <= origin + half + EPS);
            assert!(y0 >= -EPS && y1 <= A4_LANDSCAPE_HEIGHT + EPS);
            assert!(close(x0 - origin, origin + half - x1));
            assert!(close(y0, A4_LANDSCAPE_HEIGHT - y1));
        }
    }

    #[test]
    fn test_offsets_shift_placement() {
        let page = PageGeometry::new(612.0, 792.0);
        let spec = CropSpec::default();
        let base = layout_page(&page, &spec, 1, (0.0, 0.0)).unwrap();
        let nudged = layout_page(&page, &spec, 1, (12.5, -4.0)).unwrap();

        assert_eq!(base.transform.scale, nudged.transform.scale);
        assert!(close(nudged.transform.translate_x - base.transform.translate_x, 12.5));
        assert!(close(nudged.transform.translate_y - base.transform.translate_y, -4.0));
    }

    #[test]
    fn test_non_finite_offsets_rejected() {
        assert_eq!(check_offsets(-12.5, 4.0), Ok((-12.5, 4.0)));
        assert_eq!(
            check_offsets(f64::INFINITY, 0.0),
            Err(LayoutError::NonFiniteOffset {
                axis: 'x',
                value: f64::INFINITY
            })
        );
        assert!(check_offsets(0.0, f64::NEG_INFINITY).is_err());

        let page = PageGeometry::new(612.0, 792.0);
        let err = layout_page(&page, &CropSpec::default(), 1, (f64::NAN, 0.0)).unwrap_err();
        assert!(matches!(err, LayoutError::NonFiniteOffset { axis: 'x', .. }));
    }

    #[test]
    fn test_content_op() {
        let t = Transform {
            scale: 0.5,
            translate_x: 10.0,
            translate_y: -2.25,
        };
        assert_eq!(
            t.to_content_op("P0"),
            "q 0.500000 0 0 0.500000 10.0000 -2.2500 cm /P0 Do Q\n"
        );
    }
}
