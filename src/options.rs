// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::str::FromStr;

use svgtypes::{Length, LengthUnit, ViewBox};

use crate::tree::Document;

/// Default viewport size to assume if the document declares no usable
/// width/height and no viewBox.
const DEFAULT_SIZE: f64 = 100.0;

/// Export options.
///
/// All fields are optional. Missing or malformed values fall back to
/// their defaults; resolution never fails.
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// Target width in pixels. Multiplied by `scale`.
    ///
    /// Default: the document's own width
    pub width: Option<f64>,

    /// Target height in pixels. Multiplied by `scale`.
    ///
    /// Default: the document's own height
    pub height: Option<f64>,

    /// Scale multiplier.
    ///
    /// Default: 1. Raster export without an explicit width/height
    /// forces 10 to favor output resolution.
    pub scale: Option<f64>,

    /// Inline the document's stylesheet cascade into the exported artifact.
    ///
    /// When disabled, `currentColor` in serialized output resolves
    /// to literal black.
    ///
    /// Default: true
    pub use_css: Option<bool>,

    /// A CSS selector matching elements to exclude from the export.
    pub exclude_by_css_selector: Option<String>,

    /// Replacement color for transparent backgrounds.
    ///
    /// Only applied for JPEG, which has no alpha.
    ///
    /// Default: white
    pub transparent_background_replace: Option<String>,

    /// Allows image hrefs that resolve outside of `resources_dir`.
    ///
    /// Default: false
    pub allow_cross_origin_images: Option<bool>,

    /// Directory used to resolve relative image and font hrefs.
    ///
    /// Expected to be the same as the directory that contains the SVG file,
    /// but can be set to any.
    ///
    /// Default: `None`
    pub resources_dir: Option<PathBuf>,

    /// Directory that exported files are written into.
    ///
    /// Default: the current directory
    pub output_dir: Option<PathBuf>,

    /// PDF-specific options.
    pub pdf: Option<PdfOptions>,
}

/// PDF export options.
#[derive(Clone, Debug, Default)]
pub struct PdfOptions {
    /// Custom fonts to register with the PDF drawing engine.
    pub custom_fonts: Vec<CustomFont>,

    /// Page margins and size.
    pub page_layout: PageLayout,

    /// Draws the export name as a title at the top of the page.
    ///
    /// Default: true
    pub add_title_to_page: Option<bool>,

    /// A caption placed near the bottom of the page.
    ///
    /// Default: empty (no caption)
    pub chart_caption: Option<String>,

    /// Base-14 font family used for the title and caption text.
    ///
    /// Default: Helvetica
    pub pdf_text_font_family: Option<String>,

    /// Title font size. Default: 20
    pub pdf_title_font_size: Option<f64>,

    /// Caption font size. Default: 14
    pub pdf_caption_font_size: Option<f64>,
}

/// PDF page layout.
#[derive(Clone, Debug, Default)]
pub struct PageLayout {
    /// A single margin applied to every side not covered by `margins`.
    ///
    /// Default: 50
    pub margin: Option<f64>,

    /// Per-side margin overrides. Each side falls back to `margin`.
    pub margins: MarginOverrides,

    /// Explicit page size. Computed from the export size when unset.
    pub size: Option<[f64; 2]>,
}

/// Per-side margin overrides.
#[derive(Clone, Copy, Debug, Default)]
#[allow(missing_docs)]
pub struct MarginOverrides {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

/// A custom font for PDF export.
#[derive(Clone, Debug)]
pub struct CustomFont {
    /// The family name used by the SVG content.
    pub font_name: String,
    /// Path to the font file, resolved against `resources_dir`.
    pub url: PathBuf,
    /// Face name inside a collection format (.ttc/.dfont).
    pub style_name: Option<String>,
}

/// Fully resolved export configuration.
///
/// Every field has a concrete value. Constructed fresh per export call
/// and never mutated afterwards.
#[derive(Clone, Debug)]
pub(crate) struct Resolved {
    pub original_width: f64,
    pub original_height: f64,
    pub vb_min_x: f64,
    pub vb_min_y: f64,
    pub vb_width: Option<f64>,
    pub vb_height: Option<f64>,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub use_css: bool,
    /// Structural paths of the excluded elements in the original tree.
    pub excluded: Vec<Vec<usize>>,
    pub transparent_background_replace: String,
    pub allow_cross_origin_images: bool,
    pub resources_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub pdf: PdfResolved,
}

/// Fully resolved PDF configuration.
#[derive(Clone, Debug)]
pub(crate) struct PdfResolved {
    pub custom_fonts: Vec<CustomFont>,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub size: [f64; 2],
    pub add_title_to_page: bool,
    pub chart_caption: String,
    pub text_font_family: String,
    pub title_font_size: f64,
    pub caption_font_size: f64,
}

/// Derives a complete configuration from partial user input and the
/// original document.
///
/// `boost_raster_scale` implements the raster rule: without an explicit
/// width/height the scale is forced to 10 before anything else resolves.
pub(crate) fn resolve(
    doc: &Document,
    user: &ExportOptions,
    boost_raster_scale: bool,
) -> Resolved {
    let root = doc.root();

    let view_box = doc
        .attribute(root, "viewBox")
        .and_then(|v| ViewBox::from_str(v).ok());
    let (vb_min_x, vb_min_y) = match view_box {
        Some(vb) => (vb.x, vb.y),
        None => (0.0, 0.0),
    };
    let vb_width = view_box.map(|vb| vb.w);
    let vb_height = view_box.map(|vb| vb.h);

    let original_width = resolve_side(doc, "width", vb_width);
    let original_height = resolve_side(doc, "height", vb_height);

    let mut scale = 1.0;
    if let Some(s) = user.scale {
        if s.is_finite() && s > 0.0 {
            scale = s;
        }
    }
    if boost_raster_scale && positive(user.width).is_none() && positive(user.height).is_none() {
        scale = 10.0;
    }

    let width = match positive(user.width) {
        Some(w) => w * scale,
        None => original_width * scale,
    };
    let height = match positive(user.height) {
        Some(h) => h * scale,
        None => original_height * scale,
    };

    let use_css = user.use_css != Some(false);

    let transparent_background_replace = match user.transparent_background_replace {
        Some(ref color) if !color.is_empty() => color.clone(),
        _ => "white".to_string(),
    };

    let excluded = match user.exclude_by_css_selector {
        Some(ref text) => match simplecss::Selector::parse(text) {
            Some(selector) => doc.select(&selector),
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let pdf = resolve_pdf(user.pdf.as_ref(), width, height);

    Resolved {
        original_width,
        original_height,
        vb_min_x,
        vb_min_y,
        vb_width,
        vb_height,
        width,
        height,
        scale,
        use_css,
        excluded,
        transparent_background_replace,
        allow_cross_origin_images: user.allow_cross_origin_images == Some(true),
        resources_dir: user.resources_dir.clone(),
        output_dir: user.output_dir.clone(),
        pdf,
    }
}

/// Resolves the document's own width or height in pixels.
///
/// A percentage length has no meaning outside a layout context and
/// resolves against the viewBox, the metric the document itself carries.
/// An absolute length is used as-is. With neither, the viewBox wins,
/// and an undeclared size falls back to 100.
fn resolve_side(doc: &Document, name: &str, vb_side: Option<f64>) -> f64 {
    let root = doc.root();
    let declared = doc
        .attribute(root, name)
        .or_else(|| doc.style_property(root, name))
        .and_then(|v| Length::from_str(v).ok());

    match declared {
        Some(len) if len.unit == LengthUnit::Percent => vb_side.unwrap_or(DEFAULT_SIZE),
        Some(len) if len.number.is_finite() && len.number > 0.0 => len.number,
        _ => vb_side.unwrap_or(DEFAULT_SIZE),
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn resolve_pdf(user: Option<&PdfOptions>, width: f64, height: f64) -> PdfResolved {
    let mut pdf = PdfResolved {
        custom_fonts: Vec::new(),
        margin_top: 50.0,
        margin_bottom: 50.0,
        margin_left: 50.0,
        margin_right: 50.0,
        size: [0.0, 0.0],
        add_title_to_page: true,
        chart_caption: String::new(),
        text_font_family: "Helvetica".to_string(),
        title_font_size: 20.0,
        caption_font_size: 14.0,
    };

    let mut explicit_size = None;
    if let Some(user) = user {
        pdf.custom_fonts = user
            .custom_fonts
            .iter()
            .filter(|f| !f.font_name.is_empty())
            .cloned()
            .collect();

        let layout = &user.page_layout;
        let flat = positive(layout.margin);
        let margin = |side: Option<f64>| {
            side.filter(|v| v.is_finite() && *v >= 0.0)
                .or(flat)
                .unwrap_or(50.0)
        };
        pdf.margin_top = margin(layout.margins.top);
        pdf.margin_bottom = margin(layout.margins.bottom);
        pdf.margin_left = margin(layout.margins.left);
        pdf.margin_right = margin(layout.margins.right);

        explicit_size = layout
            .size
            .filter(|s| s.iter().all(|v| v.is_finite() && *v > 0.0));

        if user.add_title_to_page == Some(false) {
            pdf.add_title_to_page = false;
        }
        if let Some(ref caption) = user.chart_caption {
            if !caption.is_empty() {
                pdf.chart_caption = caption.clone();
            }
        }
        if let Some(ref family) = user.pdf_text_font_family {
            if !family.is_empty() {
                pdf.text_font_family = family.clone();
            }
        }
        if let Some(size) = positive(user.pdf_title_font_size) {
            pdf.title_font_size = size;
        }
        if let Some(size) = positive(user.pdf_caption_font_size) {
            pdf.caption_font_size = size;
        }
    }

    pdf.size = explicit_size.unwrap_or_else(|| {
        let title_row = if pdf.add_title_to_page {
            pdf.title_font_size * 2.0 + 10.0
        } else {
            0.0
        };
        let caption_row = if !pdf.chart_caption.is_empty() {
            pdf.caption_font_size * 4.0 + 10.0
        } else {
            0.0
        };
        [
            width.max(300.0) + pdf.margin_left + pdf.margin_right,
            height.max(300.0) + pdf.margin_top + pdf.margin_bottom + title_row + caption_row,
        ]
    });

    pdf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::parse(text).unwrap()
    }

    #[test]
    fn defaults() {
        let d = doc("<svg width='200' height='100'/>");
        let r = resolve(&d, &ExportOptions::default(), false);
        assert_eq!(r.original_width, 200.0);
        assert_eq!(r.original_height, 100.0);
        assert_eq!(r.width, 200.0);
        assert_eq!(r.height, 100.0);
        assert_eq!(r.scale, 1.0);
        assert!(r.use_css);
        assert!(!r.allow_cross_origin_images);
        assert_eq!(r.transparent_background_replace, "white");
    }

    #[test]
    fn explicit_size_is_scaled() {
        let d = doc("<svg width='200' height='100'/>");
        let opt = ExportOptions {
            width: Some(40.0),
            height: Some(30.0),
            scale: Some(2.0),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, false);
        assert_eq!(r.width, 80.0);
        assert_eq!(r.height, 60.0);
    }

    #[test]
    fn missing_size_falls_back_to_original_times_scale() {
        let d = doc("<svg width='200' height='100'/>");
        let opt = ExportOptions {
            scale: Some(3.0),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, false);
        assert_eq!(r.width, 600.0);
        assert_eq!(r.height, 300.0);
    }

    #[test]
    fn raster_boost_forces_scale_10() {
        let d = doc("<svg width='200' height='100'/>");
        let r = resolve(&d, &ExportOptions::default(), true);
        assert_eq!(r.scale, 10.0);
        assert_eq!(r.width, 2000.0);
        assert_eq!(r.height, 1000.0);
    }

    #[test]
    fn raster_boost_skipped_with_explicit_size() {
        let d = doc("<svg width='200' height='100'/>");
        let opt = ExportOptions {
            width: Some(500.0),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, true);
        assert_eq!(r.scale, 1.0);
        assert_eq!(r.width, 500.0);
        assert_eq!(r.height, 100.0);
    }

    #[test]
    fn percentage_size_resolves_against_view_box() {
        let d = doc("<svg width='100%' height='50%' viewBox='0 0 640 480'/>");
        let r = resolve(&d, &ExportOptions::default(), false);
        assert_eq!(r.original_width, 640.0);
        assert_eq!(r.original_height, 480.0);
    }

    #[test]
    fn percentage_style_size_resolves_against_view_box() {
        let d = doc("<svg style='width: 100%; height: 100%' viewBox='0 0 640 480'/>");
        let r = resolve(&d, &ExportOptions::default(), false);
        assert_eq!(r.original_width, 640.0);
        assert_eq!(r.original_height, 480.0);
    }

    #[test]
    fn undeclared_size_defaults_to_100() {
        let d = doc("<svg/>");
        let r = resolve(&d, &ExportOptions::default(), false);
        assert_eq!(r.original_width, 100.0);
        assert_eq!(r.original_height, 100.0);
    }

    #[test]
    fn view_box_offsets() {
        let d = doc("<svg viewBox='-5 10 640 480'/>");
        let r = resolve(&d, &ExportOptions::default(), false);
        assert_eq!(r.vb_min_x, -5.0);
        assert_eq!(r.vb_min_y, 10.0);
        assert_eq!(r.vb_width, Some(640.0));
    }

    #[test]
    fn malformed_numbers_are_ignored() {
        let d = doc("<svg width='200' height='100'/>");
        let opt = ExportOptions {
            width: Some(-1.0),
            scale: Some(f64::NAN),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, false);
        assert_eq!(r.scale, 1.0);
        assert_eq!(r.width, 200.0);
    }

    #[test]
    fn exclusion_selector() {
        let d = doc("<svg><rect data-skip='1'/><rect/></svg>");
        let opt = ExportOptions {
            exclude_by_css_selector: Some("[data-skip]".to_string()),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, false);
        assert_eq!(r.excluded, vec![vec![0]]);
    }

    #[test]
    fn pdf_margin_precedence() {
        let d = doc("<svg width='200' height='100'/>");
        let opt = ExportOptions {
            pdf: Some(PdfOptions {
                page_layout: PageLayout {
                    margin: Some(20.0),
                    margins: MarginOverrides {
                        top: Some(5.0),
                        ..MarginOverrides::default()
                    },
                    size: None,
                },
                ..PdfOptions::default()
            }),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, false);
        assert_eq!(r.pdf.margin_top, 5.0);
        assert_eq!(r.pdf.margin_bottom, 20.0);
        assert_eq!(r.pdf.margin_left, 20.0);
        assert_eq!(r.pdf.margin_right, 20.0);
    }

    #[test]
    fn pdf_page_size_formula() {
        let d = doc("<svg width='200' height='100'/>");
        let r = resolve(&d, &ExportOptions::default(), false);
        // 300 floor + default 50 margins; title row 20 * 2 + 10; no caption.
        assert_eq!(r.pdf.size, [400.0, 450.0]);
    }

    #[test]
    fn pdf_empty_caption_excludes_caption_row() {
        let d = doc("<svg width='200' height='100'/>");
        let with_caption = ExportOptions {
            pdf: Some(PdfOptions {
                chart_caption: Some("hello".to_string()),
                ..PdfOptions::default()
            }),
            ..ExportOptions::default()
        };
        let without = ExportOptions {
            pdf: Some(PdfOptions {
                chart_caption: Some(String::new()),
                ..PdfOptions::default()
            }),
            ..ExportOptions::default()
        };
        let r1 = resolve(&d, &with_caption, false);
        let r2 = resolve(&d, &without, false);
        assert_eq!(r1.pdf.size[1] - r2.pdf.size[1], 14.0 * 4.0 + 10.0);
        assert_eq!(r2.pdf.size[1], 450.0);
    }

    #[test]
    fn pdf_disabled_title_excludes_title_row() {
        let d = doc("<svg width='200' height='100'/>");
        let opt = ExportOptions {
            pdf: Some(PdfOptions {
                add_title_to_page: Some(false),
                ..PdfOptions::default()
            }),
            ..ExportOptions::default()
        };
        let r = resolve(&d, &opt, false);
        assert_eq!(r.pdf.size, [400.0, 400.0]);
    }
}
