// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::str::FromStr;

use svgtypes::{Length, LengthUnit, ViewBox};

use crate::normalize::format_number;
use crate::options::{ExportOptions, Resolved};
use crate::tree::{Document, NodeId};
use crate::{deps, download, normalize, options, Error, Format, Graphic};

/// Exports the graphic as a PNG file.
///
/// Without an explicit width/height the scale is forced to 10 to favor
/// output resolution.
pub fn export_png<'a, G: Into<Graphic<'a>>>(
    graphic: G,
    name: Option<&str>,
    options: &ExportOptions,
) -> Result<Option<PathBuf>, Error> {
    export_raster(graphic.into(), name, options, Format::PNG)
}

/// Exports the graphic as a JPEG file.
///
/// JPEG has no alpha channel, so the transparent background is replaced
/// (see [`ExportOptions::transparent_background_replace`]).
pub fn export_jpeg<'a, G: Into<Graphic<'a>>>(
    graphic: G,
    name: Option<&str>,
    options: &ExportOptions,
) -> Result<Option<PathBuf>, Error> {
    export_raster(graphic.into(), name, options, Format::JPEG)
}

fn export_raster(
    graphic: Graphic,
    name: Option<&str>,
    options: &ExportOptions,
    format: Format,
) -> Result<Option<PathBuf>, Error> {
    deps::require_raster(format)?;

    let original = match normalize::get_svg_document(&graphic) {
        Some(doc) => doc,
        None => return Ok(None),
    };

    let opt = options::resolve(&original, options, true);
    let mut clone = original.clone();
    normalize::setup_svg(&mut clone, &original, &opt);

    if format == Format::JPEG {
        inject_background(&mut clone, &opt);
    }

    // The rasterizer does not resolve relative units against a layout,
    // so nested svg elements need explicit sizes up front.
    fix_nested_svg_sizes(&mut clone, &opt);

    let svg_string = clone.to_string(true);
    let data = engine::rasterize(&svg_string, &opt, format)?;
    download::trigger_download(&data, name, format, &opt).map(Some)
}

/// Covers the canvas with an opaque background rect.
///
/// Prefers a background color the element itself declares; falls back to
/// the configured replacement color.
fn inject_background(doc: &mut Document, opt: &Resolved) {
    let root = doc.root();
    let fill = doc
        .style_property(root, "background-color")
        .or_else(|| doc.style_property(root, "background"))
        .filter(|color| !matches!(*color, "transparent" | "none"))
        .unwrap_or(&opt.transparent_background_replace)
        .to_string();

    let rect = doc.insert_new_element(root, "rect");
    doc.set_attribute(rect, "x", "0");
    doc.set_attribute(rect, "y", "0");
    doc.set_attribute(rect, "width", &format_number(opt.width));
    doc.set_attribute(rect, "height", &format_number(opt.height));
    doc.set_attribute(rect, "fill", &fill);
}

/// Gives every nested `svg` element an explicit pixel size: declared
/// attributes first, then the viewBox, then the original dimensions.
fn fix_nested_svg_sizes(doc: &mut Document, opt: &Resolved) {
    let nested: Vec<NodeId> = doc
        .elements_by_tag_name("svg")
        .into_iter()
        .filter(|&id| id != doc.root())
        .collect();

    for id in nested {
        let view_box = doc
            .attribute(id, "viewBox")
            .and_then(|v| ViewBox::from_str(v).ok());
        let width = absolute_size(doc, id, "width");
        let height = absolute_size(doc, id, "height");

        let (width, height) = match (width, height) {
            (Some(_), Some(_)) => continue,
            (Some(w), None) => {
                let h = match view_box {
                    Some(vb) if vb.w > 0.0 => w * vb.h / vb.w,
                    _ => opt.original_height,
                };
                (w, h)
            }
            (None, Some(h)) => {
                let w = match view_box {
                    Some(vb) if vb.h > 0.0 => h * vb.w / vb.h,
                    _ => opt.original_width,
                };
                (w, h)
            }
            (None, None) => match view_box {
                Some(vb) => (vb.w, vb.h),
                None => (opt.original_width, opt.original_height),
            },
        };

        doc.set_attribute(id, "width", &format_number(width));
        doc.set_attribute(id, "height", &format_number(height));
    }
}

fn absolute_size(doc: &Document, id: NodeId, name: &str) -> Option<f64> {
    let length = doc
        .attribute(id, name)
        .and_then(|v| Length::from_str(v).ok())?;
    if length.unit == LengthUnit::Percent {
        return None;
    }
    if length.number.is_finite() && length.number > 0.0 {
        Some(length.number)
    } else {
        None
    }
}

#[cfg(feature = "raster")]
mod engine {
    use super::*;
    use resvg::usvg;

    pub(super) fn rasterize(
        svg: &str,
        opt: &Resolved,
        format: Format,
    ) -> Result<Vec<u8>, Error> {
        let mut usvg_opt = usvg::Options::default();
        usvg_opt.resources_dir = opt.resources_dir.clone();
        usvg_opt.fontdb_mut().load_system_fonts();

        let tree =
            usvg::Tree::from_str(svg, &usvg_opt).map_err(|e| Error::Render(e.to_string()))?;

        let width = opt.width.round() as u32;
        let height = opt.height.round() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("invalid target size {}x{}", width, height)))?;

        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        match format {
            Format::PNG => pixmap.encode_png().map_err(|e| Error::Render(e.to_string())),
            _ => encode_jpeg(&pixmap),
        }
    }

    fn encode_jpeg(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, Error> {
        let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
        }

        let mut data = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut data, 90);
        encoder
            .encode(
                &rgb,
                pixmap.width(),
                pixmap.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| Error::Render(e.to_string()))?;
        Ok(data)
    }
}

#[cfg(not(feature = "raster"))]
mod engine {
    use super::*;

    pub(super) fn rasterize(_: &str, _: &Resolved, _: Format) -> Result<Vec<u8>, Error> {
        unreachable!("rejected by the capability lookup")
    }
}
