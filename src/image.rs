// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Embeds external raster images as data URIs.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use base64::Engine as _;

use crate::options::Resolved;
use crate::tree::{Document, NodeId};

/// Replaces the href of every `image` element that references an external
/// file with an embedded PNG data URI.
///
/// Every reference is attempted exactly once. A failed load leaves its
/// element untouched and never fails the export.
pub(crate) fn inline_images(doc: &mut Document, opt: &Resolved) {
    for id in doc.elements_by_tag_name("image") {
        let href = match doc
            .attribute(id, "href")
            .or_else(|| doc.attribute(id, "xlink:href"))
        {
            Some(href) => href.to_string(),
            None => continue,
        };

        // Already embedded.
        if data_url::DataUrl::process(&href).is_ok() {
            continue;
        }

        if let Some(uri) = convert_image_url_to_data_uri(doc, id, &href, opt) {
            doc.set_attribute(id, "href", &uri);
            doc.remove_attribute(id, "xlink:href");
        }
    }
}

fn convert_image_url_to_data_uri(
    doc: &Document,
    id: NodeId,
    href: &str,
    opt: &Resolved,
) -> Option<String> {
    let path = match resolve_href(href, opt) {
        Some(path) => path,
        None => {
            log::warn!("Image '{}' is outside of the resources directory. Skipped.", href);
            return None;
        }
    };

    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(_) => {
            log::warn!("Failed to load '{}'. Skipped.", href);
            return None;
        }
    };

    let raster = match image::load_from_memory(&data) {
        Ok(raster) => raster.to_rgba8(),
        Err(_) => {
            log::warn!("'{}' is not a supported raster image. Skipped.", href);
            return None;
        }
    };

    // The canvas prefers the image's natural size and falls back to the
    // element's declared size, then to 300.
    let canvas_width = natural(raster.width())
        .or_else(|| declared_size(doc, id, "width"))
        .unwrap_or(300);
    let canvas_height = natural(raster.height())
        .or_else(|| declared_size(doc, id, "height"))
        .unwrap_or(300);

    let mut canvas = image::RgbaImage::new(canvas_width, canvas_height);
    image::imageops::replace(&mut canvas, &raster, 0, 0);

    let mut png = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png);
    if image::DynamicImage::ImageRgba8(canvas)
        .write_with_encoder(encoder)
        .is_err()
    {
        log::warn!("Failed to encode '{}'. Skipped.", href);
        return None;
    }

    Some(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    ))
}

/// Resolves an href against the resources directory.
///
/// Absolute paths and paths that climb out of the resources directory are
/// the native analogue of a cross-origin request and require
/// `allow_cross_origin_images`.
fn resolve_href(href: &str, opt: &Resolved) -> Option<PathBuf> {
    let path = Path::new(href);

    if !opt.allow_cross_origin_images {
        let escapes = path.is_absolute()
            || path.components().any(|c| matches!(c, Component::ParentDir));
        if escapes {
            return None;
        }
    }

    Some(match opt.resources_dir {
        Some(ref dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    })
}

fn natural(side: u32) -> Option<u32> {
    if side > 0 {
        Some(side)
    } else {
        None
    }
}

fn declared_size(doc: &Document, id: NodeId, name: &str) -> Option<u32> {
    let value = doc
        .attribute(id, name)
        .or_else(|| doc.style_property(id, name))?;
    let length = svgtypes::Length::from_str(value).ok()?;
    if length.unit == svgtypes::LengthUnit::Percent {
        return None;
    }
    if length.number.is_finite() && length.number >= 1.0 {
        Some(length.number.round() as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{resolve, ExportOptions};

    fn resolved(doc: &Document, options: &ExportOptions) -> Resolved {
        resolve(doc, options, false)
    }

    #[test]
    fn data_uris_are_left_alone() {
        let uri = "data:image/png;base64,iVBORw0KGgo=";
        let mut doc =
            Document::parse(&format!("<svg><image href='{}'/></svg>", uri)).unwrap();
        let opt = resolved(&doc.clone(), &ExportOptions::default());
        inline_images(&mut doc, &opt);
        let image = doc.elements_by_tag_name("image")[0];
        assert_eq!(doc.attribute(image, "href"), Some(uri));
    }

    #[test]
    fn missing_files_are_skipped() {
        let mut doc = Document::parse("<svg><image href='no-such.png'/></svg>").unwrap();
        let opt = resolved(&doc.clone(), &ExportOptions::default());
        inline_images(&mut doc, &opt);
        let image = doc.elements_by_tag_name("image")[0];
        assert_eq!(doc.attribute(image, "href"), Some("no-such.png"));
    }

    #[test]
    fn escaping_hrefs_require_cross_origin() {
        let opt = resolved(
            &Document::parse("<svg/>").unwrap(),
            &ExportOptions::default(),
        );
        assert!(resolve_href("../secret.png", &opt).is_none());
        assert!(resolve_href("/etc/secret.png", &opt).is_none());
        assert!(resolve_href("ok.png", &opt).is_some());

        let permissive = resolved(
            &Document::parse("<svg/>").unwrap(),
            &ExportOptions {
                allow_cross_origin_images: Some(true),
                ..ExportOptions::default()
            },
        );
        assert!(resolve_href("../secret.png", &permissive).is_some());
    }

    #[test]
    fn local_image_becomes_png_data_uri() {
        // A 2x1 PNG written through the same codec the inliner uses.
        let dir = std::env::temp_dir().join("svg-export-test-images");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pixel.png");
        image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 0, 0, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let mut doc = Document::parse("<svg><image href='pixel.png'/></svg>").unwrap();
        let opt = resolved(
            &doc.clone(),
            &ExportOptions {
                resources_dir: Some(dir),
                ..ExportOptions::default()
            },
        );
        inline_images(&mut doc, &opt);

        let image = doc.elements_by_tag_name("image")[0];
        let href = doc.attribute(image, "href").unwrap();
        assert!(href.starts_with("data:image/png;base64,"));
    }
}
