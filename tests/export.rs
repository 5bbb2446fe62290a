// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use once_cell::sync::Lazy;

use svg_export::{
    export_jpeg, export_pdf, export_png, export_svg, ExportOptions, PdfOptions,
};

static OUT_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let dir = std::env::temp_dir().join(format!("svg-export-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
});

fn options() -> ExportOptions {
    ExportOptions {
        output_dir: Some(OUT_DIR.clone()),
        ..ExportOptions::default()
    }
}

const CHART: &str = "\
<svg width='200' height='100'>\
<style>rect { fill: steelblue }</style>\
<rect x='10' y='10' width='180' height='80'/>\
<text x='20' y='50' fill='currentColor'>total</text>\
</svg>";

#[test]
fn svg_artifact_is_self_contained() {
    let path = export_svg(CHART, Some("self-contained"), &options())
        .unwrap()
        .unwrap();
    let text = std::fs::read_to_string(path).unwrap();

    assert!(text.starts_with("<?xml version=\"1.0\" standalone=\"no\"?>\r\n"));
    assert!(!text.contains("currentColor"));
    assert_eq!(text.matches("http://www.w3.org/2000/svg").count(), 1);
    assert_eq!(text.matches("http://www.w3.org/1999/xlink").count(), 1);
    assert!(text.contains("preserveAspectRatio=\"none\""));
    assert!(text.contains("viewBox=\"0 0 200 100\""));
    // The stylesheet cascade must be carried inline.
    assert!(text.contains("fill: steelblue"));
}

#[test]
fn exporting_twice_keeps_namespaces_unique() {
    let first = export_svg(CHART, Some("twice-a"), &options())
        .unwrap()
        .unwrap();
    let first_text = std::fs::read_to_string(first).unwrap();
    let body = first_text.splitn(2, "\r\n").nth(1).unwrap().to_string();

    let second = export_svg(body.as_str(), Some("twice-b"), &options())
        .unwrap()
        .unwrap();
    let second_text = std::fs::read_to_string(second).unwrap();
    assert_eq!(second_text.matches("http://www.w3.org/2000/svg").count(), 1);
    assert_eq!(second_text.matches("http://www.w3.org/1999/xlink").count(), 1);
}

#[test]
fn excluded_elements_do_not_reach_the_artifact() {
    let svg = "<svg width='100' height='100'>\
               <g data-skip='1'><rect id='secret'/></g><circle/></svg>";
    let opt = ExportOptions {
        exclude_by_css_selector: Some("[data-skip]".to_string()),
        ..options()
    };
    let path = export_svg(svg, Some("excluded"), &opt).unwrap().unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert!(!text.contains("<g"));
    assert!(!text.contains("secret"));
    assert!(text.contains("<circle"));
}

#[test]
fn file_names_are_sanitized() {
    let path = export_svg(CHART, Some("a/b?c"), &options())
        .unwrap()
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "a_b_c.svg");
}

#[test]
fn unrecognized_input_aborts_without_artifact() {
    assert!(export_svg("definitely not svg", Some("nope"), &options())
        .unwrap()
        .is_none());
    assert!(!OUT_DIR.join("nope.svg").exists());
}

#[test]
fn default_export_name_is_chart() {
    let path = export_svg(CHART, None, &options()).unwrap().unwrap();
    assert_eq!(path.file_name().unwrap(), "chart.svg");
}

#[cfg(feature = "raster")]
#[test]
fn png_export_favors_resolution() {
    let path = export_png(CHART, Some("resolution"), &options())
        .unwrap()
        .unwrap();
    let data = std::fs::read(path).unwrap();
    assert!(data.starts_with(b"\x89PNG\r\n\x1a\n"));

    // No explicit size requested: scale 10 kicks in.
    let raster = image::load_from_memory(&data).unwrap();
    assert_eq!(raster.width(), 2000);
    assert_eq!(raster.height(), 1000);
}

#[cfg(feature = "raster")]
#[test]
fn png_export_honors_explicit_size() {
    let opt = ExportOptions {
        width: Some(64.0),
        height: Some(32.0),
        ..options()
    };
    let path = export_png(CHART, Some("explicit"), &opt).unwrap().unwrap();
    let raster = image::load_from_memory(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(raster.width(), 64);
    assert_eq!(raster.height(), 32);
}

#[cfg(feature = "raster")]
#[test]
fn jpeg_export_replaces_the_transparent_background() {
    let svg = "<svg width='100' height='100'>\
               <rect x='40' y='40' width='20' height='20' fill='red'/></svg>";
    let path = export_jpeg(svg, Some("background"), &options())
        .unwrap()
        .unwrap();
    let data = std::fs::read(path).unwrap();
    assert!(data.starts_with(&[0xff, 0xd8, 0xff]));

    // The uncovered corner must be the default replacement color.
    let raster = image::load_from_memory(&data).unwrap().to_rgb8();
    let corner = raster.get_pixel(2, 2);
    assert!(corner[0] > 250 && corner[1] > 250 && corner[2] > 250);
}

#[cfg(feature = "pdf")]
#[test]
fn pdf_export_produces_a_document() {
    let path = export_pdf(CHART, Some("document"), &options())
        .unwrap()
        .unwrap();
    let data = std::fs::read(path).unwrap();
    assert!(data.starts_with(b"%PDF"));
}

#[cfg(feature = "pdf")]
#[test]
fn pdf_export_with_caption() {
    let opt = ExportOptions {
        pdf: Some(PdfOptions {
            chart_caption: Some("A caption under the chart".to_string()),
            ..PdfOptions::default()
        }),
        ..options()
    };
    let path = export_pdf(CHART, Some("captioned"), &opt).unwrap().unwrap();
    let data = std::fs::read(path).unwrap();
    assert!(data.starts_with(b"%PDF"));
}

#[test]
fn element_input_is_not_modified() {
    let doc = svg_export::tree::Document::parse(CHART).unwrap();
    let before = doc.to_string(false);
    export_svg(&doc, Some("element-input"), &options())
        .unwrap()
        .unwrap();
    assert_eq!(doc.to_string(false), before);
}
