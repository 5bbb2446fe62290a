// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The SVG normalization pipeline.
//!
//! Turns partially specified input into a self-contained document with
//! explicit geometry, ready for the format-specific encoders.

use crate::options::Resolved;
use crate::style;
use crate::tree::Document;
use crate::Graphic;

/// Validates the input graphic and returns an owned working tree.
///
/// Returns `None` when the input cannot be recognized as an element,
/// which aborts the export with a warning and no artifact.
pub(crate) fn get_svg_document(graphic: &Graphic) -> Option<Document> {
    match *graphic {
        Graphic::Markup(text) => match Document::parse(text) {
            Ok(doc) => Some(doc),
            Err(_) => {
                log::warn!("The input svg was not recognized.");
                None
            }
        },
        Graphic::Element(doc) => Some(doc.clone()),
    }
}

/// Normalizes the clone in place (element output).
///
/// Inlines the stylesheet cascade, prunes excluded subtrees and rewrites
/// the root geometry attributes.
pub(crate) fn setup_svg(clone: &mut Document, original: &Document, opt: &Resolved) {
    if opt.use_css {
        style::inline_computed_styles(original, clone, opt);
    }

    // Deepest-first, so sibling indexes stay valid while pruning.
    let mut excluded = opt.excluded.clone();
    excluded.sort();
    for path in excluded.iter().rev() {
        if let Some(id) = clone.node_by_path(path) {
            clone.detach(id);
        }
    }

    let root = clone.root();
    remove_style_properties(clone, &["width", "height"]);
    clone.set_attribute(root, "width", &format_number(opt.width));
    clone.set_attribute(root, "height", &format_number(opt.height));
    clone.set_attribute(root, "preserveAspectRatio", "none");
    clone.set_attribute(
        root,
        "viewBox",
        &format!(
            "{} {} {} {}",
            format_number(opt.vb_min_x),
            format_number(opt.vb_min_y),
            format_number(opt.vb_width.unwrap_or(opt.original_width)),
            format_number(opt.vb_height.unwrap_or(opt.original_height)),
        ),
    );
}

/// Normalizes the clone and serializes it (string output).
///
/// The serialized form declares the SVG and XLink namespaces exactly once
/// and carries no `currentColor` tokens; a detached document gives them
/// no valid context.
pub(crate) fn setup_svg_string(clone: &mut Document, original: &Document, opt: &Resolved) -> String {
    setup_svg(clone, original, opt);
    clone.to_string(true)
}

/// Removes declarations from the root's inline `style` attribute.
fn remove_style_properties(doc: &mut Document, names: &[&str]) {
    let root = doc.root();
    let style = match doc.attribute(root, "style") {
        Some(style) => style,
        None => return,
    };

    let kept: Vec<String> = simplecss::DeclarationTokenizer::from(style)
        .filter(|d| !names.contains(&d.name))
        .map(|d| format!("{}: {}", d.name, d.value))
        .collect();

    if kept.is_empty() {
        doc.remove_attribute(root, "style");
    } else {
        doc.set_attribute(root, "style", &kept.join("; "));
    }
}

/// Writes a number the way a browser would: no trailing `.0`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{resolve, ExportOptions};

    fn normalize(text: &str, options: &ExportOptions) -> String {
        let original = Document::parse(text).unwrap();
        let opt = resolve(&original, options, false);
        let mut clone = original.clone();
        setup_svg_string(&mut clone, &original, &opt)
    }

    #[test]
    fn geometry_attributes_are_rewritten() {
        let out = normalize("<svg width='200' height='100'/>", &ExportOptions::default());
        assert!(out.contains("width=\"200\""));
        assert!(out.contains("height=\"100\""));
        assert!(out.contains("preserveAspectRatio=\"none\""));
        assert!(out.contains("viewBox=\"0 0 200 100\""));
    }

    #[test]
    fn existing_view_box_is_kept() {
        let out = normalize(
            "<svg width='200' height='100' viewBox='10 20 640 480'/>",
            &ExportOptions::default(),
        );
        assert!(out.contains("viewBox=\"10 20 640 480\""));
    }

    #[test]
    fn root_style_size_is_cleared() {
        let out = normalize(
            "<svg style='width: 50%; height: 50%; fill: red' viewBox='0 0 10 10'/>",
            &ExportOptions::default(),
        );
        assert!(!out.contains("width: 50%"));
        assert!(out.contains("fill: red"));
    }

    #[test]
    fn current_color_is_replaced_in_string_output() {
        let out = normalize(
            "<svg width='10' height='10'><rect fill='currentColor'/></svg>",
            &ExportOptions::default(),
        );
        assert!(!out.contains("currentColor"));
        assert!(out.contains("black"));
    }

    #[test]
    fn excluded_elements_are_pruned() {
        let out = normalize(
            "<svg width='10' height='10'><g data-skip='1'><rect/></g><circle/></svg>",
            &ExportOptions {
                exclude_by_css_selector: Some("[data-skip]".to_string()),
                ..ExportOptions::default()
            },
        );
        assert!(!out.contains("<g"));
        assert!(!out.contains("<rect"));
        assert!(out.contains("<circle"));
    }

    #[test]
    fn pruning_multiple_siblings_keeps_positions_straight() {
        let out = normalize(
            "<svg width='10' height='10'>\
             <rect class='skip'/><circle/><rect class='skip'/><path/></svg>",
            &ExportOptions {
                exclude_by_css_selector: Some(".skip".to_string()),
                ..ExportOptions::default()
            },
        );
        assert!(!out.contains("<rect"));
        assert!(out.contains("<circle"));
        assert!(out.contains("<path"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = normalize(
            "<svg width='200' height='100' viewBox='0 0 200 100'/>",
            &ExportOptions::default(),
        );
        let second = normalize(&first, &ExportOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn unrecognized_input_is_rejected() {
        assert!(get_svg_document(&Graphic::Markup("not an svg")).is_none());
        assert!(get_svg_document(&Graphic::Markup("<svg/>")).is_some());
    }
}
