// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Inlines the document's stylesheet cascade.
//!
//! The exported artifact must render identically outside the source
//! document context, so every style the cascade assigns to an element
//! is written onto the clone as an inline `style` attribute.

use crate::options::Resolved;
use crate::tree::{Document, Node, NodeId};

/// Properties that define the element's size.
///
/// These must not be inlined, otherwise the normalizer could not
/// rewrite the export geometry afterwards.
const SIZE_PROPERTIES: &[&str] = &["width", "height", "inline-size", "block-size", "mask-size"];

/// Copies cascade-resolved styles from `original` onto `clone`, recursively.
///
/// Both trees must be structurally identical. Subtrees rooted at an
/// excluded path are skipped entirely; they are pruned later.
pub(crate) fn inline_computed_styles(original: &Document, clone: &mut Document, opt: &Resolved) {
    let css = collect_stylesheet_text(original);
    if css.trim().is_empty() {
        return;
    }

    let mut sheet = simplecss::StyleSheet::new();
    sheet.parse_more(&css);
    if sheet.rules.is_empty() {
        // The stylesheet exists but cannot be evaluated.
        log::warn!("This document's styles cannot be computed. Styles will not be inlined.");
        return;
    }

    inline_node(original, clone, original.root(), &mut Vec::new(), &sheet, opt);
}

fn collect_stylesheet_text(doc: &Document) -> String {
    let mut css = String::new();
    for id in doc.elements_by_tag_name("style") {
        match doc.attribute(id, "type") {
            None | Some("text/css") => {}
            Some(_) => continue,
        }

        for &child in doc.children(id) {
            if let Some(text) = doc.text(child) {
                css.push_str(text);
                css.push('\n');
            }
        }
    }
    css
}

fn inline_node(
    original: &Document,
    clone: &mut Document,
    id: NodeId,
    path: &mut Vec<usize>,
    sheet: &simplecss::StyleSheet,
    opt: &Resolved,
) {
    // Prevent continuation into subtrees the user wants excluded.
    if opt.excluded.iter().any(|p| p == path) {
        return;
    }

    let mut declarations: Vec<(String, String)> = Vec::new();
    let inline: Vec<(String, String)> = match original.attribute(id, "style") {
        Some(style) => simplecss::DeclarationTokenizer::from(style)
            .map(|d| (d.name.to_string(), d.value.to_string()))
            .collect(),
        None => Vec::new(),
    };

    for rule in &sheet.rules {
        if !rule.selector.matches(&Node { doc: original, id }) {
            continue;
        }
        for declaration in &rule.declarations {
            if SIZE_PROPERTIES.contains(&declaration.name) {
                continue;
            }
            // The element's own inline declaration wins over the cascade.
            if inline.iter().any(|(name, _)| name == declaration.name) {
                continue;
            }
            set_declaration(&mut declarations, declaration.name, declaration.value);
        }
    }

    for (name, value) in &inline {
        set_declaration(&mut declarations, name, value);
    }

    if !declarations.is_empty() {
        let style = declarations
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        clone.set_attribute(id, "style", &style);
    }

    for (index, child) in original.element_children(id).into_iter().enumerate() {
        path.push(index);
        inline_node(original, clone, child, path, sheet, opt);
        path.pop();
    }
}

fn set_declaration(declarations: &mut Vec<(String, String)>, name: &str, value: &str) {
    match declarations.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => entry.1 = value.to_string(),
        None => declarations.push((name.to_string(), value.to_string())),
    }
}
