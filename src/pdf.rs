// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use crate::options::ExportOptions;
use crate::{deps, normalize, Error, Format, Graphic};

/// Exports the graphic as a single-page PDF file.
///
/// The page carries an optional title (the export name), the SVG content
/// and an optional caption, laid out inside the configured margins.
pub fn export_pdf<'a, G: Into<Graphic<'a>>>(
    graphic: G,
    name: Option<&str>,
    options: &ExportOptions,
) -> Result<Option<PathBuf>, Error> {
    deps::require_pdf(Format::PDF)?;

    let original = match normalize::get_svg_document(&graphic.into()) {
        Some(doc) => doc,
        None => return Ok(None),
    };

    engine::export(&original, name, options)
}

#[cfg(feature = "pdf")]
mod engine {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
    use svg2pdf::usvg;

    use crate::options::{CustomFont, ExportOptions, Resolved};
    use crate::tree::Document;
    use crate::{download, image, normalize, options, Error, Format};

    pub(super) fn export(
        original: &Document,
        name: Option<&str>,
        options: &ExportOptions,
    ) -> Result<Option<PathBuf>, Error> {
        let opt = options::resolve(original, options, false);
        let mut clone = original.clone();
        normalize::setup_svg(&mut clone, original, &opt);

        image::inline_images(&mut clone, &opt);

        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        register_custom_fonts(&mut clone, &mut fontdb, &opt);

        // The drawing adapter performs its own percentage resolution,
        // so the element form is handed over without string finishing.
        let svg_string = clone.to_string(false);

        let mut usvg_opt = usvg::Options::default();
        usvg_opt.resources_dir = opt.resources_dir.clone();
        *usvg_opt.fontdb_mut() = fontdb;
        let tree = usvg::Tree::from_str(&svg_string, &usvg_opt)
            .map_err(|e| Error::Render(e.to_string()))?;

        let data = fill_pdf_doc(&tree, name.unwrap_or("chart"), &opt)?;
        download::trigger_download(&data, name, Format::PDF, &opt).map(Some)
    }

    /// Loads each custom font and rewrites the affected font families.
    ///
    /// Fallback lists cannot be parsed by the drawing adapter, so every
    /// element whose inline style mentions a registered font name gets a
    /// bare `font-family`. Collection formats (.ttc/.dfont) contribute
    /// all of their faces.
    fn register_custom_fonts(
        clone: &mut Document,
        fontdb: &mut usvg::fontdb::Database,
        opt: &Resolved,
    ) {
        for font in &opt.pdf.custom_fonts {
            let data = match std::fs::read(resolve_font_path(&font.url, opt)) {
                Ok(data) => data,
                Err(_) => {
                    log::warn!(
                        "Failed to load the custom font '{}'. Skipped.",
                        font.font_name
                    );
                    continue;
                }
            };

            rewrite_font_family(clone, font);
            fontdb.load_font_data(data);
        }
    }

    fn resolve_font_path(url: &Path, opt: &Resolved) -> PathBuf {
        match opt.resources_dir {
            Some(ref dir) if url.is_relative() => dir.join(url),
            _ => url.to_path_buf(),
        }
    }

    fn rewrite_font_family(doc: &mut Document, font: &CustomFont) {
        let ids = doc.descendants(doc.root());
        for id in ids {
            let has_font = match doc.attribute(id, "style") {
                Some(style) => style.contains(&font.font_name),
                None => false,
            };
            if !has_font {
                continue;
            }

            let mut has_family = false;
            let mut declarations: Vec<String> = simplecss::DeclarationTokenizer::from(
                doc.attribute(id, "style").unwrap_or_default(),
            )
            .map(|d| {
                if d.name == "font-family" {
                    has_family = true;
                    format!("{}: {}", d.name, font.font_name)
                } else {
                    format!("{}: {}", d.name, d.value)
                }
            })
            .collect();
            if !has_family {
                declarations.push(format!("font-family: {}", font.font_name));
            }
            doc.set_attribute(id, "style", &declarations.join("; "));
        }
    }

    fn fill_pdf_doc(tree: &usvg::Tree, title: &str, opt: &Resolved) -> Result<Vec<u8>, Error> {
        let page_width = opt.pdf.size[0] as f32;
        let page_height = opt.pdf.size[1] as f32;
        let text_width = opt.pdf.size[0] - opt.pdf.margin_left - opt.pdf.margin_right;

        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let page_tree_id = alloc.bump();
        let page_id = alloc.bump();
        let content_id = alloc.bump();
        let font_id = alloc.bump();

        let svg_name = Name(b"S1");
        let font_name = Name(b"F1");

        let (svg_chunk, svg_ref) =
            svg2pdf::to_chunk(tree, svg2pdf::ConversionOptions::default())
                .map_err(|e| Error::Render(e.to_string()))?;
        let mut ref_map = HashMap::new();
        let svg_chunk =
            svg_chunk.renumber(|old| *ref_map.entry(old).or_insert_with(|| alloc.bump()));
        let svg_ref = ref_map[&svg_ref];

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, page_width, page_height));
        page.parent(page_tree_id);
        page.contents(content_id);
        let mut resources = page.resources();
        resources.x_objects().pair(svg_name, svg_ref);
        resources.fonts().pair(font_name, font_id);
        resources.finish();
        page.finish();

        let mut content = Content::new();

        // Vertical cursor in top-down page coordinates.
        let mut cursor = opt.pdf.margin_top;
        if opt.pdf.add_title_to_page {
            cursor += draw_text_block(
                &mut content,
                title,
                opt.pdf.margin_left,
                cursor,
                opt.pdf.title_font_size,
                text_width,
                opt.pdf.size[1],
                font_name,
            );
        }

        // The SVG content, a little below the title.
        let svg_y = cursor + 10.0;
        content.save_state();
        content.transform([
            opt.width as f32,
            0.0,
            0.0,
            opt.height as f32,
            opt.pdf.margin_left as f32,
            (opt.pdf.size[1] - svg_y - opt.height) as f32,
        ]);
        content.x_object(svg_name);
        content.restore_state();

        if !opt.pdf.chart_caption.is_empty() {
            let caption_y =
                opt.pdf.size[1] - opt.pdf.margin_bottom - opt.pdf.caption_font_size * 4.0;
            draw_text_block(
                &mut content,
                &opt.pdf.chart_caption,
                opt.pdf.margin_left,
                caption_y,
                opt.pdf.caption_font_size,
                text_width,
                opt.pdf.size[1],
                font_name,
            );
        }

        pdf.stream(content_id, &content.finish());
        pdf.type1_font(font_id)
            .base_font(Name(base14_font(&opt.pdf.text_font_family)));
        pdf.extend(&svg_chunk);

        Ok(pdf.finish())
    }

    /// Draws a text block wrapped to `max_width`, returning its height.
    ///
    /// `y` is the block's top edge in top-down page coordinates.
    #[allow(clippy::too_many_arguments)]
    fn draw_text_block(
        content: &mut Content,
        text: &str,
        x: f64,
        y: f64,
        font_size: f64,
        max_width: f64,
        page_height: f64,
        font_name: Name,
    ) -> f64 {
        let lines = wrap_text(text, font_size, max_width);
        let leading = font_size * 1.25;

        content.begin_text();
        content.set_font(font_name, font_size as f32);
        content.next_line(x as f32, (page_height - y - font_size) as f32);
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                content.next_line(0.0, -(leading as f32));
            }
            content.show(Str(line.as_bytes()));
        }
        content.end_text();

        lines.len() as f64 * leading
    }

    /// Greedy word wrapping with an approximate glyph advance.
    ///
    /// The document engine does not measure text; an average advance of
    /// half the font size is close enough for title and caption blocks.
    fn wrap_text(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
        let advance = font_size * 0.5;
        let per_line = (max_width / advance).max(1.0) as usize;

        let mut lines = Vec::new();
        let mut line = String::new();
        for word in text.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > per_line {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    fn base14_font(family: &str) -> &'static [u8] {
        match family.to_ascii_lowercase().as_str() {
            "times" | "times-roman" | "times new roman" => b"Times-Roman",
            "courier" | "courier new" => b"Courier",
            _ => b"Helvetica",
        }
    }

}

#[cfg(not(feature = "pdf"))]
mod engine {
    use std::path::PathBuf;

    use crate::options::ExportOptions;
    use crate::tree::Document;
    use crate::Error;

    pub(super) fn export(
        _: &Document,
        _: Option<&str>,
        _: &ExportOptions,
    ) -> Result<Option<PathBuf>, Error> {
        unreachable!("rejected by the capability lookup")
    }
}
