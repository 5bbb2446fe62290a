// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svg-export` exports an SVG document to SVG, PNG, JPEG or PDF files.

The pipeline normalizes the input first: it clones the document, resolves
its effective size and viewBox against the conflicting sources of truth
(attributes, inline style, percentage units), inlines the stylesheet
cascade so the artifact renders outside the source context, embeds
external raster images as data URIs, and only then hands the result to a
format-specific encoder.

The encoders for PNG/JPEG (`resvg` + `tiny-skia`) and PDF
(`pdf-writer` + `svg2pdf`) are optional; see the `raster` and `pdf`
features. An export without its engine is rejected up front with
[`Error::MissingDependency`].

```no_run
use svg_export::{export_png, ExportOptions};

let svg = "<svg viewBox='0 0 200 100'><rect width='200' height='100'/></svg>";
export_png(svg, Some("my chart"), &ExportOptions::default()).unwrap();
```

Each export call is independent: options are resolved into an immutable
per-call configuration and no state is shared between calls, so calls may
overlap freely.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod deps;
mod download;
mod error;
mod image;
mod normalize;
mod options;
mod pdf;
mod raster;
mod style;
mod svg;
pub mod tree;

pub use crate::error::{Error, Format};
pub use crate::options::{
    CustomFont, ExportOptions, MarginOverrides, PageLayout, PdfOptions,
};
pub use crate::pdf::export_pdf;
pub use crate::raster::{export_jpeg, export_png};
pub use crate::svg::export_svg;

/// An exportable graphic: SVG markup or an already parsed element tree.
#[derive(Clone, Copy, Debug)]
pub enum Graphic<'a> {
    /// Serialized SVG markup.
    Markup(&'a str),
    /// A parsed element tree. The export works on a clone; the original
    /// is never modified.
    Element(&'a tree::Document),
}

impl<'a> From<&'a str> for Graphic<'a> {
    fn from(text: &'a str) -> Self {
        Graphic::Markup(text)
    }
}

impl<'a> From<&'a String> for Graphic<'a> {
    fn from(text: &'a String) -> Self {
        Graphic::Markup(text)
    }
}

impl<'a> From<&'a tree::Document> for Graphic<'a> {
    fn from(doc: &'a tree::Document) -> Self {
        Graphic::Element(doc)
    }
}
