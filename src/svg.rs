// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use crate::options::ExportOptions;
use crate::{download, image, normalize, options, Error, Format, Graphic};

/// Exports the graphic as an SVG file.
///
/// `name` defaults to `"chart"` and becomes the file name after
/// sanitization. Returns the written path, or `None` when the input
/// was not recognized.
pub fn export_svg<'a, G: Into<Graphic<'a>>>(
    graphic: G,
    name: Option<&str>,
    options: &ExportOptions,
) -> Result<Option<PathBuf>, Error> {
    let original = match normalize::get_svg_document(&graphic.into()) {
        Some(doc) => doc,
        None => return Ok(None),
    };

    let opt = options::resolve(&original, options, false);
    let mut clone = original.clone();

    image::inline_images(&mut clone, &opt);
    let svg_string = normalize::setup_svg_string(&mut clone, &original, &opt);

    let data = format!("<?xml version=\"1.0\" standalone=\"no\"?>\r\n{}", svg_string);
    download::trigger_download(data.as_bytes(), name, Format::SVG, &opt).map(Some)
}
