// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The download trigger: turns a finished artifact into a file on disk.

use std::path::PathBuf;

use crate::options::Resolved;
use crate::{Error, Format};

/// Writes the artifact as `<name>.<ext>` into the output directory.
pub(crate) fn trigger_download(
    data: &[u8],
    name: Option<&str>,
    format: Format,
    opt: &Resolved,
) -> Result<PathBuf, Error> {
    let name = sanitize_file_name(name.unwrap_or("chart"));
    let file_name = format!("{}.{}", name, format.extension());
    let path = match opt.output_dir {
        Some(ref dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    };

    std::fs::write(&path, data)?;
    Ok(path)
}

/// Replaces the characters that are not portable in file names.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    name.replace(
        |c| matches!(c, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>'),
        "_",
    )
}
