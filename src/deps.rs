// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Capability lookup for the optional encoder engines.
//!
//! Every exporter asks for its engine before doing any other work, so a
//! missing engine aborts the call without side effects.

use crate::{Error, Format};

#[cfg(feature = "raster")]
pub(crate) fn require_raster(_format: Format) -> Result<(), Error> {
    Ok(())
}

#[cfg(not(feature = "raster"))]
pub(crate) fn require_raster(format: Format) -> Result<(), Error> {
    let err = Error::MissingDependency {
        package: "resvg",
        format,
    };
    log::warn!("{}.", err);
    Err(err)
}

#[cfg(feature = "pdf")]
pub(crate) fn require_pdf(_format: Format) -> Result<(), Error> {
    Ok(())
}

#[cfg(not(feature = "pdf"))]
pub(crate) fn require_pdf(format: Format) -> Result<(), Error> {
    let err = Error::MissingDependency {
        package: "pdf-writer/svg2pdf",
        format,
    };
    log::warn!("{}.", err);
    Err(err)
}
