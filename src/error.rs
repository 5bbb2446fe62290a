// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// An export file format.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(missing_docs)]
pub enum Format {
    SVG,
    PNG,
    JPEG,
    PDF,
}

impl Format {
    /// Returns the file extension used by the download trigger.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::SVG => "svg",
            Format::PNG => "png",
            Format::JPEG => "jpeg",
            Format::PDF => "pdf",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Format::SVG => write!(f, "SVG"),
            Format::PNG => write!(f, "PNG"),
            Format::JPEG => write!(f, "JPEG"),
            Format::PDF => write!(f, "PDF"),
        }
    }
}

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// An optional engine required by the requested format is not compiled in.
    MissingDependency {
        /// The package that provides the engine.
        package: &'static str,
        /// The format that was requested.
        format: Format,
    },

    /// The external encoder failed to process the normalized SVG.
    Render(String),

    /// A file could not be read or written.
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::MissingDependency { package, format } => {
                write!(
                    f,
                    "{} export requires the '{}' package, \
                     which is not enabled in this build",
                    format, package
                )
            }
            Error::Render(ref msg) => {
                write!(f, "rendering failed cause {}", msg)
            }
            Error::Io(ref e) => {
                write!(f, "IO error cause {}", e)
            }
        }
    }
}

impl std::error::Error for Error {}
