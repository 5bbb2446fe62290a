// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use svg_export::{CustomFont, ExportOptions, Format, PageLayout, PdfOptions};

fn main() {
    if let Err(e) = process() {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn process() -> Result<(), String> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            println!("{}", HELP);
            return Err(e);
        }
    };

    if !args.quiet {
        if let Ok(()) = log::set_logger(&LOGGER) {
            log::set_max_level(log::LevelFilter::Warn);
        }
    }

    let svg_data = if args.input == "-" {
        use std::io::Read;
        let mut buf = String::new();
        let stdin = std::io::stdin();
        let mut handle = stdin.lock();
        handle
            .read_to_string(&mut buf)
            .map_err(|_| "failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.input).map_err(|_| "failed to open the provided file")?
    };

    let result = match args.format {
        Format::SVG => svg_export::export_svg(&svg_data, Some(&args.name), &args.options),
        Format::PNG => svg_export::export_png(&svg_data, Some(&args.name), &args.options),
        Format::JPEG => svg_export::export_jpeg(&svg_data, Some(&args.name), &args.options),
        Format::PDF => svg_export::export_pdf(&svg_data, Some(&args.name), &args.options),
    };

    match result {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err("the input svg was not recognized".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

const HELP: &str = "\
svg-export exports an SVG document to SVG, PNG, JPEG or PDF files.

USAGE:
  svg-export [OPTIONS] <in-svg> <out-file>  # from file to file
  svg-export [OPTIONS] - <out-file>         # from stdin to file

  svg-export in.svg out.png
  svg-export --scale 2 in.svg out.jpeg
  svg-export --caption 'Monthly revenue' in.svg out.pdf

OPTIONS:
      --help                    Prints this help
  -V, --version                 Prints version

  -w, --width LENGTH            Sets the width in pixels
  -h, --height LENGTH           Sets the height in pixels
  -s, --scale FACTOR            Scales the image by a factor
      --no-css                  Skips inlining of the document's stylesheet
      --exclude SELECTOR        Excludes elements matching a CSS selector
      --background COLOR        Replaces a transparent background (JPEG)
                                [default: white]
      --allow-external-images   Allows image references outside of the
                                resources directory
      --resources-dir DIR       Sets a directory that will be used during
                                relative paths resolving.
                                Expected to be the same as the directory that
                                contains the SVG file, but can be set to any.
                                [default: input file directory]

      --caption TEXT            Adds a caption near the bottom of the PDF page
      --no-page-title           Skips the title at the top of the PDF page
      --margin N                Sets the PDF page margin
                                [default: 50]
      --pdf-font FAMILY         Sets the base-14 family for PDF title and
                                caption text
                                [default: Helvetica]
      --title-font-size N       Sets the PDF title font size
                                [default: 20]
      --caption-font-size N     Sets the PDF caption font size
                                [default: 14]
      --use-font-file PATH      Registers a custom font for PDF export.
                                The family name is the file stem.
                                This option can be set multiple times

      --quiet                   Disables warnings

ARGS:
  <in-svg>                      Input file
  <out-file>                    Output file; the extension selects the format
                                (.svg, .png, .jpg, .jpeg, .pdf)
";

struct Args {
    input: String,
    name: String,
    format: Format,
    options: ExportOptions,
    quiet: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut input = pico_args::Arguments::from_env();

    if input.contains("--help") {
        print!("{}", HELP);
        std::process::exit(0);
    }

    if input.contains(["-V", "--version"]) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let quiet = input.contains("--quiet");

    let mut options = ExportOptions {
        width: input
            .opt_value_from_fn(["-w", "--width"], parse_length)
            .map_err(|e| e.to_string())?,
        height: input
            .opt_value_from_fn(["-h", "--height"], parse_length)
            .map_err(|e| e.to_string())?,
        scale: input
            .opt_value_from_fn(["-s", "--scale"], parse_factor)
            .map_err(|e| e.to_string())?,
        exclude_by_css_selector: input
            .opt_value_from_str("--exclude")
            .map_err(|e| e.to_string())?,
        transparent_background_replace: input
            .opt_value_from_str("--background")
            .map_err(|e| e.to_string())?,
        resources_dir: input
            .opt_value_from_str("--resources-dir")
            .map_err(|e| e.to_string())?,
        ..ExportOptions::default()
    };
    if input.contains("--no-css") {
        options.use_css = Some(false);
    }
    if input.contains("--allow-external-images") {
        options.allow_cross_origin_images = Some(true);
    }

    let mut pdf = PdfOptions {
        chart_caption: input
            .opt_value_from_str("--caption")
            .map_err(|e| e.to_string())?,
        pdf_text_font_family: input
            .opt_value_from_str("--pdf-font")
            .map_err(|e| e.to_string())?,
        pdf_title_font_size: input
            .opt_value_from_fn("--title-font-size", parse_factor)
            .map_err(|e| e.to_string())?,
        pdf_caption_font_size: input
            .opt_value_from_fn("--caption-font-size", parse_factor)
            .map_err(|e| e.to_string())?,
        page_layout: PageLayout {
            margin: input
                .opt_value_from_fn("--margin", parse_factor)
                .map_err(|e| e.to_string())?,
            ..PageLayout::default()
        },
        ..PdfOptions::default()
    };
    if input.contains("--no-page-title") {
        pdf.add_title_to_page = Some(false);
    }

    let font_files: Vec<PathBuf> = input
        .values_from_str("--use-font-file")
        .map_err(|e| e.to_string())?;
    for path in font_files {
        let font_name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        pdf.custom_fonts.push(CustomFont {
            font_name,
            url: path,
            style_name: None,
        });
    }
    options.pdf = Some(pdf);

    let in_svg: String = input.free_from_str().map_err(|e| e.to_string())?;
    let out_file: PathBuf = input.free_from_str().map_err(|_| "<out-file> must be set")?;

    let format = match out_file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("svg") => Format::SVG,
        Some("png") => Format::PNG,
        Some("jpg") | Some("jpeg") => Format::JPEG,
        Some("pdf") => Format::PDF,
        _ => return Err("<out-file> must end with .svg, .png, .jpg, .jpeg or .pdf".to_string()),
    };

    let name = match out_file.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem.to_string(),
        None => "chart".to_string(),
    };
    options.output_dir = out_file.parent().map(Path::to_path_buf).filter(|p| !p.as_os_str().is_empty());

    if options.resources_dir.is_none() && in_svg != "-" {
        // Same directory as the input file.
        options.resources_dir = std::fs::canonicalize(&in_svg)
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
    }

    Ok(Args {
        input: in_svg,
        name,
        format,
        options,
        quiet,
    })
}

fn parse_length(s: &str) -> Result<f64, String> {
    let n: f64 = s.parse().map_err(|_| "invalid length")?;

    if n > 0.0 {
        Ok(n)
    } else {
        Err("LENGTH must be positive".to_string())
    }
}

fn parse_factor(s: &str) -> Result<f64, String> {
    let n: f64 = s.parse().map_err(|_| "invalid number")?;

    if n.is_finite() && n >= 0.0 {
        Ok(n)
    } else {
        Err("the value must be positive".to_string())
    }
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };

            let line = record.line().unwrap_or(0);

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}:{}): {}", target, line, record.args()),
                log::Level::Warn => eprintln!("Warning (in {}:{}): {}", target, line, record.args()),
                log::Level::Info => eprintln!("Info (in {}:{}): {}", target, line, record.args()),
                log::Level::Debug => eprintln!("Debug (in {}:{}): {}", target, line, record.args()),
                log::Level::Trace => eprintln!("Trace (in {}:{}): {}", target, line, record.args()),
            }
        }
    }

    fn flush(&self) {}
}
