//! gurmukhi-pdf CLI - Gurmukhi Word to PDF converter

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use gurmukhi_pdf::{
    model::is_gurmukhi, ConvertOptions, Converter, DocxParser, ErrorKind, FontFace, FontFamily,
    FontSet, PageGeometry, RenderOptions, Script, TrueTypeFace, UniformFace,
};

#[derive(Parser)]
#[command(name = "gurmukhi-pdf")]
#[command(version)]
#[command(about = "Convert Gurmukhi (Punjabi) Word documents to PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more .docx files to PDF
    Convert {
        /// Input .docx files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input) or directory (several inputs)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        fonts: FontArgs,

        /// Largest accepted input in bytes
        #[arg(long, value_name = "BYTES", env = "GURMUKHI_PDF_MAX_SIZE", default_value_t = 16 * 1024 * 1024)]
        max_size: u64,

        /// Page size; `document` uses the size declared in the file
        #[arg(long, value_enum, default_value = "document")]
        page_size: PageSize,

        /// Write uncompressed content streams
        #[arg(long)]
        uncompressed: bool,

        /// Language tag stored in the PDF catalog
        #[arg(long, value_name = "TAG", default_value = "pa-IN")]
        lang: String,
    },

    /// Print the parsed document model as JSON
    Inspect {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show runs after script splitting and font resolution
        #[arg(long)]
        normalized: bool,

        #[command(flatten)]
        fonts: FontArgs,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show document information
    Info {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct FontArgs {
    /// Gurmukhi regular face (.ttf/.otf)
    #[arg(long, value_name = "FILE", env = "GURMUKHI_FONT")]
    gurmukhi_font: Option<PathBuf>,

    /// Gurmukhi bold face
    #[arg(long, value_name = "FILE", env = "GURMUKHI_FONT_BOLD")]
    gurmukhi_bold: Option<PathBuf>,

    /// Gurmukhi italic face
    #[arg(long, value_name = "FILE", env = "GURMUKHI_FONT_ITALIC")]
    gurmukhi_italic: Option<PathBuf>,

    /// Latin regular face (.ttf/.otf)
    #[arg(long, value_name = "FILE", env = "LATIN_FONT")]
    latin_font: Option<PathBuf>,

    /// Latin bold face
    #[arg(long, value_name = "FILE", env = "LATIN_FONT_BOLD")]
    latin_bold: Option<PathBuf>,

    /// Latin italic face
    #[arg(long, value_name = "FILE", env = "LATIN_FONT_ITALIC")]
    latin_italic: Option<PathBuf>,

    /// Use built-in metrics-only fonts (no glyph outlines, for dry runs)
    #[arg(long)]
    metrics_only: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PageSize {
    /// ISO A4
    A4,
    /// US Letter
    Letter,
    /// Size declared by the document, A4 if none
    Document,
}

impl PageSize {
    fn geometry(self) -> Option<PageGeometry> {
        match self {
            PageSize::A4 => Some(PageGeometry::a4()),
            PageSize::Letter => Some(PageGeometry::letter()),
            PageSize::Document => None,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            inputs,
            output,
            fonts,
            max_size,
            page_size,
            uncompressed,
            lang,
        } => {
            let options = ConvertOptions::new()
                .with_max_input_size(max_size)
                .with_render_options(
                    RenderOptions::new()
                        .with_compression(!uncompressed)
                        .with_language(lang),
                );
            let options = match page_size.geometry() {
                Some(geometry) => options.with_geometry(geometry),
                None => options,
            };
            cmd_convert(&inputs, output.as_deref(), &fonts, options)
        }
        Commands::Inspect {
            input,
            normalized,
            fonts,
            compact,
            output,
        } => cmd_inspect(&input, normalized, &fonts, compact, output.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(exit_code(e.as_ref()));
    }
}

/// Distinct exit status per failure category.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<gurmukhi_pdf::Error>().map(|e| e.kind()) {
        Some(ErrorKind::Io) => 74,
        Some(ErrorKind::UnsupportedFormat) => 10,
        Some(ErrorKind::MalformedDocument) => 11,
        Some(ErrorKind::UnsupportedGlyph) => 12,
        Some(ErrorKind::PayloadTooLarge) => 13,
        Some(ErrorKind::Render) => 14,
        Some(ErrorKind::Font) => 15,
        None => 1,
    }
}

fn load_face(path: &Path) -> CliResult<Arc<dyn FontFace>> {
    let face = TrueTypeFace::from_file(path)?;
    log::info!("Loaded font \"{}\" from {}", face.family(), path.display());
    Ok(Arc::new(face))
}

fn load_family(
    regular: Option<&Path>,
    bold: Option<&Path>,
    italic: Option<&Path>,
    script: Script,
) -> CliResult<FontFamily> {
    let regular = regular.ok_or_else(|| {
        format!(
            "no {} font given; use --{}-font (or --metrics-only for a dry run)",
            script.tag(),
            script.tag()
        )
    })?;
    let mut family = FontFamily::new(load_face(regular)?);
    if let Some(path) = bold {
        family = family.with_bold(load_face(path)?);
    }
    if let Some(path) = italic {
        family = family.with_italic(load_face(path)?);
    }
    Ok(family)
}

fn load_fonts(args: &FontArgs) -> CliResult<FontSet> {
    if args.metrics_only {
        log::warn!("Using metrics-only fonts; the PDF will not contain glyph outlines");
        return Ok(FontSet::new(
            FontFamily::new(Arc::new(UniformFace::new("Gurmukhi"))),
            FontFamily::new(Arc::new(UniformFace::new("Latin"))),
        ));
    }

    let gurmukhi = load_family(
        args.gurmukhi_font.as_deref(),
        args.gurmukhi_bold.as_deref(),
        args.gurmukhi_italic.as_deref(),
        Script::Gurmukhi,
    )?;
    let latin = load_family(
        args.latin_font.as_deref(),
        args.latin_bold.as_deref(),
        args.latin_italic.as_deref(),
        Script::Latin,
    )?;
    Ok(FontSet::new(gurmukhi, latin))
}

fn check_extension(path: &Path) -> CliResult<()> {
    let is_docx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    if is_docx {
        Ok(())
    } else {
        Err(format!("{}: expected a .docx file", path.display()).into())
    }
}

/// PDF file name for an input, keeping letters (Gurmukhi included) and digits.
fn output_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || is_gurmukhi(c) || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{}.pdf", cleaned)
    }
}

fn output_path(input: &Path, output: Option<&Path>, batch: bool) -> PathBuf {
    match output {
        Some(dir) if batch => dir.join(output_file_name(input)),
        Some(file) => file.to_path_buf(),
        None => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(output_file_name(input)),
    }
}

fn cmd_convert(
    inputs: &[PathBuf],
    output: Option<&Path>,
    font_args: &FontArgs,
    options: ConvertOptions,
) -> CliResult<()> {
    for input in inputs {
        check_extension(input)?;
    }
    let batch = inputs.len() > 1;
    if batch {
        if let Some(dir) = output {
            fs::create_dir_all(dir)?;
        }
    }

    let fonts = load_fonts(font_args).map_err(|e| {
        eprintln!("{}", "Could not load fonts".yellow());
        e
    })?;
    let converter = Converter::with_options(Arc::new(fonts), options);

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let results: Vec<(PathBuf, CliResult<PathBuf>)> = inputs
        .par_iter()
        .map(|input| {
            pb.set_message(input.display().to_string());
            let result: CliResult<PathBuf> = converter
                .convert_file(input)
                .map_err(Into::into)
                .and_then(|pdf| {
                    let path = output_path(input, output, batch);
                    fs::write(&path, pdf)?;
                    Ok(path)
                });
            pb.inc(1);
            (input.clone(), result)
        })
        .collect();
    pb.finish_and_clear();

    let mut first_error = None;
    for (input, result) in results {
        match result {
            Ok(path) => println!(
                "{} {} {} {}",
                "Converted".green(),
                input.display(),
                "->".dimmed(),
                path.display()
            ),
            Err(e) => {
                eprintln!("{} {}: {}", "Failed".red(), input.display(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    log::info!("Converted {} files in {:?}", inputs.len(), start.elapsed());
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn cmd_inspect(
    input: &Path,
    normalized: bool,
    font_args: &FontArgs,
    compact: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    check_extension(input)?;

    let doc = if normalized {
        let converter = Converter::new(Arc::new(load_fonts(font_args)?));
        converter.prepare(&fs::read(input)?)?
    } else {
        gurmukhi_pdf::parse_file(input)?
    };

    let json = if compact {
        serde_json::to_string(&doc)?
    } else {
        serde_json::to_string_pretty(&doc)?
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> CliResult<()> {
    check_extension(input)?;
    let parser = DocxParser::open(input)?;
    let doc = parser.parse()?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), parser.flavor());
    println!("{}: {}", "Main part".bold(), parser.main_part());

    if let Some(ref title) = doc.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref creator) = doc.metadata.creator {
        println!("{}: {}", "Author".bold(), creator);
    }
    if let Some(ref created) = doc.metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = doc.metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }
    if let Some(setup) = doc.page_setup {
        println!(
            "{}: {:.0} x {:.0} pt{}",
            "Page".bold(),
            setup.width,
            setup.height,
            if setup.is_landscape() { " (landscape)" } else { "" }
        );
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let text = doc.plain_text();
    let gurmukhi = text.chars().filter(|c| is_gurmukhi(*c)).count();

    println!("{}: {}", "Paragraphs".bold(), doc.paragraph_count());
    println!("{}: {}", "Runs".bold(), doc.run_count());
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());
    println!("{}: {}", "Gurmukhi characters".bold(), gurmukhi);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "gurmukhi-pdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Gurmukhi Word to PDF converter");
    println!();
    println!("License: MIT");
}
