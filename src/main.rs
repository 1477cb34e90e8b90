use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flowpage::{
    Document, DocumentRenderer, FileImageSource, FontLibrary, LayoutConfig, Result, pdf,
};

#[derive(Parser, Debug)]
#[command(version, about = "Paginate a JSON content tree and write it as PDF")]
struct Args {
    /// Content tree in JSON
    input: PathBuf,

    /// Output PDF (defaults to the input path with a .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra directory to search for TrueType/OpenType fonts
    #[arg(long = "font-dir", value_name = "DIR")]
    font_dirs: Vec<PathBuf>,

    /// Only use fonts from FLOWPAGE_FONTS and --font-dir
    #[arg(long)]
    no_system_fonts: bool,

    /// Print the page table instead of writing a PDF
    #[arg(long)]
    pages: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(args: &Args) -> Result<()> {
    let document = Document::from_json_file(&args.input)?;
    let library = FontLibrary::new(&args.font_dirs, !args.no_system_fonts);
    log::info!("Font library has {} faces", library.family_count());
    let images = match args.input.parent() {
        Some(dir) => FileImageSource::with_base_dir(dir),
        None => FileImageSource::new(),
    };

    let mut renderer =
        DocumentRenderer::with_config(&document, &library, &images, LayoutConfig::default());
    renderer.prepare_document()?;

    if args.pages {
        for page in &renderer.formatted()?.pages {
            let f = &page.field_infos;
            println!(
                "{:>4} shown={:<4} section={:<3} {:.1}x{:.1}{}",
                f.physical_page,
                f.shown_page,
                f.section,
                page.info.width,
                page.info.height,
                if page.empty { " (empty)" } else { "" },
            );
        }
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("pdf"));
    let bytes = pdf::write_pdf(&renderer, &library)?;
    std::fs::write(&output, &bytes)?;
    println!("{} ({} pages)", output.display(), renderer.page_count()?);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
