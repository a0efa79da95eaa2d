use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docloom::catalog::{Family, FileFilter};
use docloom::compose::RenderLayout;
use docloom::markup::{CatalogHooks, OutlineParser};
use docloom::output::{HtmlShellLayout, PageWriter};
use docloom::{
    Console, PageComposer, Playbook, UiCatalog, aggregate_content, build_navigation,
    classify_content,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the documentation site described by a playbook
    Build(BuildArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Path to the playbook file
    #[arg(default_value = "playbook.toml")]
    playbook: PathBuf,

    /// Fetch updates for cached content repositories
    #[arg(long)]
    pull: bool,

    /// Suppress progress bars and info output
    #[arg(long)]
    quiet: bool,

    /// Suppress all output except errors
    #[arg(long)]
    silent: bool,

    /// Override the content cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the site output directory
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => build(args).await,
    }
}

async fn build(args: BuildArgs) -> ExitCode {
    let mut playbook = match Playbook::load(&args.playbook) {
        Ok(playbook) => playbook,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    playbook.runtime.pull |= args.pull;
    playbook.runtime.quiet |= args.quiet;
    playbook.runtime.silent |= args.silent;
    if let Some(cache_dir) = args.cache_dir {
        playbook.runtime.cache_dir = Some(cache_dir);
    }
    if let Some(output) = args.output {
        playbook.ui.output_dir = Some(output);
    }

    let default_level = if playbook.runtime.silent {
        "error"
    } else if playbook.runtime.quiet {
        "warn"
    } else {
        "info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("{}={}", env!("CARGO_PKG_NAME"), default_level).into()
        }))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();

    let console = Console::new(playbook.runtime.quiet || playbook.runtime.silent);
    console.header("Building documentation site");

    match run_pipeline(&playbook, &console).await {
        Ok(pages) => {
            console.success(&format!("Published {pages} pages"));
            ExitCode::SUCCESS
        }
        Err(err) => {
            console.clear_progress();
            console.error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run_pipeline(
    playbook: &Playbook,
    console: &Console,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let bundles = aggregate_content(playbook, console).await?;
    let catalog = classify_content(playbook, bundles)?;

    // The parser adapter resolves includes and xrefs through the
    // catalog-backed capability hooks
    let hooks = Arc::new(CatalogHooks);
    let provider = OutlineParser::with_hooks(
        playbook.asciidoc.attributes.clone(),
        hooks.clone(),
        hooks,
    );
    let nav_catalog = build_navigation(&catalog, &provider)?;

    // The reference shell layout is always available; a real UI bundle
    // would be scanned for its layout files here
    let ui = UiCatalog {
        output_dir: playbook
            .ui
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("_site")),
        default_layout: playbook.ui.default_layout.clone(),
        layouts: vec!["default".to_string(), "404".to_string()],
    };
    let composer = PageComposer::new(playbook, &catalog, &ui, &nav_catalog, &provider);
    let renderer = HtmlShellLayout;
    let writer = PageWriter::new(playbook.dir.join(&ui.output_dir))?;

    let mut published = 0usize;
    let pages = catalog.find_by(&FileFilter {
        family: Some(Family::Page),
        ..Default::default()
    });
    for page in pages {
        let Some(out) = page.out.as_ref() else {
            continue;
        };
        let model = composer.compose(page, &catalog)?;
        let bytes = renderer.render(&model.layout, &serde_json::to_value(&model)?)?;
        writer.write_page(&out.path, &bytes)?;
        published += 1;
    }

    // Images and attachments publish verbatim
    for family in [Family::Image, Family::Attachment] {
        let assets = catalog.find_by(&FileFilter {
            family: Some(family),
            ..Default::default()
        });
        for asset in assets {
            if let Some(out) = asset.out.as_ref() {
                writer.write_page(&out.path, &asset.contents)?;
            }
        }
    }

    console.summary(
        "Build Summary",
        &[
            ("Components", catalog.components().count().to_string()),
            ("Pages", published.to_string()),
            ("Output", writer.base_path().display().to_string()),
        ],
    );
    Ok(published)
}
