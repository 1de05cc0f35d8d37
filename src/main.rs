use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use manuscript::capture::DirectorySink;
use manuscript::view::MemoryView;
use manuscript::{NotebookConfig, RulingStyle};
use tracing_subscriber::EnvFilter;

/// Render text as a handwritten notebook page and save it as a PNG.
#[derive(Parser, Debug)]
#[command(name = "manuscript", version, about)]
struct Args {
    /// Base URL of the handwriting transform service
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    endpoint: String,

    /// Read the text from this file
    #[arg(long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Text to render
    #[arg(long)]
    text: Option<String>,

    /// Image quality (scale factor)
    #[arg(long, default_value_t = 2)]
    quality: u32,

    /// Left-edge decoration: "margin" or "holes"
    #[arg(long, default_value = "margin")]
    ruling: String,

    /// Directory the PNG is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Skip the one second typing debounce
    #[arg(long)]
    no_debounce: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let text = match (&args.input, &args.text) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, Some(t)) => t.clone(),
        (None, None) => bail!("pass --text or --input"),
    };

    let mut config = NotebookConfig::default();
    config.transform.endpoint = args.endpoint.clone();
    config.export.ruling_style = args.ruling.parse::<RulingStyle>()?;
    if args.no_debounce {
        config.controller.debounce_ms = 0;
    }

    let view = MemoryView::new();
    view.set_quality(Some(args.quality));
    let sink = Arc::new(DirectorySink::new(&args.out_dir));
    let controller = manuscript::new_controller(config, view.view(), sink)?;

    // typing the text schedules the auto-transform
    controller.input(&text).await?;
    if controller.document().is_placeholder {
        let status = view.state().status.map(|s| s.message).unwrap_or_default();
        bail!("transform failed: {}", status);
    }

    let outcome = controller.export().await?;
    println!(
        "{} ({}x{}, {} bytes)",
        args.out_dir.join(&outcome.filename).display(),
        outcome.width,
        outcome.height,
        outcome.bytes
    );
    Ok(())
}
