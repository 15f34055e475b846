//! herosheet CLI
//!
//! Classify media URLs and preview overlays headlessly.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herosheet_app::prelude::*;
use herosheet_layout::markup;
use tracing::info;

/// Trigger anchor injected into the simulated host page
const PREVIEW_TRIGGER_ID: &str = "hs-preview-trigger";

#[derive(Parser)]
#[command(name = "herosheet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Headless driver for the herosheet overlay", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which media provider a URL belongs to
    Classify {
        /// URL to classify
        url: String,
    },

    /// Fetch an item and print the opened overlay's node outline
    Preview {
        /// Configuration file
        #[arg(short, long, default_value = "herosheet.toml")]
        config: PathBuf,

        /// Numeric item id
        #[arg(long)]
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    herosheet_app::logging::init(cli.verbose);

    match cli.command {
        Commands::Classify { url } => cmd_classify(&url),
        Commands::Preview { config, id } => cmd_preview(&config, ItemId(id)).await,
    }
}

fn cmd_classify(url: &str) -> Result<()> {
    match classify(url) {
        Some(source) => println!("{}\t{}", source.provider.as_str(), source.embed_url),
        None => println!("not a media URL"),
    }
    Ok(())
}

async fn cmd_preview(config_path: &std::path::Path, id: ItemId) -> Result<()> {
    let config = SheetConfig::load(config_path)?;
    let page_url = format!("{}/", config.origin());
    let tree = preview_page(&config, id);

    let mut app = SheetApp::from_config(&config, tree, page_url, "herosheet preview")
        .context("Failed to set up overlay")?;

    let tree = app.controller().tree();
    let trigger = tree
        .element_by_id(tree.document_element(), PREVIEW_TRIGGER_ID)
        .context("Preview page has no trigger")?;

    info!("Fetching item {} from {}", id, config.origin());
    match app.activate(&ClickInfo::primary(trigger)).await {
        ActivationOutcome::Opened { .. } => {
            let controller = app.controller_mut();
            controller.tick(Duration::from_millis(16));
            let root = controller.chrome().root;
            print!("{}", controller.tree().outline(root));
        }
        ActivationOutcome::FellBack { url } => {
            println!(
                "fetch failed, host would navigate to {}",
                url.as_deref().unwrap_or("(no link)")
            );
        }
        outcome => anyhow::bail!("Preview trigger was not activated: {outcome:?}"),
    }
    Ok(())
}

/// Minimal host page holding one grid item for `id`
fn preview_page(config: &SheetConfig, id: ItemId) -> DocumentTree {
    let trigger = &config.trigger;
    let container = trigger
        .container_classes
        .first()
        .map(String::as_str)
        .unwrap_or_default();
    let page = format!(
        r#"<div class="{container}"><div id="{prefix}{id}" class="{item}"><a id="{PREVIEW_TRIGGER_ID}" href="{origin}/?p={id}">Item {id}</a></div></div>"#,
        prefix = trigger.id_prefix,
        item = trigger.item_class,
        origin = config.origin(),
    );

    let mut tree = DocumentTree::new();
    let body = tree.body();
    markup::parse_into(&mut tree, body, &page);
    tree
}
