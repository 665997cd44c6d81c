use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use seqform_engine::{export_analysis_request, FsOrderStore, FsTemplateSource};

#[derive(Parser)]
#[command(about = "Export a populated RNA-seq analysis-request workbook for an order.")]
struct Args {
    /// Order identifier (resolves to `<orders-dir>/<id>.json`).
    order_id: String,

    /// Directory containing order records.
    #[arg(long, default_value = "orders")]
    orders_dir: PathBuf,

    /// Directory containing workbook templates.
    #[arg(long, default_value = "templates")]
    templates_dir: PathBuf,

    /// Output path. Defaults to the document's suggested filename in the
    /// current directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let store = FsOrderStore::new(&args.orders_dir);
    let templates = FsTemplateSource::new(&args.templates_dir);

    let document = export_analysis_request(&store, &templates, &args.order_id)?;

    let out_path = args
        .out
        .unwrap_or_else(|| PathBuf::from(&document.filename));
    fs::write(&out_path, &document.bytes)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    println!("{} ({} bytes)", out_path.display(), document.bytes.len());
    Ok(())
}
