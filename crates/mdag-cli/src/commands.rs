use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context as _};
use colored::Colorize;
use mdag_dag::{Builder, DagConfig, DagObject, Resolver, SourceNode};
use mdag_store::FsObjectStore;
use mdag_types::ObjectId;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)?;
    out.flush()?;
    Ok(())
}

fn run(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Add(args) => cmd_add(&cli.store, config, cli.format, args, out),
        Command::Cat(args) => cmd_cat(&cli.store, &config, args, out),
        Command::Inspect(args) => cmd_inspect(&cli.store, &config, cli.format, args, out),
        Command::Config(_) => cmd_config(&config, cli.format, out),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DagConfig> {
    match path {
        Some(path) => Ok(DagConfig::load(path)?),
        None => Ok(DagConfig::default()),
    }
}

fn open_store(root: &Path) -> anyhow::Result<FsObjectStore> {
    FsObjectStore::open(root).with_context(|| format!("opening store at {}", root.display()))
}

fn parse_id(hex: &str) -> anyhow::Result<ObjectId> {
    hex.parse()
        .with_context(|| format!("{hex:?} is not an object hash"))
}

fn cmd_add(
    store_root: &Path,
    mut config: DagConfig,
    format: OutputFormat,
    args: AddArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if let Some(hash) = args.hash {
        config.hash = hash;
    }
    let store = open_store(store_root)?;
    let node = SourceNode::from_path(&args.path, &config.source)?;
    let report = Builder::new(&store, config.hash.algorithm())
        .with_layout(config.layout)
        .build(&node)?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "root": report.root.to_hex(),
                "kind": report.tag.as_str(),
                "size": report.size,
                "hash": config.hash.to_string(),
                "objects_written": report.objects_written,
                "objects_deduplicated": report.objects_deduplicated,
            });
            writeln!(out, "{value}")?;
        }
        OutputFormat::Text => {
            writeln!(out, "{} Added {}", "✓".green().bold(), args.path.display().to_string().bold())?;
            writeln!(out, "  Root: {}", report.root.to_hex().yellow())?;
            writeln!(out, "  Kind: {}  Size: {} bytes  Hash: {}", report.tag.as_str().cyan(), report.size, config.hash)?;
            writeln!(
                out,
                "  Objects: {} written, {} already stored",
                report.objects_written.to_string().green(),
                report.objects_deduplicated.to_string().dimmed()
            )?;
        }
    }
    Ok(())
}

fn cmd_cat(
    store_root: &Path,
    config: &DagConfig,
    args: CatArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let root = parse_id(&args.root)?;
    let store = open_store(store_root)?;
    // CLI paths are relative to the root. The resolver skips the first
    // segment as the root's own name, so give it an empty one.
    let path = if args.path.starts_with('/') {
        args.path.clone()
    } else {
        format!("/{}", args.path)
    };
    let resolved = Resolver::new(&store, config.hash.algorithm())
        .with_verify(config.verify)
        .resolve_to(&root, &path, out)?;
    if resolved.is_none() {
        bail!("{} not found under {}", args.path, root.short_hex());
    }
    Ok(())
}

fn cmd_inspect(
    store_root: &Path,
    config: &DagConfig,
    format: OutputFormat,
    args: InspectArgs,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let id = parse_id(&args.hash)?;
    let store = open_store(store_root)?;
    let object = Resolver::new(&store, config.hash.algorithm())
        .with_verify(config.verify)
        .load(&id, args.kind.into())?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = object
                .entries()
                .iter()
                .map(|e| {
                    json!({
                        "kind": e.tag.as_str(),
                        "hash": e.link.hash.to_hex(),
                        "size": e.link.size,
                        "name": e.link.name,
                    })
                })
                .collect();
            let value = json!({
                "id": id.to_hex(),
                "kind": object.tag().as_str(),
                "size": object.logical_size(),
                "entries": entries,
            });
            writeln!(out, "{value}")?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} ({} bytes)",
                object.tag().as_str().cyan().bold(),
                id.to_hex().yellow(),
                object.logical_size()
            )?;
            if let DagObject::Blob(_) = object {
                return Ok(());
            }
            for entry in object.entries() {
                writeln!(
                    out,
                    "  {}  {}  {:>10}  {}",
                    entry.tag.as_str().cyan(),
                    entry.link.hash.short_hex().yellow(),
                    entry.link.size,
                    entry.link.name.as_deref().unwrap_or("")
                )?;
            }
        }
    }
    Ok(())
}

fn cmd_config(config: &DagConfig, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(config)?)?,
        OutputFormat::Text => write!(out, "{}", config.to_toml()?)?,
    }
    Ok(())
}
