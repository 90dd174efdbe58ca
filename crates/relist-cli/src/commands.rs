use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use relist_diff::{try_diff, EditOp, ListDiff};
use relist_filler::{FillerConfig, FillerRotation};
use relist_merge::{merge, MergeMode};
use relist_reconcile::{FetchError, ReconcileOutcome, Reconciler, RelistConfig};
use relist_types::{Filler, Identifiable, ListItem, Record};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let output = match cli.command {
        Command::Merge(args) => cmd_merge(&args, &config, cli.format)?,
        Command::Diff(args) => cmd_diff(&args, cli.format)?,
        Command::Interleave(args) => cmd_interleave(&args, &config, cli.format)?,
        Command::Reconcile(args) => cmd_reconcile(&args, &config, cli.format)?,
        Command::Config => cmd_config(&config, cli.format)?,
    };
    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RelistConfig> {
    match path {
        Some(path) => RelistConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RelistConfig::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn entities(records: Vec<Record>) -> Vec<ListItem<Record>> {
    records.into_iter().map(ListItem::Entity).collect()
}

fn cmd_merge(
    args: &MergeArgs,
    config: &RelistConfig,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let mut held: Vec<Record> = read_json(&args.stale)?;
    let fresh: Vec<Record> = read_json(&args.fresh)?;
    let order = args.order.map_or(config.reconcile.order, Into::into);
    let report = merge(&mut held, fresh, args.mode.into(), order);
    debug!(?report, "merge finished");

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "inserted": report.inserted,
            "updated": report.updated,
            "removed": report.removed,
            "items": held,
        }))?,
        OutputFormat::Text => {
            let mut out = format!(
                "{} {} inserted, {} updated, {} removed",
                "✓".green().bold(),
                report.inserted.to_string().green(),
                report.updated.to_string().yellow(),
                report.removed.to_string().red(),
            );
            for (i, record) in held.iter().enumerate() {
                out.push('\n');
                out.push_str(&render_record(i, record));
            }
            out
        }
    })
}

fn cmd_diff(args: &DiffArgs, format: OutputFormat) -> anyhow::Result<String> {
    let before: Vec<Record> = read_json(&args.before)?;
    let after: Vec<Record> = read_json(&args.after)?;
    let diff = try_diff(&before, &after)?;

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&diff)?,
        OutputFormat::Text => render_diff(&diff, &after),
    })
}

fn cmd_interleave(
    args: &InterleaveArgs,
    config: &RelistConfig,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let mut list = entities(read_json(&args.list)?);
    let fillers: Vec<Filler> = read_json(&args.fillers)?;
    let filler_config = FillerConfig {
        stride: args.stride.unwrap_or(config.filler.stride),
        ..config.filler.clone()
    };
    let rotation = FillerRotation::with_fillers(filler_config, fillers);
    let report = rotation.interleave(&mut list);

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "positions": report.positions,
            "items": list,
        }))?,
        OutputFormat::Text => {
            let mut out = format!(
                "{} {} fillers interleaved",
                "✓".green().bold(),
                report.consumed().to_string().bold()
            );
            for (i, item) in list.iter().enumerate() {
                out.push('\n');
                out.push_str(&render_item(i, item));
            }
            out
        }
    })
}

fn cmd_reconcile(
    args: &ReconcileArgs,
    config: &RelistConfig,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let held: Vec<Record> = read_json(&args.held)?;
    let fresh: Vec<Record> = read_json(&args.fresh)?;
    let rotation = match &args.fillers {
        Some(path) => {
            let fillers: Vec<Filler> = read_json(path)?;
            Some(FillerRotation::with_fillers(config.filler.clone(), fillers))
        }
        None => None,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(async {
        let mut reconciler = Reconciler::new("cli".to_string(), config.reconcile.clone());
        if let Some(rotation) = rotation {
            reconciler = reconciler.with_fillers(rotation.into());
        }
        reconciler
            .reconcile(async { Ok::<_, FetchError>(held) }, MergeMode::Authoritative)
            .await?;
        reconciler
            .reconcile(async { Ok::<_, FetchError>(fresh) }, args.mode.into())
            .await
    })?;

    let ReconcileOutcome::Published(publication) = outcome else {
        anyhow::bail!("reconciliation was discarded");
    };
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "generation": publication.generation,
            "diff": publication.diff.as_ref(),
            "items": &publication.items[..],
        }))?,
        OutputFormat::Text => {
            let mut out = render_diff(&publication.diff, &publication.items);
            for (i, item) in publication.items.iter().enumerate() {
                out.push('\n');
                out.push_str(&render_item(i, item));
            }
            out
        }
    })
}

fn cmd_config(config: &RelistConfig, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
        OutputFormat::Text => config.to_toml_string()?,
    })
}

fn render_diff<T: Identifiable>(diff: &ListDiff, after: &[T]) -> String {
    if diff.is_empty() {
        return "No changes.".to_string();
    }
    let mut lines = vec![format!(
        "{} ops: {} insert, {} remove, {} move, {} change",
        diff.len().to_string().bold(),
        diff.insertions(),
        diff.removals(),
        diff.moves(),
        diff.changes(),
    )];
    for op in &diff.ops {
        lines.push(match *op {
            EditOp::Remove { at } => format!("  {} at {at}", "remove".red()),
            EditOp::Insert { at, new_index } => {
                format!("  {} {} at {at}", "insert".green(), after[new_index].id())
            }
            EditOp::Move { from, to } => format!("  {} {from} → {to}", "move".yellow()),
            EditOp::Change { at, new_index } => {
                format!("  {} {} at {at}", "change".cyan(), after[new_index].id())
            }
        });
    }
    lines.join("\n")
}

fn render_record(index: usize, record: &Record) -> String {
    let created = record
        .created_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".into());
    format!("{index:>4}  {}  {}", record.id.to_string().bold(), created.dimmed())
}

fn render_item(index: usize, item: &ListItem<Record>) -> String {
    match item {
        ListItem::Entity(record) => render_record(index, record),
        ListItem::Filler(filler) => format!(
            "{index:>4}  {} {}  {}",
            "[filler]".magenta(),
            filler.kind,
            filler.headline
        ),
        ListItem::Header(header) => format!("{index:>4}  {} {}", "[header]".blue(), header.title),
    }
}
