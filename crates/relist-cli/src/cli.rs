use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use relist_merge::MergeMode;
use relist_types::ListOrder;

#[derive(Parser)]
#[command(
    name = "relist",
    about = "Inspect list merges, edit scripts, and filler interleaving",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file supplying defaults for order, stride, and filler kinds
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OrderArg {
    NewestFirst,
    OldestFirst,
    Insertion,
}

impl From<OrderArg> for ListOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::NewestFirst => ListOrder::NewestFirst,
            OrderArg::OldestFirst => ListOrder::OldestFirst,
            OrderArg::Insertion => ListOrder::Insertion,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Authoritative,
    Partial,
    RemoveFetched,
    Reappend,
}

impl From<ModeArg> for MergeMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Authoritative => MergeMode::Authoritative,
            ModeArg::Partial => MergeMode::Partial,
            ModeArg::RemoveFetched => MergeMode::RemoveFetched,
            ModeArg::Reappend => MergeMode::Reappend,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge a fresh snapshot into a held list
    Merge(MergeArgs),
    /// Show the edit script between two snapshots
    Diff(DiffArgs),
    /// Interleave fillers into a list
    Interleave(InterleaveArgs),
    /// Run a full merge, interleave, and diff cycle
    Reconcile(ReconcileArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct MergeArgs {
    /// JSON array of held records
    pub stale: PathBuf,
    /// JSON array of freshly fetched records
    pub fresh: PathBuf,
    #[arg(long, value_enum, default_value = "authoritative")]
    pub mode: ModeArg,
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub before: PathBuf,
    pub after: PathBuf,
}

#[derive(Args)]
pub struct InterleaveArgs {
    /// JSON array of records
    pub list: PathBuf,
    /// JSON array of fillers
    pub fillers: PathBuf,
    #[arg(long)]
    pub stride: Option<usize>,
}

#[derive(Args)]
pub struct ReconcileArgs {
    pub held: PathBuf,
    pub fresh: PathBuf,
    #[arg(long)]
    pub fillers: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "authoritative")]
    pub mode: ModeArg,
}
