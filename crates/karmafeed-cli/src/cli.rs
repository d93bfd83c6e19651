use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use karmafeed_types::{CommentId, PostId, UserId};

#[derive(Parser)]
#[command(
    name = "karmafeed",
    about = "Inspect karmafeed snapshots: leaderboard, karma, threads",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Feed settings (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rank users by karma earned in the trailing window
    Leaderboard(LeaderboardArgs),
    /// Show a user's all-time and in-window karma
    Karma(KarmaArgs),
    /// List posts, newest first
    Posts(SnapshotArgs),
    /// Print the comment thread of a post, or the subtree of one comment
    Thread(ThreadArgs),
    /// Re-check every constraint and audit the karma ledger
    Verify(SnapshotArgs),
    /// Print the effective feed settings
    Config,
}

#[derive(Args)]
pub struct SnapshotArgs {
    /// Snapshot file (JSON) to load
    #[arg(short, long)]
    pub snapshot: PathBuf,
}

#[derive(Args)]
pub struct LeaderboardArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,
    /// Window length in seconds
    #[arg(long)]
    pub window_secs: Option<u64>,
    /// Number of users to show
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct KarmaArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,
    /// User id, bare or prefixed (`u:3`)
    #[arg(short, long)]
    pub user: UserId,
}

#[derive(Args)]
pub struct ThreadArgs {
    #[command(flatten)]
    pub source: SnapshotArgs,
    /// Post id, bare or prefixed (`p:3`)
    #[arg(short, long, required_unless_present = "comment", conflicts_with = "comment")]
    pub post: Option<PostId>,
    /// Comment id to root the tree at
    #[arg(short, long)]
    pub comment: Option<CommentId>,
}
