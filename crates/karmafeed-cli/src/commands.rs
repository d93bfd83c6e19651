use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use karmafeed_engine::{CommentTree, Feed, FeedConfig};
use karmafeed_ledger::ViolationKind;
use karmafeed_store::{FeedSnapshot, InMemoryFeedStore};
use karmafeed_types::SystemClock;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    };
    let format = cli.format;

    match cli.command {
        Command::Leaderboard(args) => cmd_leaderboard(args, config, format),
        Command::Karma(args) => cmd_karma(args, config, format),
        Command::Posts(args) => cmd_posts(args, config, format),
        Command::Thread(args) => cmd_thread(args, config, format),
        Command::Verify(args) => cmd_verify(args, config, format),
        Command::Config => cmd_config(&config, format),
    }
}

fn open(path: &Path, config: FeedConfig) -> anyhow::Result<Feed> {
    let snapshot = FeedSnapshot::read_from(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let store = InMemoryFeedStore::from_snapshot(snapshot, Arc::new(SystemClock))
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    tracing::debug!(path = %path.display(), "snapshot opened");
    Ok(Feed::new(Arc::new(store), config)?)
}

fn cmd_leaderboard(args: LeaderboardArgs, config: FeedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let window = args.window_secs.unwrap_or(config.leaderboard_window_secs);
    let limit = args.limit.unwrap_or(config.leaderboard_limit);
    let feed = open(&args.source.snapshot, config)?;
    let rows = feed.top_users(window, limit)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No karma earned in the last {}s.", window);
        return Ok(());
    }
    println!("{} (last {}s)", "Leaderboard".bold(), window);
    for row in &rows {
        println!(
            "  {:>2}. {:<20} {} {} {}",
            row.rank,
            row.username.cyan(),
            row.karma.to_string().green().bold(),
            format!("({} total)", row.total_karma).dimmed(),
            row.user_id.to_string().dimmed()
        );
    }
    Ok(())
}

fn cmd_karma(args: KarmaArgs, config: FeedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let feed = open(&args.source.snapshot, config)?;
    let user = feed.get_user(args.user)?;
    let karma = feed.user_karma(user.id)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&karma)?);
        return Ok(());
    }
    println!("{} {}", user.username.cyan().bold(), user.id.to_string().dimmed());
    println!("  Total karma: {}", karma.total_karma.to_string().bold());
    println!("  Daily karma: {}", karma.daily_karma.to_string().green());
    Ok(())
}

fn cmd_posts(args: SnapshotArgs, config: FeedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let feed = open(&args.snapshot, config)?;
    let posts = feed.list_posts();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }
    for post in &posts {
        let likes = feed.post_like_count(post.id)?;
        let comments = feed.post_comment_count(post.id)?;
        println!(
            "{} {}  {} likes, {} comments  {}",
            post.id.to_string().yellow(),
            post.title.bold(),
            likes,
            comments,
            post.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    if posts.is_empty() {
        println!("No posts.");
    }
    Ok(())
}

fn cmd_thread(args: ThreadArgs, config: FeedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let feed = open(&args.source.snapshot, config)?;
    let nodes = match (args.comment, args.post) {
        (Some(comment), _) => vec![feed.get_subtree(comment)?],
        (None, Some(post)) => feed.get_thread(post)?,
        (None, None) => anyhow::bail!("either --post or --comment is required"),
    };

    let entries = CommentTree::flatten(&nodes);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if let Some(post) = args.post.filter(|_| args.comment.is_none()) {
        let post = feed.get_post(post)?;
        println!("{} {}", post.id.to_string().yellow(), post.title.bold());
    }
    for entry in &entries {
        let author = feed.get_user(entry.comment.author_id)?;
        println!(
            "{}{} {}: {}",
            "  ".repeat(entry.depth + 1),
            entry.comment.id.to_string().dimmed(),
            author.username.cyan(),
            entry.comment.content
        );
    }
    Ok(())
}

fn cmd_verify(args: SnapshotArgs, config: FeedConfig, format: OutputFormat) -> anyhow::Result<()> {
    // Loading already re-checks uniqueness, foreign keys and same-post parents.
    let feed = open(&args.snapshot, config)?;
    let report = feed.audit_ledger()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} Storage constraints hold", "✓".green().bold());
        println!("  Ledger entries: {}", report.entry_count.to_string().bold());
        println!("  Transaction ids: {}", verdict(report.ids_monotonic, "monotonic"));
        println!("  Karma amounts: {}", verdict(report.amounts_consistent, "consistent"));
        for violation in &report.violations {
            let kind = match violation.kind {
                ViolationKind::IdOutOfOrder => "id out of order",
                ViolationKind::AmountMismatch => "amount mismatch",
            };
            println!(
                "  {} {} {}: {}",
                "✗".red(),
                violation.id.to_string().yellow(),
                kind,
                violation.description
            );
        }
    }

    if !report.is_valid() {
        anyhow::bail!("ledger audit found {} violation(s)", report.violations.len());
    }
    Ok(())
}

fn verdict(ok: bool, label: &str) -> colored::ColoredString {
    if ok {
        label.green()
    } else {
        "violated".red()
    }
}

fn cmd_config(config: &FeedConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}
