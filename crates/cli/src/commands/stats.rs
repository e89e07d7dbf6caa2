// Path: crates/cli/src/commands/stats.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hearth_stats::store::StatsStore;
use hearth_types::config::RelayConfig;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Path to the relay's TOML configuration file.
    #[clap(long, default_value = "./hearth.toml")]
    config: PathBuf,

    /// Summarize one author's usage (hex or npub).
    #[clap(long, conflicts_with_all = ["kind", "month"])]
    author: Option<String>,

    /// Summarize one event kind.
    #[clap(long, conflicts_with_all = ["author", "month"])]
    kind: Option<i64>,

    /// Summarize one UTC calendar month, as `YYYY-MM`.
    #[clap(long, conflicts_with_all = ["author", "kind"])]
    month: Option<String>,
}

/// `[month_start, month_end)` Unix timestamps for a `YYYY-MM` string,
/// computed without a calendar crate since only whole UTC days/months
/// matter here and every month in the Gregorian calendar since 1970 is a
/// fixed, table-free computation.
fn month_bounds(month: &str) -> Result<(i64, i64)> {
    let (year_str, month_str) = month
        .split_once('-')
        .context("month must be formatted YYYY-MM")?;
    let year: i32 = year_str.parse().context("invalid year")?;
    let month_num: u32 = month_str.parse().context("invalid month")?;
    if !(1..=12).contains(&month_num) {
        anyhow::bail!("month must be between 01 and 12");
    }

    let days_before_year = |y: i32| -> i64 {
        let y = y as i64 - 1;
        365 * y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
    };
    let is_leap = |y: i32| (y % 4 == 0 && y % 100 != 0) || y % 400 == 0;
    let days_in_month = [31, if is_leap(year) { 29 } else { 28 }, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

    let epoch_days_before_year = days_before_year(1970);
    let days_before_month: i64 = days_in_month[..(month_num as usize - 1)].iter().sum();
    let start_days = days_before_year(year) - epoch_days_before_year + days_before_month;
    let end_days = start_days + days_in_month[month_num as usize - 1];

    Ok((start_days * 86_400, end_days * 86_400))
}

pub async fn run(args: StatsArgs) -> Result<()> {
    let config = RelayConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let stats = StatsStore::open(&config.stats_db_path)
        .with_context(|| format!("opening stats store at {}", config.stats_db_path))?;

    let bucket = if let Some(author) = &args.author {
        let canon = hearth_crypto::pubkey::canonicalize(author)
            .with_context(|| format!("invalid pubkey: {author}"))?;
        stats.stats_by_author(&hex::encode(canon)).await?
    } else if let Some(kind) = args.kind {
        stats.stats_by_kind(kind).await?
    } else if let Some(month) = &args.month {
        let (start, end) = month_bounds(month)?;
        stats.stats_by_month(start, end).await?
    } else {
        anyhow::bail!("one of --author, --kind, or --month is required");
    };

    println!(
        "{}: {} events, {} bytes",
        bucket.label, bucket.event_count, bucket.total_bytes
    );
    Ok(())
}
