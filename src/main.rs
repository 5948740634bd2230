use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use racedesk::config::RacedeskConfig;
use racedesk::events::{OddsQuote, Scratching};
use racedesk::export::export_race_cards;
use racedesk::feeds::{
    parse_odds_feed, parse_ratings_feed, parse_results_json, parse_scratchings_feed,
};
use racedesk::field::{RaceCard, annotate_meeting, value_bets};
use racedesk::http_client::FeedSource;
use racedesk::matcher::{allowed_distance, edit_distance, match_rule};
use racedesk::normalize::normalize;
use racedesk::store;
use racedesk::value::pnl_summary;

const USAGE: &str = "\
usage:
  racedesk ingest [--scratchings <file|url>] [--odds <file|url>] [--db <path>]
  racedesk annotate --ratings <file|url> [--meeting <id>] [--results <file|url>] [--xlsx <path>] [--db <path>]
  racedesk match <name> <name>";

fn main() -> Result<()> {
    let config = RacedeskConfig::load();
    init_logging(&config);

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };
    let rest = &args[1..];
    match command.as_str() {
        "ingest" => run_ingest(&config, rest),
        "annotate" => run_annotate(&config, rest),
        "match" => run_match(rest),
        "help" | "--help" | "-h" => {
            println!("{USAGE}");
            Ok(())
        }
        other => Err(anyhow!("unknown command `{other}`\n{USAGE}")),
    }
}

fn init_logging(config: &RacedeskConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_ingest(config: &RacedeskConfig, args: &[String]) -> Result<()> {
    let scratchings = flag_value(args, "--scratchings").or_else(|| config.scratchings_url.clone());
    let odds = flag_value(args, "--odds").or_else(|| config.odds_url.clone());
    if scratchings.is_none() && odds.is_none() {
        bail!("nothing to ingest: pass --scratchings and/or --odds\n{USAGE}");
    }

    let db_path = resolve_db_path(config, args)?;
    let mut conn = store::open_db(&db_path)?;
    println!("DB: {}", db_path.display());

    if let Some(src) = scratchings {
        let raw = FeedSource::parse(&src).read(config.http_timeout_secs)?;
        let parsed = parse_scratchings_feed(&raw).context("parse scratchings feed")?;
        let summary = store::ingest_scratchings(&mut conn, &parsed.rows, parsed.skipped)?;
        print_ingest(&summary);
    }
    if let Some(src) = odds {
        let raw = FeedSource::parse(&src).read(config.http_timeout_secs)?;
        let parsed = parse_odds_feed(&raw).context("parse odds feed")?;
        let summary = store::ingest_odds(&mut conn, &parsed.rows, parsed.skipped)?;
        print_ingest(&summary);
    }
    Ok(())
}

fn print_ingest(summary: &store::IngestSummary) {
    println!(
        "{}: meetings={} rows={} skipped={}",
        summary.kind.as_str(),
        summary.meetings.len(),
        summary.rows_written,
        summary.rows_skipped
    );
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!("   - {err}");
        }
    }
}

fn run_annotate(config: &RacedeskConfig, args: &[String]) -> Result<()> {
    let ratings_src = flag_value(args, "--ratings").context("--ratings is required")?;
    let raw = FeedSource::parse(&ratings_src).read(config.http_timeout_secs)?;
    let parsed = parse_ratings_feed(&raw).context("parse ratings feed")?;
    if parsed.skipped > 0 {
        warn!(skipped = parsed.skipped, "ratings rows without meeting/race/horse");
    }

    let mut rows = parsed.rows;
    if let Some(meeting) = flag_value(args, "--meeting") {
        rows.retain(|r| r.meeting_id == meeting);
    }
    if rows.is_empty() {
        bail!("no ratings rows to annotate");
    }

    let db_path = resolve_db_path(config, args)?;
    let conn = store::open_db(&db_path)?;
    let meetings: BTreeSet<&str> = rows.iter().map(|r| r.meeting_id.as_str()).collect();
    let mut scratchings: Vec<Scratching> = Vec::new();
    let mut odds: Vec<OddsQuote> = Vec::new();
    for meeting in &meetings {
        scratchings.extend(store::load_scratchings(&conn, meeting)?);
        odds.extend(store::load_odds(&conn, meeting)?);
    }
    info!(
        meetings = meetings.len(),
        scratchings = scratchings.len(),
        odds = odds.len(),
        "loaded snapshots"
    );

    let cards = annotate_meeting(&rows, &scratchings, &odds, config.parallel);
    for card in &cards {
        print_card(card);
    }

    if let Some(src) = flag_value(args, "--results") {
        let raw = FeedSource::parse(&src).read(config.http_timeout_secs)?;
        let results = parse_results_json(&raw).context("parse results feed")?;
        let bets = value_bets(&cards, &results, config.stake);
        let pnl = pnl_summary(&bets);
        println!(
            "Value P&L: bets={} staked={:.2} profit={:+.2} roi={:+.1}% strike={:.1}%",
            pnl.bets,
            pnl.staked,
            pnl.profit,
            pnl.roi * 100.0,
            pnl.strike_rate * 100.0
        );
    }

    if let Some(path) = flag_value(args, "--xlsx") {
        let path = PathBuf::from(path);
        let report = export_race_cards(&path, &cards)?;
        println!(
            "Exported {} races, {} runners, {} unmatched scratchings to {}",
            report.races,
            report.runners,
            report.unmatched,
            path.display()
        );
    }
    Ok(())
}

fn print_card(card: &RaceCard) {
    let jump = card
        .runners
        .first()
        .and_then(|r| r.local_jump_time())
        .unwrap_or_default();
    println!(
        "{} R{} {} ({} scratched)",
        card.meeting_id,
        card.race_number,
        jump,
        card.scratched_count()
    );
    for r in &card.runners {
        let tab = r.row.tab_number.map(|t| t.to_string()).unwrap_or_default();
        let price = r.price.map(|p| format!("{p:.2}")).unwrap_or_else(|| "-".into());
        let value = r.value_score.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".into());
        let rank = r.value_rank.map(|v| format!("#{v}")).unwrap_or_default();
        let status = if r.scratched {
            format!("SCR {}", r.scratching_reason.as_deref().unwrap_or(""))
        } else {
            String::new()
        };
        println!(
            "  {tab:>3} {:<24} {price:>7} {value:>7} {rank:>4} {status}",
            r.row.horse_name
        );
    }
    for s in &card.unmatched_scratchings {
        println!("  ?? unmatched scratching: {}", s.horse_name);
    }
}

fn run_match(args: &[String]) -> Result<()> {
    let (Some(a), Some(b)) = (
        args.first().map(String::as_str),
        args.get(1).map(String::as_str),
    ) else {
        bail!("match needs two names\n{USAGE}");
    };
    let n1 = normalize(Some(a));
    let n2 = normalize(Some(b));
    println!("normalized: {n1:?} / {n2:?}");
    println!(
        "edit distance: {} (allowed {})",
        edit_distance(&n1, &n2),
        allowed_distance(&n1, &n2)
    );
    match match_rule(Some(a), Some(b)) {
        Some(rule) => println!("match: yes ({})", rule.label()),
        None => println!("match: no"),
    }
    Ok(())
}

fn resolve_db_path(config: &RacedeskConfig, args: &[String]) -> Result<PathBuf> {
    flag_value(args, "--db")
        .map(PathBuf::from)
        .or_else(|| config.db_path.clone())
        .context("unable to resolve sqlite path (set RACEDESK_DB or pass --db)")
}

/// `--flag value` or `--flag=value`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(flag).and_then(|s| s.strip_prefix('=')) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
