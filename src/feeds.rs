//! Adapters from upstream feed payloads to the canonical event records.
//!
//! Providers disagree on field names (`meetingId` vs `meeting_id`, `horseName`
//! vs `runnerName`, ...). All of that guessing happens here so nothing
//! downstream ever looks at more than one shape.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::events::{OddsQuote, RaceResult, RatingRow, Scratching};

const MEETING_KEYS: &[&str] = &["meetingId", "meeting_id", "meeting"];
const RACE_NUMBER_KEYS: &[&str] = &["raceNumber", "race_number", "raceNo"];
const RACE_ID_KEYS: &[&str] = &["raceId", "race_id"];
const HORSE_KEYS: &[&str] = &["horseName", "horse_name", "runnerName", "name"];
const WINNER_KEYS: &[&str] = &["winner", "winnerName", "horseName", "horse_name"];
const TAB_KEYS: &[&str] = &["tabNumber", "tab_number", "tabNo", "saddlecloth"];
const PRICE_KEYS: &[&str] = &["price", "winPrice", "odds"];
const RATING_KEYS: &[&str] = &["rating", "ttr", "ttrRating"];
const TRACK_KEYS: &[&str] = &["track", "venueName", "trackName"];
const RACE_TIME_KEYS: &[&str] = &["raceTime", "race_time", "startTime", "jumpTime"];

/// Parsed rows plus how many input rows could not be adapted.
#[derive(Debug, Clone)]
pub struct FeedParse<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

pub fn parse_scratchings_feed(raw: &str) -> Result<FeedParse<Scratching>> {
    adapt_rows(raw, "scratchings", scratching_from_value)
}

pub fn parse_odds_feed(raw: &str) -> Result<FeedParse<OddsQuote>> {
    adapt_rows(raw, "odds", odds_from_value)
}

pub fn parse_ratings_feed(raw: &str) -> Result<FeedParse<RatingRow>> {
    adapt_rows(raw, "ratings", rating_from_value)
}

pub fn parse_results_feed(raw: &str) -> Result<FeedParse<RaceResult>> {
    adapt_rows(raw, "results", result_from_value)
}

pub fn parse_scratchings_json(raw: &str) -> Result<Vec<Scratching>> {
    Ok(parse_scratchings_feed(raw)?.rows)
}

pub fn parse_odds_json(raw: &str) -> Result<Vec<OddsQuote>> {
    Ok(parse_odds_feed(raw)?.rows)
}

pub fn parse_ratings_json(raw: &str) -> Result<Vec<RatingRow>> {
    Ok(parse_ratings_feed(raw)?.rows)
}

pub fn parse_results_json(raw: &str) -> Result<Vec<RaceResult>> {
    Ok(parse_results_feed(raw)?.rows)
}

fn adapt_rows<T>(
    raw: &str,
    list_key: &str,
    adapt: impl Fn(&Value) -> Option<T>,
) -> Result<FeedParse<T>> {
    let root: Value =
        serde_json::from_str(raw).with_context(|| format!("invalid {list_key} feed json"))?;
    let items = match &root {
        Value::Null => {
            return Ok(FeedParse {
                rows: Vec::new(),
                skipped: 0,
            });
        }
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get(list_key)
            .or_else(|| obj.get("data"))
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .with_context(|| format!("{list_key} feed has no `{list_key}` or `data` array"))?,
        _ => anyhow::bail!("{list_key} feed must be an array or object"),
    };

    let mut rows = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match adapt(item) {
            Some(row) => rows.push(row),
            None => {
                skipped += 1;
                debug!(feed = list_key, row = %item, "skipping unadaptable feed row");
            }
        }
    }
    Ok(FeedParse { rows, skipped })
}

fn scratching_from_value(v: &Value) -> Option<Scratching> {
    let (meeting_id, race_number, horse_name) = scope_of(v)?;
    Some(Scratching {
        meeting_id,
        race_id: first_of(v, RACE_ID_KEYS).and_then(as_string_any),
        race_number,
        horse_name,
        tab_number: first_of(v, TAB_KEYS).and_then(as_u32_any),
        scratching_time: first_of(v, &["scratchingTime", "scratching_time", "scratchedAt"])
            .and_then(as_string_any),
        reason: first_of(v, &["reason"]).and_then(as_string_any),
    })
}

fn odds_from_value(v: &Value) -> Option<OddsQuote> {
    let (meeting_id, race_number, horse_name) = scope_of(v)?;
    let price = first_of(v, PRICE_KEYS).and_then(as_f64_any)?;
    if !price.is_finite() || price <= 1.0 {
        return None;
    }
    Some(OddsQuote {
        meeting_id,
        race_number,
        horse_name,
        tab_number: first_of(v, TAB_KEYS).and_then(as_u32_any),
        price,
        captured_at: first_of(v, &["capturedAt", "captured_at", "timestamp", "updatedAt"])
            .and_then(as_string_any),
        source: first_of(v, &["source", "bookmaker", "provider"]).and_then(as_string_any),
    })
}

fn rating_from_value(v: &Value) -> Option<RatingRow> {
    let (meeting_id, race_number, horse_name) = scope_of(v)?;
    Some(RatingRow {
        meeting_id,
        race_number,
        horse_name,
        tab_number: first_of(v, TAB_KEYS).and_then(as_u32_any),
        rating: first_of(v, RATING_KEYS)
            .and_then(as_f64_any)
            .filter(|r| r.is_finite()),
        track: first_of(v, TRACK_KEYS).and_then(as_string_any),
        race_time: first_of(v, RACE_TIME_KEYS).and_then(as_string_any),
    })
}

fn result_from_value(v: &Value) -> Option<RaceResult> {
    let (meeting_id, race_number, horse_name) = scope_with(v, WINNER_KEYS)?;
    Some(RaceResult {
        meeting_id,
        race_number,
        horse_name,
        starting_price: first_of(v, &["startingPrice", "starting_price", "sp"])
            .and_then(as_f64_any)
            .filter(|p| p.is_finite() && *p > 1.0),
    })
}

fn scope_of(v: &Value) -> Option<(String, u32, String)> {
    scope_with(v, HORSE_KEYS)
}

fn scope_with(v: &Value, horse_keys: &[&str]) -> Option<(String, u32, String)> {
    let meeting_id = first_of(v, MEETING_KEYS).and_then(as_string_any)?;
    let race_number = first_of(v, RACE_NUMBER_KEYS)
        .and_then(as_u32_any)
        .filter(|n| *n > 0)?;
    let horse_name = first_of(v, horse_keys)
        .and_then(|x| x.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;
    Some((meeting_id, race_number, horse_name))
}

/// First present, non-null value among `keys`.
fn first_of<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .find(|x| !x.is_null())
}

fn as_string_any(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

fn as_u32_any(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    v.as_str()?.trim().parse::<u32>().ok()
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}
