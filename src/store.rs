use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use crate::config::app_data_dir;
use crate::events::{OddsQuote, Scratching};
use crate::race_time::parse_race_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Scratchings,
    Odds,
}

impl FeedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Scratchings => "scratchings",
            FeedKind::Odds => "odds",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub kind: FeedKind,
    pub meetings: Vec<String>,
    pub rows_written: usize,
    pub rows_skipped: usize,
    pub errors: Vec<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("racedesk.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS scratchings (
            meeting_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            race_id TEXT NULL,
            race_number INTEGER NOT NULL,
            horse_name TEXT NOT NULL,
            tab_number INTEGER NULL,
            scratching_time TEXT NULL,
            reason TEXT NULL,
            loaded_at TEXT NOT NULL,
            PRIMARY KEY (meeting_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_scratchings_race ON scratchings(meeting_id, race_number);

        CREATE TABLE IF NOT EXISTS odds_quotes (
            meeting_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            race_number INTEGER NOT NULL,
            horse_name TEXT NOT NULL,
            tab_number INTEGER NULL,
            price REAL NOT NULL,
            captured_at TEXT NULL,
            source TEXT NULL,
            loaded_at TEXT NOT NULL,
            PRIMARY KEY (meeting_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_odds_race ON odds_quotes(meeting_id, race_number);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            finished_at TEXT NOT NULL,
            feed TEXT NOT NULL,
            meetings INTEGER NOT NULL,
            rows_written INTEGER NOT NULL,
            rows_skipped INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Swap a meeting's scratchings snapshot for `rows`, keeping their order.
pub fn replace_scratchings(
    conn: &mut Connection,
    meeting_id: &str,
    rows: &[&Scratching],
) -> Result<usize> {
    let loaded_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin scratchings tx")?;
    tx.execute(
        "DELETE FROM scratchings WHERE meeting_id = ?1",
        params![meeting_id],
    )
    .context("clear scratchings snapshot")?;
    for (seq, s) in rows.iter().enumerate() {
        tx.execute(
            r#"
            INSERT INTO scratchings (
                meeting_id, seq, race_id, race_number, horse_name,
                tab_number, scratching_time, reason, loaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                meeting_id,
                seq as i64,
                s.race_id,
                s.race_number as i64,
                s.horse_name,
                s.tab_number.map(i64::from),
                s.scratching_time,
                s.reason,
                loaded_at,
            ],
        )
        .with_context(|| format!("insert scratching {}", s.horse_name))?;
    }
    tx.commit().context("commit scratchings tx")?;
    Ok(rows.len())
}

pub fn replace_odds(conn: &mut Connection, meeting_id: &str, rows: &[&OddsQuote]) -> Result<usize> {
    let loaded_at = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin odds tx")?;
    tx.execute(
        "DELETE FROM odds_quotes WHERE meeting_id = ?1",
        params![meeting_id],
    )
    .context("clear odds snapshot")?;
    for (seq, q) in rows.iter().enumerate() {
        tx.execute(
            r#"
            INSERT INTO odds_quotes (
                meeting_id, seq, race_number, horse_name, tab_number,
                price, captured_at, source, loaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                meeting_id,
                seq as i64,
                q.race_number as i64,
                q.horse_name,
                q.tab_number.map(i64::from),
                q.price,
                q.captured_at,
                q.source,
                loaded_at,
            ],
        )
        .with_context(|| format!("insert odds quote {}", q.horse_name))?;
    }
    tx.commit().context("commit odds tx")?;
    Ok(rows.len())
}

pub fn load_scratchings(conn: &Connection, meeting_id: &str) -> Result<Vec<Scratching>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT meeting_id, race_id, race_number, horse_name,
                   tab_number, scratching_time, reason
            FROM scratchings
            WHERE meeting_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .context("prepare load scratchings query")?;
    let rows = stmt
        .query_map(params![meeting_id], |row| {
            Ok(Scratching {
                meeting_id: row.get(0)?,
                race_id: row.get(1)?,
                race_number: row.get::<_, u32>(2)?,
                horse_name: row.get(3)?,
                tab_number: row.get::<_, Option<u32>>(4)?,
                scratching_time: row.get(5)?,
                reason: row.get(6)?,
            })
        })
        .context("query load scratchings")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode scratching row")?);
    }
    Ok(out)
}

pub fn load_odds(conn: &Connection, meeting_id: &str) -> Result<Vec<OddsQuote>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT meeting_id, race_number, horse_name, tab_number,
                   price, captured_at, source
            FROM odds_quotes
            WHERE meeting_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .context("prepare load odds query")?;
    let rows = stmt
        .query_map(params![meeting_id], |row| {
            Ok(OddsQuote {
                meeting_id: row.get(0)?,
                race_number: row.get::<_, u32>(1)?,
                horse_name: row.get(2)?,
                tab_number: row.get::<_, Option<u32>>(3)?,
                price: row.get(4)?,
                captured_at: row.get(5)?,
                source: row.get(6)?,
            })
        })
        .context("query load odds")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode odds row")?);
    }
    Ok(out)
}

/// Group a parsed feed by meeting and replace each meeting's snapshot.
///
/// A failed meeting is recorded in `errors`; the rest still land.
pub fn ingest_scratchings(
    conn: &mut Connection,
    rows: &[Scratching],
    skipped: usize,
) -> Result<IngestSummary> {
    let mut by_meeting: BTreeMap<&str, Vec<&Scratching>> = BTreeMap::new();
    for row in rows {
        by_meeting.entry(row.meeting_id.as_str()).or_default().push(row);
    }
    let mut summary = empty_summary(FeedKind::Scratchings, skipped);
    for (meeting_id, meeting_rows) in by_meeting {
        match replace_scratchings(conn, meeting_id, &meeting_rows) {
            Ok(n) => {
                summary.rows_written += n;
                summary.meetings.push(meeting_id.to_string());
            }
            Err(err) => summary.errors.push(format!("{meeting_id}: {err:#}")),
        }
    }
    finish_ingest(conn, summary)
}

pub fn ingest_odds(
    conn: &mut Connection,
    rows: &[OddsQuote],
    skipped: usize,
) -> Result<IngestSummary> {
    let mut by_meeting: BTreeMap<&str, Vec<&OddsQuote>> = BTreeMap::new();
    for row in rows {
        by_meeting.entry(row.meeting_id.as_str()).or_default().push(row);
    }
    let mut summary = empty_summary(FeedKind::Odds, skipped);
    for (meeting_id, mut meeting_rows) in by_meeting {
        newest_first(&mut meeting_rows);
        match replace_odds(conn, meeting_id, &meeting_rows) {
            Ok(n) => {
                summary.rows_written += n;
                summary.meetings.push(meeting_id.to_string());
            }
            Err(err) => summary.errors.push(format!("{meeting_id}: {err:#}")),
        }
    }
    finish_ingest(conn, summary)
}

pub fn record_ingest_run(conn: &Connection, summary: &IngestSummary) -> Result<()> {
    let errors_json = serde_json::to_string(&summary.errors).context("encode ingest errors")?;
    conn.execute(
        r#"
        INSERT INTO ingest_runs (
            finished_at, feed, meetings, rows_written, rows_skipped, errors_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            Utc::now().to_rfc3339(),
            summary.kind.as_str(),
            summary.meetings.len() as i64,
            summary.rows_written as i64,
            summary.rows_skipped as i64,
            errors_json,
        ],
    )
    .context("insert ingest run")?;
    Ok(())
}

/// Latest `captured_at` first; undated quotes last. Ties keep feed order.
fn newest_first(quotes: &mut [&OddsQuote]) {
    quotes.sort_by_key(|q| {
        std::cmp::Reverse(q.captured_at.as_deref().and_then(parse_race_time))
    });
}

fn empty_summary(kind: FeedKind, skipped: usize) -> IngestSummary {
    IngestSummary {
        kind,
        meetings: Vec::new(),
        rows_written: 0,
        rows_skipped: skipped,
        errors: Vec::new(),
    }
}

fn finish_ingest(conn: &Connection, summary: IngestSummary) -> Result<IngestSummary> {
    record_ingest_run(conn, &summary)?;
    info!(
        feed = summary.kind.as_str(),
        meetings = summary.meetings.len(),
        rows = summary.rows_written,
        skipped = summary.rows_skipped,
        errors = summary.errors.len(),
        "ingest complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");
        conn
    }

    fn scratching(meeting: &str, race: u32, horse: &str) -> Scratching {
        Scratching {
            meeting_id: meeting.to_string(),
            race_id: Some(format!("{meeting}-R{race}")),
            race_number: race,
            horse_name: horse.to_string(),
            tab_number: Some(3),
            scratching_time: Some("2026-01-10T01:00:00Z".to_string()),
            reason: None,
        }
    }

    #[test]
    fn refresh_replaces_only_that_meeting() {
        let mut conn = memory_db();
        let first = vec![
            scratching("M1", 1, "Zulu"),
            scratching("M1", 1, "Alpha"),
            scratching("M2", 4, "Other"),
        ];
        let summary = ingest_scratchings(&mut conn, &first, 2).expect("ingest");
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.rows_skipped, 2);
        assert_eq!(summary.meetings, ["M1", "M2"]);

        let loaded = load_scratchings(&conn, "M1").expect("load");
        let names: Vec<_> = loaded.iter().map(|s| s.horse_name.as_str()).collect();
        assert_eq!(names, ["Zulu", "Alpha"]);
        assert_eq!(loaded[0], first[0]);

        let refreshed = vec![scratching("M1", 2, "Bravo")];
        ingest_scratchings(&mut conn, &refreshed, 0).expect("refresh");
        let loaded = load_scratchings(&conn, "M1").expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].horse_name, "Bravo");
        assert_eq!(load_scratchings(&conn, "M2").expect("load").len(), 1);

        let runs: i64 = conn
            .query_row("SELECT COUNT(*) FROM ingest_runs", [], |r| r.get(0))
            .expect("count");
        assert_eq!(runs, 2);
    }

    #[test]
    fn odds_round_trip_in_order() {
        let mut conn = memory_db();
        let quotes = vec![
            OddsQuote {
                meeting_id: "M1".to_string(),
                race_number: 1,
                horse_name: "Fast Lane".to_string(),
                tab_number: None,
                price: 4.2,
                captured_at: Some("2026-01-10T02:00:00Z".to_string()),
                source: Some("tab".to_string()),
            },
            OddsQuote {
                meeting_id: "M1".to_string(),
                race_number: 1,
                horse_name: "Fast Lane".to_string(),
                tab_number: None,
                price: 3.9,
                captured_at: Some("2026-01-10T01:00:00Z".to_string()),
                source: Some("tab".to_string()),
            },
        ];
        ingest_odds(&mut conn, &quotes, 0).expect("ingest");
        assert_eq!(load_odds(&conn, "M1").expect("load"), quotes);
        assert!(load_odds(&conn, "M9").expect("load").is_empty());
    }

    fn quote(horse: &str, price: f64, captured_at: Option<&str>) -> OddsQuote {
        OddsQuote {
            meeting_id: "M1".to_string(),
            race_number: 1,
            horse_name: horse.to_string(),
            tab_number: None,
            price,
            captured_at: captured_at.map(str::to_string),
            source: None,
        }
    }

    #[test]
    fn odds_stored_newest_first() {
        let mut conn = memory_db();
        let oldest_first = vec![
            quote("Undated", 7.0, None),
            quote("Fast Lane", 8.0, Some("2026-01-10T01:00:00Z")),
            quote("Fast Lane", 3.0, Some("2026-01-10T02:55:00Z")),
            // same instant written with an offset
            quote("Bravo", 4.0, Some("2026-01-10T13:55:00+11:00")),
        ];
        ingest_odds(&mut conn, &oldest_first, 0).expect("ingest");
        let loaded = load_odds(&conn, "M1").expect("load");
        let order: Vec<_> = loaded
            .iter()
            .map(|q| (q.horse_name.as_str(), q.price))
            .collect();
        assert_eq!(
            order,
            [
                ("Fast Lane", 3.0),
                ("Bravo", 4.0),
                ("Fast Lane", 8.0),
                ("Undated", 7.0)
            ]
        );
    }
}
