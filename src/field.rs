//! Race cards: ratings rows joined with scratchings and odds.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::correlation::{MatchQuery, find_all_for_race, find_match};
use crate::events::{OddsQuote, RaceResult, RatingRow, Scratching};
use crate::race_time::{display_race_time, parse_race_time};
use crate::value::{Bet, BetOutcome, value_score};

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedRunner {
    pub row: RatingRow,
    pub scratched: bool,
    pub scratching_reason: Option<String>,
    pub price: Option<f64>,
    pub value_score: Option<f64>,
    /// 1 = best value among runners still in the race.
    pub value_rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceCard {
    pub meeting_id: String,
    pub race_number: u32,
    pub runners: Vec<AnnotatedRunner>,
    /// Scratchings for this race that no ratings row could be matched to.
    pub unmatched_scratchings: Vec<Scratching>,
}

impl AnnotatedRunner {
    /// Jump time in the track's local time, when the row carries one.
    pub fn local_jump_time(&self) -> Option<String> {
        let utc = self.row.race_time.as_deref().and_then(parse_race_time)?;
        Some(display_race_time(
            utc,
            self.row.track.as_deref().unwrap_or_default(),
        ))
    }
}

impl RaceCard {
    pub fn scratched_count(&self) -> usize {
        self.runners.iter().filter(|r| r.scratched).count()
    }
}

/// Annotate one runner row at a time. `odds` should be most-recent-first.
pub fn annotate_race(
    rows: &[RatingRow],
    scratchings: &[Scratching],
    odds: &[OddsQuote],
) -> Vec<AnnotatedRunner> {
    rows.iter()
        .map(|row| {
            let query = MatchQuery::for_event(row);
            let scratching = query.find(scratchings);
            let scratched = scratching.is_some();
            let price = query.find(odds).map(|q| q.price);
            let value = if scratched {
                None
            } else {
                row.rating.zip(price).and_then(|(r, p)| value_score(r, p))
            };
            AnnotatedRunner {
                row: row.clone(),
                scratched,
                scratching_reason: scratching.and_then(|s| s.reason.clone()),
                price,
                value_score: value,
                value_rank: None,
            }
        })
        .collect()
}

/// Build a card per `(meeting, race)` present in `rows`, ordered by meeting
/// then race number.
pub fn annotate_meeting(
    rows: &[RatingRow],
    scratchings: &[Scratching],
    odds: &[OddsQuote],
    parallel: bool,
) -> Vec<RaceCard> {
    let mut races: BTreeMap<(String, u32), Vec<RatingRow>> = BTreeMap::new();
    for row in rows {
        races
            .entry((row.meeting_id.clone(), row.race_number))
            .or_default()
            .push(row.clone());
    }
    let races: Vec<_> = races.into_iter().collect();

    let build = |((meeting_id, race_number), race_rows): &((String, u32), Vec<RatingRow>)| {
        build_card(meeting_id, *race_number, race_rows, scratchings, odds)
    };
    let cards: Vec<RaceCard> = if parallel {
        races.par_iter().map(build).collect()
    } else {
        races.iter().map(build).collect()
    };

    debug!(
        races = cards.len(),
        scratched = cards.iter().map(RaceCard::scratched_count).sum::<usize>(),
        "annotated meeting"
    );
    cards
}

/// Flat-stake bet on each card's top value runner, settled against `results`.
///
/// Races without a result are left out. The price is the quoted price the
/// selection was made at, not the starting price.
pub fn value_bets(cards: &[RaceCard], results: &[RaceResult], stake: f64) -> Vec<Bet> {
    cards
        .iter()
        .filter_map(|card| {
            let pick = card.runners.iter().find(|r| r.value_rank == Some(1))?;
            let price = pick.price?;
            let race_results = find_all_for_race(results, &card.meeting_id, card.race_number);
            if race_results.is_empty() {
                return None;
            }
            let won = find_match(
                results,
                &card.meeting_id,
                card.race_number,
                &pick.row.horse_name,
            )
            .is_some();
            Some(Bet {
                stake,
                price,
                outcome: if won { BetOutcome::Won } else { BetOutcome::Lost },
            })
        })
        .collect()
}

fn build_card(
    meeting_id: &str,
    race_number: u32,
    rows: &[RatingRow],
    scratchings: &[Scratching],
    odds: &[OddsQuote],
) -> RaceCard {
    let mut runners = annotate_race(rows, scratchings, odds);
    rank_by_value(&mut runners);

    let unmatched_scratchings = find_all_for_race(scratchings, meeting_id, race_number)
        .into_iter()
        .filter(|s| !MatchQuery::for_event(*s).is_matched(rows))
        .cloned()
        .collect();

    RaceCard {
        meeting_id: meeting_id.to_string(),
        race_number,
        runners,
        unmatched_scratchings,
    }
}

fn rank_by_value(runners: &mut [AnnotatedRunner]) {
    let mut ranked: Vec<(usize, f64)> = runners
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| r.value_score.map(|v| (idx, v)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    for (rank, (idx, _)) in ranked.into_iter().enumerate() {
        runners[idx].value_rank = Some(rank + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(meeting: &str, race: u32, horse: &str, rating: f64) -> RatingRow {
        RatingRow {
            meeting_id: meeting.to_string(),
            race_number: race,
            horse_name: horse.to_string(),
            tab_number: None,
            rating: Some(rating),
            track: None,
            race_time: None,
        }
    }

    fn scratching(meeting: &str, race: u32, horse: &str) -> Scratching {
        Scratching {
            meeting_id: meeting.to_string(),
            race_id: None,
            race_number: race,
            horse_name: horse.to_string(),
            tab_number: None,
            scratching_time: None,
            reason: Some("Injured".to_string()),
        }
    }

    fn result(meeting: &str, race: u32, winner: &str) -> RaceResult {
        RaceResult {
            meeting_id: meeting.to_string(),
            race_number: race,
            horse_name: winner.to_string(),
            starting_price: None,
        }
    }

    fn quote(meeting: &str, race: u32, horse: &str, price: f64) -> OddsQuote {
        OddsQuote {
            meeting_id: meeting.to_string(),
            race_number: race,
            horse_name: horse.to_string(),
            tab_number: None,
            price,
            captured_at: None,
            source: None,
        }
    }

    #[test]
    fn scratched_runner_gets_no_value() {
        let rows = vec![rating("M1", 1, "Fast Lane", 80.0)];
        let scr = vec![scratching("M1", 1, "FASTLANE")];
        let odds = vec![quote("M1", 1, "Fast Lane", 4.0)];
        let out = annotate_race(&rows, &scr, &odds);
        assert!(out[0].scratched);
        assert_eq!(out[0].scratching_reason.as_deref(), Some("Injured"));
        assert_eq!(out[0].price, Some(4.0));
        assert!(out[0].value_score.is_none());
    }

    #[test]
    fn most_recent_quote_first_wins() {
        let rows = vec![rating("M1", 1, "Fast Lane", 80.0)];
        let odds = vec![
            quote("M1", 1, "Fast Lane", 5.0),
            quote("M1", 1, "Fast Lane", 3.0),
        ];
        let out = annotate_race(&rows, &[], &odds);
        assert_eq!(out[0].price, Some(5.0));
        assert!((out[0].value_score.expect("value") - 160.0).abs() < 1e-9);
    }

    #[test]
    fn meeting_cards_rank_and_surface_unmatched() {
        let rows = vec![
            rating("M1", 2, "Bravo", 50.0),
            rating("M1", 1, "Alpha", 60.0),
            rating("M1", 1, "Charlie", 90.0),
            rating("M1", 1, "Delta", 70.0),
        ];
        let scr = vec![
            scratching("M1", 1, "Delta"),
            scratching("M1", 1, "Mystery Horse"),
            scratching("M1", 3, "Nobody"),
        ];
        let odds = vec![
            quote("M1", 1, "Alpha", 2.0),
            quote("M1", 1, "Charlie", 6.0),
            quote("M1", 1, "Delta", 1.5),
        ];

        for parallel in [false, true] {
            let cards = annotate_meeting(&rows, &scr, &odds, parallel);
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[0].race_number, 1);
            assert_eq!(cards[1].race_number, 2);

            let race1 = &cards[0];
            assert_eq!(race1.scratched_count(), 1);
            // Alpha 60/2*10 = 300, Charlie 90/6*10 = 150
            let rank = |name: &str| {
                race1
                    .runners
                    .iter()
                    .find(|r| r.row.horse_name == name)
                    .and_then(|r| r.value_rank)
            };
            assert_eq!(rank("Alpha"), Some(1));
            assert_eq!(rank("Charlie"), Some(2));
            assert_eq!(rank("Delta"), None);
            assert_eq!(race1.unmatched_scratchings.len(), 1);
            assert_eq!(race1.unmatched_scratchings[0].horse_name, "Mystery Horse");

            assert!(cards[1].unmatched_scratchings.is_empty());
            assert_eq!(cards[1].runners[0].value_rank, None);
        }
    }

    #[test]
    fn value_bets_settle_top_pick() {
        let rows = vec![
            rating("M1", 1, "Alpha", 60.0),
            rating("M1", 1, "Charlie", 90.0),
            rating("M1", 2, "Bravo", 50.0),
            rating("M1", 3, "Echo", 40.0),
        ];
        let odds = vec![
            quote("M1", 1, "Alpha", 2.0),
            quote("M1", 1, "Charlie", 6.0),
            quote("M1", 2, "Bravo", 4.0),
            quote("M1", 3, "Echo", 5.0),
        ];
        let results = vec![result("M1", 1, "ALPHA"), result("M1", 2, "Someone Else")];
        let cards = annotate_meeting(&rows, &[], &odds, false);
        let bets = value_bets(&cards, &results, 10.0);
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0].outcome, BetOutcome::Won);
        assert!((bets[0].profit() - 10.0).abs() < 1e-9);
        assert_eq!(bets[1].outcome, BetOutcome::Lost);
    }
}
