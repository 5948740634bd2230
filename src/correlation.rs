//! Lookups of external events for a runner.
//!
//! Scope (meeting and race) is always compared exactly; only the horse name
//! is fuzzy. A near-identical name in another race is never a match.

use crate::events::RaceEvent;
use crate::matcher::names_match;

/// One runner slot to look up: exact scope plus a name matched fuzzily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchQuery<'a> {
    pub meeting_id: &'a str,
    pub race_number: u32,
    pub horse_name: Option<&'a str>,
}

impl<'a> MatchQuery<'a> {
    pub fn new(meeting_id: &'a str, race_number: u32, horse_name: &'a str) -> Self {
        Self {
            meeting_id,
            race_number,
            horse_name: Some(horse_name),
        }
    }

    pub fn for_event<E: RaceEvent>(event: &'a E) -> Self {
        Self {
            meeting_id: event.meeting_id(),
            race_number: event.race_number(),
            horse_name: event.horse_name(),
        }
    }

    pub fn find<'e, E: RaceEvent>(&self, events: &'e [E]) -> Option<&'e E> {
        events.iter().find(|e| {
            in_scope(*e, self.meeting_id, self.race_number)
                && names_match(e.horse_name(), self.horse_name)
        })
    }

    pub fn is_matched<E: RaceEvent>(&self, events: &[E]) -> bool {
        self.find(events).is_some()
    }
}

/// First event, in input order, for this runner. Callers wanting recency
/// must pass events most-recent-first; nothing here sorts.
pub fn find_match<'e, E: RaceEvent>(
    events: &'e [E],
    meeting_id: &str,
    race_number: u32,
    horse_name: &str,
) -> Option<&'e E> {
    MatchQuery::new(meeting_id, race_number, horse_name).find(events)
}

pub fn is_matched<E: RaceEvent>(
    events: &[E],
    meeting_id: &str,
    race_number: u32,
    horse_name: &str,
) -> bool {
    find_match(events, meeting_id, race_number, horse_name).is_some()
}

/// Every event for the race, name ignored, input order kept.
pub fn find_all_for_race<'e, E: RaceEvent>(
    events: &'e [E],
    meeting_id: &str,
    race_number: u32,
) -> Vec<&'e E> {
    events
        .iter()
        .filter(|e| in_scope(*e, meeting_id, race_number))
        .collect()
}

fn in_scope<E: RaceEvent>(event: &E, meeting_id: &str, race_number: u32) -> bool {
    event.meeting_id() == meeting_id && event.race_number() == race_number
}
