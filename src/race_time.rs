//! Track-local jump times.
//!
//! Feeds publish jump times in UTC; the desk shows them in the track's own
//! state time, including daylight saving where the state observes it.

use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use once_cell::sync::Lazy;

use crate::normalize::normalize_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuState {
    Nsw,
    Vic,
    Qld,
    Sa,
    Wa,
    Tas,
    Nt,
    Act,
}

const TRACKS: &[(&str, AuState)] = &[
    ("randwick", AuState::Nsw),
    ("royal randwick", AuState::Nsw),
    ("randwick kensington", AuState::Nsw),
    ("rosehill", AuState::Nsw),
    ("rosehill gardens", AuState::Nsw),
    ("warwick farm", AuState::Nsw),
    ("canterbury", AuState::Nsw),
    ("canterbury park", AuState::Nsw),
    ("newcastle", AuState::Nsw),
    ("kembla grange", AuState::Nsw),
    ("gosford", AuState::Nsw),
    ("wyong", AuState::Nsw),
    ("hawkesbury", AuState::Nsw),
    ("scone", AuState::Nsw),
    ("flemington", AuState::Vic),
    ("caulfield", AuState::Vic),
    ("moonee valley", AuState::Vic),
    ("the valley", AuState::Vic),
    ("sandown", AuState::Vic),
    ("sandown hillside", AuState::Vic),
    ("sandown lakeside", AuState::Vic),
    ("bendigo", AuState::Vic),
    ("ballarat", AuState::Vic),
    ("geelong", AuState::Vic),
    ("pakenham", AuState::Vic),
    ("cranbourne", AuState::Vic),
    ("mornington", AuState::Vic),
    ("eagle farm", AuState::Qld),
    ("doomben", AuState::Qld),
    ("gold coast", AuState::Qld),
    ("sunshine coast", AuState::Qld),
    ("ipswich", AuState::Qld),
    ("toowoomba", AuState::Qld),
    ("townsville", AuState::Qld),
    ("rockhampton", AuState::Qld),
    ("morphettville", AuState::Sa),
    ("morphettville parks", AuState::Sa),
    ("murray bridge", AuState::Sa),
    ("gawler", AuState::Sa),
    ("ascot", AuState::Wa),
    ("belmont", AuState::Wa),
    ("belmont park", AuState::Wa),
    ("pinjarra", AuState::Wa),
    ("bunbury", AuState::Wa),
    ("northam", AuState::Wa),
    ("launceston", AuState::Tas),
    ("hobart", AuState::Tas),
    ("devonport", AuState::Tas),
    ("darwin", AuState::Nt),
    ("fannie bay", AuState::Nt),
    ("alice springs", AuState::Nt),
    ("canberra", AuState::Act),
    ("thoroughbred park", AuState::Act),
];

static TRACK_STATES: Lazy<HashMap<&'static str, AuState>> =
    Lazy::new(|| TRACKS.iter().copied().collect());

impl AuState {
    pub fn code(self) -> &'static str {
        match self {
            AuState::Nsw => "NSW",
            AuState::Vic => "VIC",
            AuState::Qld => "QLD",
            AuState::Sa => "SA",
            AuState::Wa => "WA",
            AuState::Tas => "TAS",
            AuState::Nt => "NT",
            AuState::Act => "ACT",
        }
    }

    fn standard_offset_secs(self) -> i32 {
        match self {
            AuState::Nsw | AuState::Vic | AuState::Qld | AuState::Tas | AuState::Act => 10 * 3600,
            AuState::Sa | AuState::Nt => 9 * 3600 + 1800,
            AuState::Wa => 8 * 3600,
        }
    }

    pub fn observes_dst(self) -> bool {
        matches!(
            self,
            AuState::Nsw | AuState::Vic | AuState::Sa | AuState::Tas | AuState::Act
        )
    }

    /// Offset in force at `utc`.
    ///
    /// Daylight time runs from the first Sunday of October (02:00 standard)
    /// to the first Sunday of April (03:00 daylight, i.e. 02:00 standard).
    pub fn utc_offset(self, utc: DateTime<Utc>) -> FixedOffset {
        let std_secs = self.standard_offset_secs();
        let dst = self.observes_dst() && in_daylight_time(utc, std_secs);
        let secs = if dst { std_secs + 3600 } else { std_secs };
        FixedOffset::east_opt(secs).unwrap_or(Utc.fix())
    }
}

pub fn state_for_track(track: &str) -> Option<AuState> {
    let key = normalize_str(track);
    if key.is_empty() {
        return None;
    }
    if let Some(state) = TRACK_STATES.get(key.as_str()) {
        return Some(*state);
    }
    // "Flemington Racecourse", "Ascot WA": prefer the longest known prefix.
    TRACKS
        .iter()
        .filter(|(name, _)| {
            key.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with(' '))
        })
        .max_by_key(|(name, _)| name.len())
        .map(|(_, state)| *state)
}

pub fn local_race_time(utc: DateTime<Utc>, track: &str) -> Option<DateTime<FixedOffset>> {
    let state = state_for_track(track)?;
    Some(utc.with_timezone(&state.utc_offset(utc)))
}

/// `HH:MM` in track-local time, or `HH:MMZ` when the track is unknown.
pub fn display_race_time(utc: DateTime<Utc>, track: &str) -> String {
    match local_race_time(utc, track) {
        Some(local) => local.format("%H:%M").to_string(),
        None => utc.format("%H:%MZ").to_string(),
    }
}

pub fn parse_race_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn in_daylight_time(utc: DateTime<Utc>, std_secs: i32) -> bool {
    let year = utc.year();
    let (Some(start), Some(end)) = (
        transition_utc(year, 10, std_secs),
        transition_utc(year, 4, std_secs),
    ) else {
        return false;
    };
    utc >= start || utc < end
}

/// 02:00 local standard time on the first Sunday of `month`, as UTC.
fn transition_utc(year: i32, month: u32, std_secs: i32) -> Option<DateTime<Utc>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let to_sunday = (7 - first.weekday().num_days_from_sunday()) % 7;
    let sunday = first + Duration::days(i64::from(to_sunday));
    let local = sunday.and_hms_opt(2, 0, 0)?;
    Some(Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(std_secs)))))
}
