use serde::{Deserialize, Serialize};

/// Anything keyed to a runner slot in a race: scratchings, odds quotes and
/// ratings rows all carry the same `(meeting, race, horse)` triple.
pub trait RaceEvent {
    fn meeting_id(&self) -> &str;
    fn race_number(&self) -> u32;
    fn horse_name(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scratching {
    pub meeting_id: String,
    pub race_id: Option<String>,
    pub race_number: u32,
    pub horse_name: String,
    pub tab_number: Option<u32>,
    pub scratching_time: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub meeting_id: String,
    pub race_number: u32,
    pub horse_name: String,
    pub tab_number: Option<u32>,
    /// Decimal win price.
    pub price: f64,
    pub captured_at: Option<String>,
    pub source: Option<String>,
}

/// A runner row from the ratings provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub meeting_id: String,
    pub race_number: u32,
    pub horse_name: String,
    pub tab_number: Option<u32>,
    pub rating: Option<f64>,
    pub track: Option<String>,
    /// Jump time as RFC 3339 (UTC).
    pub race_time: Option<String>,
}

/// Official result for a race: the winning horse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub meeting_id: String,
    pub race_number: u32,
    pub horse_name: String,
    pub starting_price: Option<f64>,
}

macro_rules! impl_race_event {
    ($($ty:ty),*) => {
        $(impl RaceEvent for $ty {
            fn meeting_id(&self) -> &str {
                &self.meeting_id
            }

            fn race_number(&self) -> u32 {
                self.race_number
            }

            fn horse_name(&self) -> Option<&str> {
                Some(self.horse_name.as_str())
            }
        })*
    };
}

impl_race_event!(Scratching, OddsQuote, RatingRow, RaceResult);
