pub mod config;
pub mod correlation;
pub mod events;
pub mod export;
pub mod feeds;
pub mod field;
pub mod http_client;
pub mod matcher;
pub mod normalize;
pub mod race_time;
pub mod store;
pub mod value;

pub use correlation::{MatchQuery, find_all_for_race, find_match, is_matched};
pub use events::{OddsQuote, RaceEvent, RaceResult, RatingRow, Scratching};
pub use matcher::{MatchRule, names_match};
pub use normalize::normalize;
