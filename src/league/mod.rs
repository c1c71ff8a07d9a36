//! League records and season scheduling.

pub mod model;
pub mod season;

pub use model::{League, LeagueFormat, LeagueStatus, Player, PoolEntry, SeasonCalendar, SeasonMarks};
pub use season::{SeasonService, SeasonTaskHandler};
