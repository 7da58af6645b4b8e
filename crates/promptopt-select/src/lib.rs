//! Champion/challenger tournament and the non-dominated quality-diversity
//! portfolio selector: turns scored patch candidates into a promotion
//! decision and, optionally, a Pareto front with illumination telemetry.

pub mod nqd_selector;
pub mod tournament;

pub use nqd_selector::{select as nqd_select, NqdSelectorConfig};
pub use tournament::{tournament, ScoredCandidate, TournamentProgress, TournamentResult};
