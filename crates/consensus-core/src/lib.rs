// Library root: identity matching and projection combination for
// multi-source fantasy projections.

pub mod combine;
pub mod config;
pub mod matching;
pub mod record;
