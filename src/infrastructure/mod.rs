pub mod persistence;
pub mod repositories;

pub use repositories::{InMemoryMarketDataRepository, InMemoryTrendRepository};
