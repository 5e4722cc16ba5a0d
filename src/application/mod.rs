// Persistence wiring
pub mod bootstrap;

// Trend engine
pub mod trends;
