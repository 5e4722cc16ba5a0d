// Domain names, sales and groups
pub mod catalog;

// Domain-specific error types
pub mod errors;

// Repository traits
pub mod repositories;

// Trend statistics and output rows
pub mod trends;
