// Domain-specific error types
pub mod errors;

// Pricing rules, features and model records
pub mod pricing;

// Request validation
pub mod validation;
