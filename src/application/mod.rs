// Model training, loading and evaluation
pub mod ml;

// Quote pipeline: validation, cache, ensemble
pub mod pricing;
