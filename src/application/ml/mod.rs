pub mod evaluation;
pub mod model_backend;
pub mod predictor;
pub mod training;

pub use model_backend::ModelBackend;
pub use predictor::{PriceModel, RuleOnlyModel};
pub use training::{TrainedModel, TrainingConfig};
