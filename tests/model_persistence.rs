use fixit_pricing::application::ml::PriceModel;
use fixit_pricing::application::ml::{ModelBackend, TrainingConfig};
use fixit_pricing::application::pricing::PriceEstimationService;
use fixit_pricing::config::Config;
use fixit_pricing::infrastructure::persistence::ModelStore;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_model_dir() -> PathBuf {
    let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "fixit_pricing_persistence_{}_{}",
        std::process::id(),
        unique_id
    ));
    fs::remove_dir_all(&dir).ok();
    dir
}

fn config_for(dir: &PathBuf) -> Config {
    Config {
        model_dir: dir.clone(),
        eager_init: true,
        metrics_enabled: false,
        ..Config::default()
    }
}

#[test]
fn test_eager_init_persists_model_and_metadata() {
    let dir = temp_model_dir();
    let service = PriceEstimationService::from_config(&config_for(&dir)).unwrap();

    let store = ModelStore::new(&dir);
    assert!(store.exists());

    let metadata: Value =
        serde_json::from_str(&fs::read_to_string(store.metadata_path()).unwrap()).unwrap();
    assert_eq!(metadata["normParams"]["inputMean"].as_array().unwrap().len(), 2);
    assert_eq!(metadata["normParams"]["inputStd"].as_array().unwrap().len(), 2);
    assert!(metadata["normParams"]["labelMean"].is_number());
    assert!(metadata["normParams"]["labelStd"].is_number());
    assert_eq!(metadata["modelConfig"]["minDistance"], 0.1);
    assert_eq!(metadata["modelConfig"]["maxDistance"], 160.0);
    assert_eq!(metadata["modelConfig"]["minBaseRate"], 200.0);
    assert_eq!(metadata["modelConfig"]["maxBaseRate"], 8000.0);
    assert!(metadata["trainingDate"].as_str().unwrap().contains('T'));
    assert_eq!(metadata["version"], "2.0.0");

    let info = service.model_info();
    assert!(info.model_loaded);
    assert!(info.training_date.is_some());
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_second_process_loads_instead_of_training() {
    let dir = temp_model_dir();
    let first = PriceEstimationService::from_config(&config_for(&dir)).unwrap();
    let second = PriceEstimationService::from_config(&config_for(&dir)).unwrap();

    assert_eq!(
        first.model_info().training_date,
        second.model_info().training_date
    );
    assert_eq!(
        first.get_estimated_price(75.0, 2500.0).unwrap(),
        second.get_estimated_price(75.0, 2500.0).unwrap()
    );
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_lazy_init_trains_on_first_quote() {
    let dir = temp_model_dir();
    let config = Config {
        eager_init: false,
        ..config_for(&dir)
    };
    let service = PriceEstimationService::from_config(&config).unwrap();
    assert!(!ModelStore::new(&dir).exists());
    assert!(!service.model_info().model_loaded);

    service.get_estimated_price(30.0, 900.0).unwrap();
    assert!(ModelStore::new(&dir).exists());
    assert!(service.model_info().model_loaded);
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_mismatched_normalization_triggers_retrain() {
    let dir = temp_model_dir();
    let store = ModelStore::new(&dir);
    let first = ModelBackend::new(store.clone(), TrainingConfig::default());
    assert!(first.initialize());
    let trained_at = first.metadata().unwrap().training_date;

    let mut metadata: Value =
        serde_json::from_str(&fs::read_to_string(store.metadata_path()).unwrap()).unwrap();
    metadata["normParams"]["inputMean"] = serde_json::json!([1.0, 2.0, 3.0]);
    fs::write(store.metadata_path(), metadata.to_string()).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = ModelBackend::new(store.clone(), TrainingConfig::default());
    assert!(second.initialize());
    assert!(second.metadata().unwrap().training_date > trained_at);
    assert_eq!(second.metadata().unwrap().norm_params.input_mean.len(), 2);
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_unwritable_model_dir_keeps_in_memory_model() {
    let dir = temp_model_dir();
    fs::create_dir_all(dir.parent().unwrap()).unwrap();
    // a regular file where the model directory should be
    fs::write(&dir, "not a directory").unwrap();

    let backend = ModelBackend::new(ModelStore::new(dir.join("model")), TrainingConfig::default());
    assert!(backend.initialize());
    assert!(backend.is_available());
    fs::remove_file(dir).ok();
}
