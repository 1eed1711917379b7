mod common;

use common::{LOOK_BACK, small_network, wave};
use eurusd_forecaster::application::ml::{ForexPredictor, NetworkConfig};
use eurusd_forecaster::domain::errors::PredictorError;
use eurusd_forecaster::domain::ml::ScalerFit;
use eurusd_forecaster::infrastructure::model_store::saved_model_path;
use std::fs;
use std::path::Path;

fn load(path: &Path) -> Result<ForexPredictor, PredictorError> {
    ForexPredictor::load(path)
}

fn trained(series: &[f64]) -> ForexPredictor {
    let mut predictor = ForexPredictor::with_network(LOOK_BACK, 1, small_network()).unwrap();
    predictor.train(series, 3, 8).unwrap();
    predictor
}

#[test]
fn test_save_then_load_reproduces_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models/forex_predictor.json");
    let series = wave(120);
    let predictor = trained(&series);

    predictor.save(&path).unwrap();
    assert!(path.exists());
    assert!(saved_model_path(&path).unwrap().exists());

    let restored = load(&path).unwrap();
    assert_eq!(restored.look_back(), LOOK_BACK);
    assert_eq!(restored.forecast_steps(), 1);
    assert_eq!(restored.scaler(), predictor.scaler());
    assert_eq!(restored.training(), predictor.training());

    for start in [0, 37, 90] {
        let window = &series[start..start + LOOK_BACK + 3];
        let expected = predictor.predict_next(window).unwrap();
        let actual = restored.predict_next(window).unwrap();
        assert_eq!(expected[0].to_bits(), actual[0].to_bits());
    }
}

#[test]
fn test_load_with_missing_model_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forex_predictor.json");
    trained(&wave(60)).save(&path).unwrap();

    fs::remove_file(saved_model_path(&path).unwrap()).unwrap();
    assert!(matches!(
        load(&path),
        Err(PredictorError::Persistence { .. })
    ));
}

#[test]
fn test_load_with_missing_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forex_predictor.json");
    trained(&wave(60)).save(&path).unwrap();

    fs::remove_file(&path).unwrap();
    assert!(load(&path).is_err());
}

#[test]
fn test_load_with_corrupt_model_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forex_predictor.json");
    trained(&wave(60)).save(&path).unwrap();

    fs::write(saved_model_path(&path).unwrap(), b"not a model").unwrap();
    assert!(matches!(
        load(&path),
        Err(PredictorError::Persistence { .. })
    ));
}

#[test]
fn test_load_rejects_model_of_another_shape() {
    let dir = tempfile::tempdir().unwrap();
    let small = dir.path().join("small.json");
    let large = dir.path().join("large.json");

    trained(&wave(60)).save(&small).unwrap();
    let mut other = ForexPredictor::with_network(LOOK_BACK + 2, 1, small_network()).unwrap();
    other.train(&wave(60), 1, 8).unwrap();
    other.save(&large).unwrap();

    // Swap in the model file of a predictor with a different window
    fs::copy(saved_model_path(&large).unwrap(), saved_model_path(&small).unwrap()).unwrap();
    assert!(load(&small).is_err());
}

#[test]
fn test_constant_series_predicts_the_constant() {
    let network = NetworkConfig::default()
        .with_lstm_units(vec![4, 4])
        .with_dense_units(vec![3])
        .with_seed(5);
    let mut predictor = ForexPredictor::with_network(30, 1, network).unwrap();
    let series = vec![1.0; 100];
    predictor.train(&series, 2, 8).unwrap();

    let prediction = predictor.predict_next(&series[70..]).unwrap();
    assert!((prediction[0] - 1.0).abs() < 1e-9);
}

#[test]
fn test_retraining_discards_previous_fit() {
    let mut predictor = trained(&wave(80));
    let shifted: Vec<f64> = wave(80).iter().map(|p| p + 0.5).collect();

    predictor.train(&shifted, 2, 8).unwrap();
    let min = predictor.scaler().data_min().unwrap();
    assert!(min > 1.5);

    // Predictions come back in the new price range
    let prediction = predictor.predict_next(&shifted[70..]).unwrap()[0];
    assert!(prediction > 1.0);
}

#[test]
fn test_inputs_only_scaler_fit_survives_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forex_predictor.json");
    let mut predictor = ForexPredictor::with_network(LOOK_BACK, 1, small_network())
        .unwrap()
        .with_scaler_fit(ScalerFit::InputsOnly);
    predictor.train(&wave(60), 1, 8).unwrap();
    predictor.save(&path).unwrap();

    let restored = load(&path).unwrap();
    assert_eq!(restored.scaler_fit(), ScalerFit::InputsOnly);
}
