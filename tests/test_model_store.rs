//! Integration test: artifact persistence and load-once caching

use polars::df;
use smartprice::error::SmartPriceError;
use smartprice::export::{
    Artifact, ArtifactCache, CacheState, ModelStore, PRICE_MODEL, PRICE_PREPROCESSOR,
};
use smartprice::preprocessing::{FittedPreprocessor, Preprocessor};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn fitted_preprocessor() -> FittedPreprocessor {
    let df = df!(
        "rating" => &[1.0, 2.5, 4.0],
        "brand" => &["Acme", "Globex", "Acme"]
    )
    .unwrap();
    Preprocessor::new(["rating"], ["brand"]).fit(&df).unwrap()
}

#[test]
fn test_save_and_load_preprocessor() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path().join("models"));
    let pre = fitted_preprocessor();

    let path = store.save(&pre, PRICE_PREPROCESSOR).unwrap();
    assert_eq!(path, dir.path().join("models").join("price_preprocessor.bin"));
    assert!(store.exists(PRICE_PREPROCESSOR));

    let loaded: FittedPreprocessor = store.load(PRICE_PREPROCESSOR).unwrap();
    assert_eq!(loaded, pre);

    let query = df!("rating" => &[3.0], "brand" => &["Globex"]).unwrap();
    assert_eq!(loaded.transform(&query).unwrap(), pre.transform(&query).unwrap());
}

#[test]
fn test_commit_writes_all_and_leaves_no_staging_files() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());

    let paths = store
        .commit(vec![
            Artifact::encode(PRICE_PREPROCESSOR, &fitted_preprocessor()).unwrap(),
            Artifact::encode(PRICE_MODEL, &vec![1.0f64, 2.0]).unwrap(),
        ])
        .unwrap();
    assert_eq!(paths.len(), 2);

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["price_model.bin", "price_preprocessor.bin"]);
}

#[test]
fn test_commit_rejects_bad_name_without_writing() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());

    let result = store.commit(vec![
        Artifact::encode(PRICE_MODEL, &1u32).unwrap(),
        Artifact::encode("../escape", &2u32).unwrap(),
    ]);

    assert!(matches!(result, Err(SmartPriceError::InvalidParameter { .. })));
    assert!(!store.exists(PRICE_MODEL));
}

#[test]
fn test_failed_commit_leaves_previous_pair_intact() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    store
        .commit(vec![
            Artifact::encode(PRICE_PREPROCESSOR, &1u32).unwrap(),
            Artifact::encode(PRICE_MODEL, &1u32).unwrap(),
        ])
        .unwrap();

    // a non-empty directory where the model file should be
    let model_path = store.path_for(PRICE_MODEL);
    fs::remove_file(&model_path).unwrap();
    fs::create_dir(&model_path).unwrap();
    fs::write(model_path.join("occupied"), b"x").unwrap();

    let result = store.commit(vec![
        Artifact::encode(PRICE_PREPROCESSOR, &2u32).unwrap(),
        Artifact::encode(PRICE_MODEL, &2u32).unwrap(),
    ]);

    assert!(matches!(result, Err(SmartPriceError::TrainingError(_))));
    assert_eq!(store.load::<u32>(PRICE_PREPROCESSOR).unwrap(), 1);
    assert!(model_path.is_dir());

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["price_model.bin", "price_preprocessor.bin"]);
}

#[test]
fn test_missing_artifact_is_unavailable() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let result: smartprice::Result<FittedPreprocessor> = store.load(PRICE_PREPROCESSOR);
    assert!(matches!(result, Err(SmartPriceError::ArtifactUnavailable { .. })));
}

#[test]
fn test_corrupt_artifact_is_unavailable() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    fs::write(store.path_for(PRICE_PREPROCESSOR), b"not bincode").unwrap();

    let result: smartprice::Result<FittedPreprocessor> = store.load(PRICE_PREPROCESSOR);
    match result {
        Err(SmartPriceError::ArtifactUnavailable { name, .. }) => {
            assert_eq!(name, PRICE_PREPROCESSOR)
        }
        other => panic!("expected ArtifactUnavailable, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_cache_shared_across_threads_loads_once() {
    let cache: Arc<ArtifactCache<Vec<f64>>> = Arc::new(ArtifactCache::new("shared"));
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            thread::spawn(move || {
                cache
                    .get_or_load(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(vec![1.0, 2.0, 3.0])
                    })
                    .unwrap()
            })
        })
        .collect();

    let values: Vec<Arc<Vec<f64>>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(cache.state(), CacheState::Ready);
}
