use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use smartprice::anomaly::{AnomalyDetector, IsolationForest};
use smartprice::export::ModelStore;
use smartprice::inference::{Predictor, ProductRecord};
use smartprice::preprocessing::{Preprocessor, ProductSchema, PRICE};
use smartprice::training::{FraudTrainer, PriceTrainer, PriceTrainingConfig};

const BRANDS: [&str; 5] = ["Acme", "Globex", "Initech", "Umbrella", "Hooli"];
const CATEGORIES: [&str; 4] = ["Shoes", "Bags", "Watches", "Jackets"];
const MATERIALS: [&str; 3] = ["Leather", "Canvas", "Steel"];

fn create_products(n_rows: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut brand = Vec::with_capacity(n_rows);
    let mut category = Vec::with_capacity(n_rows);
    let mut material = Vec::with_capacity(n_rows);
    let mut rating = Vec::with_capacity(n_rows);
    let mut transactions = Vec::with_capacity(n_rows);
    let mut price = Vec::with_capacity(n_rows);

    for _ in 0..n_rows {
        let b = rng.gen_range(0..BRANDS.len());
        let c = rng.gen_range(0..CATEGORIES.len());
        let r: f64 = rng.gen_range(0.5..5.0);
        let t: i64 = rng.gen_range(1..500);
        brand.push(BRANDS[b]);
        category.push(CATEGORIES[c]);
        material.push(MATERIALS[rng.gen_range(0..MATERIALS.len())]);
        rating.push(r);
        transactions.push(t);
        price.push(40.0 * b as f64 + 25.0 * c as f64 + 10.0 * r + 0.1 * t as f64 + rng.gen::<f64>() * 5.0);
    }

    df!(
        "brand" => &brand,
        "category" => &category,
        "material" => &material,
        "rating" => &rating,
        "transactions" => &transactions,
        "price" => &price
    )
    .unwrap()
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");
    let schema = ProductSchema::products();

    for n_rows in [1000, 10000].iter() {
        let df = create_products(*n_rows);
        let pre = Preprocessor::from_schema(&schema, &[PRICE]);
        let fitted = pre.fit(&df).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &df, |b, df| {
            b.iter(|| pre.fit(black_box(df)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("transform", n_rows), &df, |b, df| {
            b.iter(|| fitted.transform(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [500, 2000].iter() {
        let df = create_products(*n_rows);

        group.bench_with_input(BenchmarkId::new("price_fit", n_rows), &df, |b, df| {
            let trainer = PriceTrainer::new(ModelStore::new("unused"))
                .with_config(PriceTrainingConfig::default().with_n_estimators(50));
            b.iter(|| trainer.fit(black_box(df)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("fraud_fit", n_rows), &df, |b, df| {
            let trainer = FraudTrainer::new(ModelStore::new("unused"));
            b.iter(|| trainer.fit(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_isolation_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation_forest");
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let x = ndarray::Array2::from_shape_fn((5000, 8), |_| rng.gen::<f64>());

    let mut forest = IsolationForest::new().with_seed(42);
    forest.fit(&x).unwrap();

    group.bench_function("score_5000", |b| {
        b.iter(|| forest.score_samples(black_box(&x)).unwrap())
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train once into a scratch directory
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let df = create_products(2000);
    PriceTrainer::new(store.clone())
        .with_config(PriceTrainingConfig::default().with_n_estimators(50))
        .train(&df)
        .unwrap();
    FraudTrainer::new(store.clone()).train(&df).unwrap();

    let predictor = Predictor::new(store);
    predictor.warm_up().unwrap();
    let record = ProductRecord::new("Globex", "Bags", "Leather", 4.2, 120);

    group.bench_function("price_single", |b| {
        b.iter(|| predictor.predict_price(black_box(&record)))
    });
    group.bench_function("fraud_single", |b| {
        b.iter(|| predictor.predict_fraud(black_box(&record)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_preprocessing,
    bench_training,
    bench_isolation_forest,
    bench_prediction
);
criterion_main!(benches);
