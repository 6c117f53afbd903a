use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_pipeline::imputation::{Imputer, KNNImputer};
use kolosal_pipeline::training::{GridSearch, ModelKind, ParamGrid, ParamSet, ParamValue, Scoring};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let y: Array1<f64> = (0..n_rows).map(|i| (i % 2) as f64).collect();
    let x = Array2::from_shape_fn((n_rows, n_features), |(i, j)| {
        let shift = if j == 0 { y[i] * 3.0 } else { 0.0 };
        rng.gen::<f64>() + shift
    });
    (x, y)
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let grid = ParamGrid::new()
        .with("max_depth", vec![ParamValue::Int(3), ParamValue::Int(5)])
        .with(
            "criterion",
            vec![ParamValue::Text("gini".to_string()), ParamValue::Text("entropy".to_string())],
        );

    for n_rows in [500, 2000].iter() {
        let (x, y) = create_classification_data(*n_rows, 8);
        group.bench_with_input(BenchmarkId::new("decision_tree", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                GridSearch::new(5, Scoring::RocAuc)
                    .search(ModelKind::DecisionTreeClassifier, &grid, black_box(x), black_box(y), 2)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_predict_proba(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_proba");

    let (x_train, y_train) = create_classification_data(2000, 8);
    let mut model = ModelKind::GaussianNB.build(&ParamSet::new(), 2, 42).unwrap();
    model.fit(&x_train, &y_train).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (x, _) = create_classification_data(*n_rows, 8);
        group.bench_with_input(BenchmarkId::new("gaussian_nb", n_rows), &x, |b, x| {
            b.iter(|| model.predict_proba(black_box(x)).unwrap())
        });
    }

    group.finish();
}

fn bench_knn_imputation(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_imputation");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let (mut x, _) = create_classification_data(*n_rows, 6);
        for i in (0..*n_rows).step_by(7) {
            x[[i, i % 6]] = f64::NAN;
        }
        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &x, |b, x| {
            b.iter(|| {
                let mut imputer = KNNImputer::new(3);
                imputer.fit_transform(black_box(x)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grid_search, bench_predict_proba, bench_knn_imputation);
criterion_main!(benches);
