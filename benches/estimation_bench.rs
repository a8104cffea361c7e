use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use procurement_estimator::{EstimationMethod, EstimationRequest, PricingEngine, ReferenceData};

fn bench_comprehensive_estimation(c: &mut Criterion) {
    let engine = PricingEngine::new(Arc::new(ReferenceData::seeded()));
    let as_of = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let request = EstimationRequest::new(
        "מחשב נייד לצוות פיתוח",
        "",
        25,
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
    )
    .with_description("מערכת מורכבת עם התקנה והדרכה");
    let methods: Vec<&str> = EstimationMethod::ALL.iter().map(|m| m.as_str()).collect();

    c.bench_function("comprehensive_estimation_all_methods", |b| {
        b.iter(|| {
            engine
                .calculate_comprehensive_estimation_at(black_box(&request), black_box(&methods), as_of)
                .ok()
        })
    });

    c.bench_function("category_detection", |b| {
        b.iter(|| {
            engine
                .detector()
                .detect(black_box("Dell PowerEdge server"), black_box(""), black_box(""))
        })
    });
}

criterion_group!(benches, bench_comprehensive_estimation);
criterion_main!(benches);
