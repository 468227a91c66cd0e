//! Criterion benchmarks for request compilation and rendering

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use sieve_search::{
    Config, FacetSpec, FilterCriterion, RequestBuilder, SearchIntent, SortSpec,
};
use std::time::Duration;

fn create_builder() -> RequestBuilder {
    let config: Config = serde_json::from_value(json!({
        "catalogs": [{ "id": 1, "code": "b2c_fr" }],
        "containers": [{
            "name": "product",
            "entity": "product",
            "default_filters": [{ "type": "term", "field": "is_active", "value": true }],
            "fields": [
                { "code": "sku", "type": "keyword", "searchable": true, "filterable": true },
                { "code": "name", "type": "text", "searchable": true, "weight": 2.0 },
                { "code": "color.value", "type": "select", "filterable": true },
                { "code": "category.id", "type": "category", "filterable": true },
                { "code": "price.price", "type": "price", "filterable": true, "sortable": true },
                { "code": "is_active", "type": "boolean", "filterable": true }
            ]
        }]
    }))
    .unwrap_or_else(|e| panic!("invalid benchmark configuration: {e}"));
    RequestBuilder::from_config(&config)
        .unwrap_or_else(|e| panic!("failed to create builder: {e}"))
}

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(1))
        .nresamples(1000)
}

fn bench_empty_intent(c: &mut Criterion) {
    let builder = create_builder();
    let intent = SearchIntent::new("b2c_fr", "product");

    c.bench_function("compile_empty", |b| {
        b.iter(|| builder.create(black_box(&intent)).unwrap())
    });
}

fn bench_faceted_intent(c: &mut Criterion) {
    let builder = create_builder();
    let criterion: FilterCriterion = serde_json::from_value(json!({
        "equalFilter": { "field": "color.value", "in": ["red", "grey"] }
    }))
    .unwrap();
    let intent = SearchIntent::new("b2c_fr", "product")
        .text("leather bag")
        .filter(criterion)
        .facet(FacetSpec::new("color.value"))
        .facet(FacetSpec::new("category.id"))
        .sort_by(SortSpec::asc("price.price"));

    c.bench_function("compile_faceted", |b| {
        b.iter(|| builder.create(black_box(&intent)).unwrap())
    });

    let request = builder.create(&intent).unwrap();
    c.bench_function("render_faceted", |b| {
        b.iter(|| request.to_search_body(black_box(builder.registry())).unwrap())
    });
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets = bench_empty_intent, bench_faceted_intent
}
criterion_main!(benches);
