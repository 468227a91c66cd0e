//! Mapping raw backend responses for compiled fixture requests

use serde_json::json;
use sieve_search::aggregation::{BucketsPath, MetricKind};
use sieve_search::field::FacetType;
use sieve_search::{
    CompiledRequest, Error, FacetSpec, PipelineAggregation, PipelineKind, SearchIntent,
    SearchResponse, SortDirection, SortSpec,
};

mod test_support;

fn compiled() -> CompiledRequest {
    let mut price = FacetSpec::new("price.price");
    price.interval = Some(10.0);
    price.metrics = vec![MetricKind::Max];

    let mut color = FacetSpec::new("color.value");
    color.pipelines = vec![PipelineAggregation::new(
        "top_color",
        PipelineKind::MaxBucket,
        Some(BucketsPath::Single(
            "color__value>color__value>_count".to_string(),
        )),
    )
    .unwrap()];

    test_support::builder()
        .create(
            &SearchIntent::new("b2c_fr", "product")
                .page(0, 2)
                .facet(color)
                .facet(price)
                .sort_by(SortSpec::asc("price.price")),
        )
        .unwrap()
}

fn raw_response() -> serde_json::Value {
    json!({
        "took": 7,
        "timed_out": false,
        "hits": {
            "total": { "value": 3, "relation": "eq" },
            "max_score": null,
            "hits": [
                {
                    "_index": "sieve_test__b2c_fr_product",
                    "_id": "3",
                    "_score": null,
                    "_source": { "sku": "24-MB03", "price": [{ "price": 12.5 }] },
                    "sort": [12.5, null]
                },
                {
                    "_index": "sieve_test__b2c_fr_product",
                    "_id": "1",
                    "_score": null,
                    "_source": { "sku": "24-MB01", "price": [{ "price": 34.0 }] },
                    "sort": [34.0, null]
                }
            ]
        },
        "aggregations": {
            "color__value": {
                "doc_count": 6,
                "color__value": {
                    "doc_count_error_upper_bound": 0,
                    "sum_other_doc_count": 1,
                    "buckets": [
                        { "key": "red", "doc_count": 3 },
                        { "key": "grey", "doc_count": 2 }
                    ]
                }
            },
            "top_color": { "value": 3.0, "keys": ["red"] },
            "price__price": {
                "doc_count": 2,
                "price__price": {
                    "buckets": [
                        { "key": 10.0, "doc_count": 1, "price__price_max": { "value": 12.5 } },
                        { "key": 30.0, "doc_count": 1, "price__price_max": { "value": 34.0 } }
                    ]
                }
            }
        }
    })
}

#[test]
fn test_hits_and_pagination() {
    let request = compiled();
    let container = test_support::product("b2c_fr");
    let response = SearchResponse::from_backend(&raw_response(), &request, &container).unwrap();

    assert_eq!(response.took_ms, 7);
    assert!(!response.timed_out);
    assert_eq!(response.total, 3);

    let ids: Vec<&str> = response.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "1"]);
    assert_eq!(response.hits[0].score, None);
    assert_eq!(response.hits[0].sort, vec![json!(12.5), json!(null)]);

    assert_eq!(response.pagination.current_page, 1);
    assert_eq!(response.pagination.last_page, 2);
    assert_eq!(response.pagination.page_size, 2);

    let sort_info = response.sort_info.unwrap();
    assert_eq!(sort_info.field, "price__price");
    assert_eq!(sort_info.direction, SortDirection::Asc);
}

#[test]
fn test_facets_unwrap_nested_buckets() {
    let request = compiled();
    let container = test_support::product("b2c_fr");
    let response = SearchResponse::from_backend(&raw_response(), &request, &container).unwrap();

    assert_eq!(response.facets.len(), 2);

    let color = &response.facets[0];
    assert_eq!(color.field, "color__value");
    assert_eq!(color.label, "Colour");
    assert_eq!(color.facet_type, FacetType::Checkbox);
    assert_eq!(color.count, 2);
    assert!(color.has_more);
    assert_eq!(color.options[0].value, "red");
    assert_eq!(color.options[0].label, "Red");
    assert_eq!(color.options[0].count, 3);

    let price = &response.facets[1];
    assert_eq!(price.label, "Price");
    assert_eq!(price.facet_type, FacetType::Slider);
    assert!(!price.has_more);
    let values: Vec<&str> = price.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["10.0", "30.0"]);

    assert_eq!(response.metrics.get("top_color"), Some(&json!(3.0)));
}

#[test]
fn test_option_labels_resolve_per_catalog() {
    let raw = json!({
        "hits": { "total": { "value": 5 }, "hits": [] },
        "aggregations": {
            "category__id": {
                "doc_count": 5,
                "category__id": {
                    "buckets": [
                        { "key": "cat_1", "doc_count": 4 },
                        { "key": "cat_2", "doc_count": 1 }
                    ]
                }
            },
            "color__value": {
                "doc_count": 5,
                "color__value": {
                    "buckets": [{ "key": "red", "doc_count": 5 }]
                }
            }
        }
    });

    let labels = |catalog: &str| {
        let request = test_support::builder()
            .create(
                &SearchIntent::new(catalog, "product")
                    .facet(FacetSpec::new("category.id"))
                    .facet(FacetSpec::new("color.value")),
            )
            .unwrap();
        let container = test_support::product(catalog);
        let response = SearchResponse::from_backend(&raw, &request, &container).unwrap();
        response
            .facets
            .iter()
            .flat_map(|facet| facet.options.iter().map(|o| o.label.clone()))
            .collect::<Vec<_>>()
    };

    assert_eq!(labels("b2c_fr"), vec!["One", "cat_2", "Red"]);
    // no labels configured for this catalog
    assert_eq!(labels("b2c_en"), vec!["cat_1", "cat_2", "red"]);
}

#[test]
fn test_missing_aggregations_are_skipped() {
    let request = compiled();
    let container = test_support::product("b2c_fr");
    let mut raw = raw_response();
    raw["aggregations"]
        .as_object_mut()
        .unwrap()
        .remove("price__price");

    let response = SearchResponse::from_backend(&raw, &request, &container).unwrap();
    assert_eq!(response.facets.len(), 1);
}

#[test]
fn test_legacy_numeric_total() {
    let request = compiled();
    let container = test_support::product("b2c_fr");
    let raw = json!({ "hits": { "total": 0, "hits": [] } });

    let response = SearchResponse::from_backend(&raw, &request, &container).unwrap();
    assert_eq!(response.total, 0);
    assert!(response.hits.is_empty());
    assert!(response.facets.is_empty());
    assert_eq!(response.pagination.last_page, 1);
}

#[test]
fn test_malformed_responses_are_rejected() {
    let request = compiled();
    let container = test_support::product("b2c_fr");

    for raw in [
        json!([]),
        json!({ "took": 1 }),
        json!({ "hits": { "total": 1, "hits": [{ "_source": {} }] } }),
        json!({ "hits": { "total": "many", "hits": [] } }),
        json!({ "hits": { "total": 1, "hits": [] }, "aggregations": { "color__value": {} } }),
    ] {
        let err = SearchResponse::from_backend(&raw, &request, &container).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)), "{raw}: {err}");
    }
}
