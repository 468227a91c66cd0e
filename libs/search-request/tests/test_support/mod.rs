#![allow(dead_code)]

use serde_json::json;
use sieve_search::{Config, ContainerConfiguration, RequestBuilder};
use std::sync::{Arc, OnceLock};

pub const INDEX_PREFIX: &str = "sieve_test__";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Four catalogs and two containers: `product` (nested price, category and
/// color fields, an `is_active` default filter, a price-group sort override)
/// and `category` (flat fields, no default filter).
pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config: Config = serde_json::from_value(json!({
            "search": { "index_prefix": INDEX_PREFIX },
            "catalogs": [
                { "id": 1, "code": "b2c_fr", "name": "B2C French" },
                { "id": 2, "code": "b2c_en", "name": "B2C English" },
                { "id": 3, "code": "b2b_en" },
                { "id": 4, "code": "b2b_fr" }
            ],
            "containers": [
                {
                    "name": "product",
                    "entity": "product",
                    "default_filters": [
                        { "type": "term", "field": "is_active", "value": true }
                    ],
                    "fields": [
                        { "code": "id", "type": "int", "filterable": true, "sortable": true },
                        { "code": "sku", "type": "keyword", "searchable": true, "filterable": true, "sortable": true },
                        { "code": "name", "type": "text", "searchable": true, "sortable": true, "weight": 2.0 },
                        { "code": "description", "type": "text", "searchable": true },
                        {
                            "code": "category.id",
                            "type": "category",
                            "filterable": true,
                            "option_labels": { "b2c_fr": { "cat_1": "One" } }
                        },
                        {
                            "code": "color.value",
                            "type": "select",
                            "filterable": true,
                            "label": "Colour",
                            "option_labels": { "b2c_fr": { "red": "Red", "grey": "Grey" } }
                        },
                        { "code": "size", "type": "int", "filterable": true, "sortable": true },
                        { "code": "price.price", "type": "price", "filterable": true, "sortable": true },
                        { "code": "my_price.price", "type": "price", "filterable": true, "sortable": true },
                        { "code": "stock.status", "type": "boolean", "filterable": true },
                        { "code": "is_active", "type": "boolean", "filterable": true },
                        { "code": "created_at", "type": "date", "filterable": true, "sortable": true }
                    ],
                    "sort_overrides": [
                        {
                            "field": "my_price.price",
                            "context_key": "price_group_id",
                            "targets": { "0": "price.price" }
                        }
                    ]
                },
                {
                    "name": "category",
                    "entity": "category",
                    "fields": [
                        { "code": "id", "type": "keyword", "filterable": true },
                        { "code": "name", "type": "text", "searchable": true, "sortable": true },
                        { "code": "level", "type": "int", "filterable": true, "sortable": true }
                    ]
                }
            ]
        }))
        .expect("fixture configuration is valid JSON");
        config.validate().expect("fixture configuration is valid");
        config
    })
}

pub fn builder() -> RequestBuilder {
    RequestBuilder::from_config(config()).expect("builder from fixture configuration")
}

pub fn product(catalog: &str) -> Arc<ContainerConfiguration> {
    builder()
        .resolve(catalog, "product")
        .expect("product container resolves")
}
