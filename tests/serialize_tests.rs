//! Response serialization tests

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use odata_protocol_sdk::config::ServiceConfig;
use odata_protocol_sdk::etag;
use odata_protocol_sdk::metadata::{Cardinality, EntityMetadata, MetadataRegistry, PropertyDescriptor, PropertyType};
use odata_protocol_sdk::query::{Expansion, MetadataLevel, Projection, QueryOptions};
use odata_protocol_sdk::record::{FieldMap, TypedRecord, Value};
use odata_protocol_sdk::serialize::{RenderOptions, ResponseSerializer, SerializeError};
use odata_protocol_sdk::tracker::{ChangeKind, ChangeTracker, DeltaToken};
use serde::Serialize;
use serde_json::json;

const ROOT: &str = "https://host/svc";

fn products() -> EntityMetadata {
    EntityMetadata::builder("Demo", "Product", "Products")
        .property("ID", PropertyType::Int64)
        .property("Name", PropertyType::String)
        .property("Price", PropertyType::Decimal)
        .property("Version", PropertyType::Int64)
        .navigation("Category", "Category", Cardinality::One)
        .navigation("Reviews", "Review", Cardinality::Many)
        .key("ID")
        .etag("Version")
        .build()
        .unwrap()
}

fn categories() -> EntityMetadata {
    EntityMetadata::builder("Demo", "Category", "Categories")
        .property("ID", PropertyType::Int64)
        .property("Name", PropertyType::String)
        .key("ID")
        .build()
        .unwrap()
}

fn reviews() -> EntityMetadata {
    EntityMetadata::builder("Demo", "Review", "Reviews")
        .property("ID", PropertyType::Int64)
        .property("Rating", PropertyType::Int32)
        .key("ID")
        .build()
        .unwrap()
}

fn serializer() -> ResponseSerializer {
    let registry = MetadataRegistry::new()
        .with(products())
        .unwrap()
        .with(categories())
        .unwrap()
        .with(reviews())
        .unwrap();
    ResponseSerializer::new(Arc::new(registry), &ServiceConfig::new(ROOT))
}

fn chai() -> FieldMap {
    FieldMap::new()
        .with("ID", 1)
        .with("Name", "Chai")
        .with("Price", Value::Decimal("18.00".to_string()))
        .with("Version", 3)
        .with("Category", FieldMap::new().with("ID", 10).with("Name", "Beverages"))
        .with(
            "Reviews",
            vec![
                FieldMap::new().with("ID", 100).with("Rating", 5),
                FieldMap::new().with("ID", 101).with("Rating", 4),
            ],
        )
}

fn chang() -> FieldMap {
    FieldMap::new()
        .with("ID", 2)
        .with("Name", "Chang")
        .with("Price", Value::Decimal("19.00".to_string()))
        .with("Version", 1)
}

fn metadata_of(serializer: &ResponseSerializer, set: &str) -> Arc<EntityMetadata> {
    Arc::clone(serializer.registry().entity_set(set).unwrap())
}

/// Every annotation key in a payload, qualified by its position
fn annotations(json: &serde_json::Value) -> BTreeSet<String> {
    fn walk(json: &serde_json::Value, prefix: &str, out: &mut BTreeSet<String>) {
        match json {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let path = format!("{}/{}", prefix, key);
                    if key.contains('@') {
                        out.insert(path.clone());
                    }
                    walk(value, &path, out);
                }
            }
            serde_json::Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    walk(item, &format!("{}/{}", prefix, idx), out);
                }
            }
            _ => {}
        }
    }
    let mut out = BTreeSet::new();
    walk(json, "", &mut out);
    out
}

mod collection_tests {
    use super::*;

    #[test]
    fn test_minimal_collection_body() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let response = serializer
            .render_collection(&metadata, &[chai()], &RenderOptions::new(MetadataLevel::Minimal))
            .unwrap();

        let expected = format!(
            r#"{{"@odata.context":"{root}/$metadata#Products","value":[{{"@odata.id":"{root}/Products(1)","@odata.etag":{tag},"ID":1,"Name":"Chai","Price":18.00,"Version":3}}]}}"#,
            root = ROOT,
            tag = serde_json::to_string(&etag::from_canonical("3")).unwrap()
        );
        assert_eq!(response.body_str().unwrap(), expected);
        assert_eq!(response.headers.content_length, response.body.len());
        assert_eq!(
            response.headers.content_type,
            "application/json;odata.metadata=minimal;charset=utf-8"
        );
        assert_eq!(response.headers.odata_version, "4.0");
    }

    #[test]
    fn test_empty_collection_is_empty_array() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        for level in [MetadataLevel::None, MetadataLevel::Minimal, MetadataLevel::Full] {
            let options = RenderOptions::new(level);
            let empty = serializer
                .render_collection(&metadata, Vec::<FieldMap>::new(), &options)
                .unwrap();
            assert!(empty.body_str().unwrap().contains(r#""value":[]"#));

            let missing: Option<Vec<FieldMap>> = None;
            let nil = serializer
                .render_collection(&metadata, missing.into_iter().flatten(), &options)
                .unwrap();
            assert_eq!(nil.to_json().unwrap()["value"], json!([]));
        }
    }

    #[test]
    fn test_none_level_has_no_annotations() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let response = serializer
            .render_collection(&metadata, &[chai(), chang()], &RenderOptions::new(MetadataLevel::None))
            .unwrap();
        let body = response.body_str().unwrap();
        assert!(!body.contains("@odata"));
        assert_eq!(
            response.headers.content_type,
            "application/json;odata.metadata=none;charset=utf-8"
        );
    }

    #[test]
    fn test_full_level_annotations() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let json = serializer
            .render_collection(&metadata, &[chai()], &RenderOptions::new(MetadataLevel::Full))
            .unwrap()
            .to_json()
            .unwrap();
        let entity = &json["value"][0];
        assert_eq!(entity["@odata.type"], "#Demo.Product");
        assert_eq!(entity["@odata.id"], format!("{}/Products(1)", ROOT));
        assert_eq!(
            entity["Category@odata.navigationLink"],
            format!("{}/Products(1)/Category", ROOT)
        );
        assert_eq!(
            entity["Reviews@odata.navigationLink"],
            format!("{}/Products(1)/Reviews", ROOT)
        );
        assert!(entity.get("Category").is_none());
    }

    #[test]
    fn test_levels_are_monotonic() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let projection = Projection::all()
            .with_expand(Expansion::new("Category"))
            .with_expand(Expansion::new("Reviews").with_count(true));
        let render = |level| {
            let options = RenderOptions::new(level)
                .with_projection(projection.clone())
                .with_count(2);
            let json = serializer
                .render_collection(&metadata, &[chai(), chang()], &options)
                .unwrap()
                .to_json()
                .unwrap();
            annotations(&json)
        };

        let none = render(MetadataLevel::None);
        let minimal = render(MetadataLevel::Minimal);
        let full = render(MetadataLevel::Full);
        assert!(none.is_subset(&minimal));
        assert!(minimal.is_subset(&full));
        assert!(!none.iter().any(|a| a.ends_with("@odata.id")));
        assert!(minimal.contains("/value/0/@odata.id"));
        assert!(!minimal.contains("/value/0/@odata.type"));
        assert!(full.contains("/value/0/@odata.type"));
    }

    #[test]
    fn test_envelope_member_order() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let options = RenderOptions::new(MetadataLevel::Minimal)
            .with_count(42)
            .with_next_link(format!("{}/Products?$skiptoken=2", ROOT))
            .with_delta_link(format!("{}/Products?$deltatoken=abc", ROOT));
        let response = serializer
            .render_collection(&metadata, &[chai(), chang()], &options)
            .unwrap();
        let body = response.body_str().unwrap();

        let positions: Vec<usize> = [
            "\"@odata.context\"",
            "\"@odata.count\":42",
            "\"value\"",
            "\"@odata.nextLink\"",
            "\"@odata.deltaLink\"",
        ]
        .iter()
        .map(|needle| body.find(needle).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_count_at_none_level() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let json = serializer
            .render_collection(&metadata, &[chai()], &RenderOptions::new(MetadataLevel::None).with_count(1))
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(json["@odata.count"], 1);
        assert!(json.get("@odata.context").is_none());
    }

    #[test]
    fn test_index_annotation() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let json = serializer
            .render_collection(
                &metadata,
                &[chai(), chang()],
                &RenderOptions::new(MetadataLevel::Minimal).with_index(true),
            )
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(json["value"][0]["@odata.index"], 0);
        assert_eq!(json["value"][1]["@odata.index"], 1);
    }

    #[test]
    fn test_head_length_matches_body() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let options = RenderOptions::new(MetadataLevel::Full);
        let get = serializer.render_collection(&metadata, &[chai(), chang()], &options).unwrap();
        let head = serializer
            .render_collection(&metadata, &[chai(), chang()], &options)
            .unwrap()
            .into_head();
        assert!(head.body.is_empty());
        assert_eq!(head.headers.content_length, get.body.len());
        assert_eq!(head.headers.content_type, get.headers.content_type);
    }

    #[test]
    fn test_pool_buffers_are_returned() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        serializer
            .render_collection(&metadata, &[chai()], &RenderOptions::default())
            .unwrap();
        assert_eq!(serializer.pool().idle(), 1);
        serializer
            .render_collection(&metadata, &[chai()], &RenderOptions::default())
            .unwrap();
        assert_eq!(serializer.pool().idle(), 1);
    }
}

mod projection_tests {
    use super::*;

    #[test]
    fn test_select_keeps_declared_order_and_annotations() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let options = RenderOptions::new(MetadataLevel::Minimal)
            .with_projection(Projection::all().with_select(["Version", "Name"]));
        let response = serializer.render_collection(&metadata, &[chai()], &options).unwrap();
        let body = response.body_str().unwrap();

        assert!(body.contains("#Products(Version,Name)"));
        assert!(body.contains("\"@odata.id\""));
        assert!(body.contains("\"@odata.etag\""));
        assert!(!body.contains("\"Price\""));
        assert!(!body.contains("\"ID\""));
        assert!(body.find("\"Name\"").unwrap() < body.find("\"Version\"").unwrap());
    }

    #[test]
    fn test_expand_with_nested_projection_and_count() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let projection = Projection::all()
            .with_expand(Expansion::new("Category").with_projection(Projection::all().with_select(["Name"])))
            .with_expand(Expansion::new("Reviews").with_count(true));
        let options = RenderOptions::new(MetadataLevel::Minimal).with_projection(projection);
        let json = serializer
            .render_collection(&metadata, &[chai()], &options)
            .unwrap()
            .to_json()
            .unwrap();

        assert_eq!(
            json["@odata.context"],
            format!("{}/$metadata#Products(Category(Name),Reviews())", ROOT)
        );
        let entity = &json["value"][0];
        assert_eq!(
            entity["Category"],
            json!({"@odata.id": format!("{}/Categories(10)", ROOT), "Name": "Beverages"})
        );
        assert_eq!(entity["Reviews@odata.count"], 2);
        assert_eq!(entity["Reviews"][1]["@odata.id"], format!("{}/Reviews(101)", ROOT));
        assert_eq!(entity["Reviews"][1]["Rating"], 4);
    }

    #[test]
    fn test_expanded_missing_values() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let projection = Projection::all()
            .with_expand(Expansion::new("Category").with_count(true))
            .with_expand(Expansion::new("Reviews").with_count(true));
        let options = RenderOptions::new(MetadataLevel::None).with_projection(projection);
        let json = serializer
            .render_collection(&metadata, &[chang()], &options)
            .unwrap()
            .to_json()
            .unwrap();
        let entity = &json["value"][0];
        assert_eq!(entity["Category"], serde_json::Value::Null);
        assert_eq!(entity["Category@odata.count"], 0);
        assert_eq!(entity["Reviews"], json!([]));
        assert_eq!(entity["Reviews@odata.count"], 0);
    }

    #[test]
    fn test_unknown_navigation_target() {
        let registry = MetadataRegistry::new().with(products()).unwrap();
        let serializer = ResponseSerializer::new(Arc::new(registry), &ServiceConfig::new(ROOT));
        let metadata = metadata_of(&serializer, "Products");
        let options = RenderOptions::new(MetadataLevel::Minimal)
            .with_projection(Projection::all().with_expand(Expansion::new("Reviews")));
        let err = serializer
            .render_collection(&metadata, &[chai()], &options)
            .unwrap_err();
        assert!(matches!(err, SerializeError::UnknownEntity { .. }));
    }

    #[test]
    fn test_options_from_query() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let query = QueryOptions::parse("$select=Name&$expand=Category($select=Name)&$index").unwrap();
        let options = serializer.render_options(&query, Some("application/json;odata.metadata=full"));
        assert_eq!(options.level, MetadataLevel::Full);
        assert!(options.index);

        let json = serializer
            .render_collection(&metadata, &[chai()], &options)
            .unwrap()
            .to_json()
            .unwrap();
        let entity = &json["value"][0];
        assert_eq!(entity["@odata.index"], 0);
        assert_eq!(entity["Category"]["@odata.type"], "#Demo.Category");
        assert!(entity.get("Reviews@odata.navigationLink").is_none());
        assert!(entity.get("Price").is_none());
    }
}

mod record_view_tests {
    use super::*;

    #[derive(Serialize)]
    struct Category {
        #[serde(rename = "ID")]
        id: i64,
        #[serde(rename = "Name")]
        name: String,
    }

    #[derive(Serialize)]
    struct Product {
        #[serde(rename = "ID")]
        id: i64,
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Version")]
        version: i64,
        #[serde(rename = "Category")]
        category: Option<Category>,
    }

    #[test]
    fn test_typed_records() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let records = TypedRecord::collect(&[
            Product {
                id: 1,
                name: "Chai".to_string(),
                version: 3,
                category: Some(Category {
                    id: 10,
                    name: "Beverages".to_string(),
                }),
            },
            Product {
                id: 2,
                name: "Chang".to_string(),
                version: 1,
                category: None,
            },
        ])
        .unwrap();
        let options = RenderOptions::new(MetadataLevel::Minimal)
            .with_projection(Projection::all().with_expand(Expansion::new("Category")));
        let json = serializer
            .render_collection(&metadata, &records, &options)
            .unwrap()
            .to_json()
            .unwrap();

        assert_eq!(json["value"][0]["Category"]["Name"], "Beverages");
        assert_eq!(json["value"][1]["Category"], serde_json::Value::Null);
        assert_eq!(json["value"][1]["Price"], serde_json::Value::Null);
        assert_eq!(json["value"][0]["@odata.etag"], etag::from_canonical("3"));
    }

    #[test]
    fn test_wire_names() {
        let metadata = EntityMetadata::builder("Demo", "Person", "People")
            .descriptor(PropertyDescriptor::new("user_name", PropertyType::String).with_wire_name("UserName"))
            .descriptor(PropertyDescriptor::new("display_name", PropertyType::String).with_wire_name("DisplayName"))
            .key("user_name")
            .build()
            .unwrap();
        let registry = MetadataRegistry::new().with(metadata).unwrap();
        let serializer = ResponseSerializer::new(Arc::new(registry), &ServiceConfig::new(ROOT));
        let metadata = metadata_of(&serializer, "People");

        let record = FieldMap::new().with("user_name", "o'neil").with("display_name", "O'Neil");
        let response = serializer
            .render_entity(&metadata, &record, &RenderOptions::new(MetadataLevel::Minimal))
            .unwrap();
        let json = response.to_json().unwrap();
        assert_eq!(json["@odata.id"], format!("{}/People('o''neil')", ROOT));
        assert_eq!(json["UserName"], "o'neil");
        assert_eq!(json["DisplayName"], "O'Neil");
        assert!(json.get("user_name").is_none());
    }

    #[test]
    fn test_composite_key_id() {
        let metadata = EntityMetadata::builder("Demo", "OrderLine", "OrderLines")
            .property("OrderID", PropertyType::Int64)
            .property("Product", PropertyType::String)
            .key("OrderID")
            .key("Product")
            .build()
            .unwrap();
        let registry = MetadataRegistry::new().with(metadata).unwrap();
        let serializer = ResponseSerializer::new(Arc::new(registry), &ServiceConfig::new(ROOT));
        let metadata = metadata_of(&serializer, "OrderLines");
        let record = FieldMap::new().with("OrderID", 1).with("Product", "Chai");
        let json = serializer
            .render_entity(&metadata, &record, &RenderOptions::new(MetadataLevel::Minimal))
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(json["@odata.id"], format!("{}/OrderLines(OrderID=1,Product='Chai')", ROOT));
    }

    #[test]
    fn test_reserved_characters_in_key_are_encoded() {
        let metadata = EntityMetadata::builder("Demo", "Doc", "Docs")
            .property("Path", PropertyType::String)
            .navigation("Owner", "Person", Cardinality::One)
            .key("Path")
            .build()
            .unwrap();
        let registry = MetadataRegistry::new().with(metadata).unwrap();
        let serializer = ResponseSerializer::new(Arc::new(registry), &ServiceConfig::new(ROOT));
        let metadata = metadata_of(&serializer, "Docs");
        let record = FieldMap::new().with("Path", "a/b#c d");
        let json = serializer
            .render_entity(&metadata, &record, &RenderOptions::new(MetadataLevel::Full))
            .unwrap()
            .to_json()
            .unwrap();

        let id = format!("{}/Docs('a%2Fb%23c%20d')", ROOT);
        assert_eq!(json["@odata.id"], id);
        assert_eq!(json["Owner@odata.navigationLink"], format!("{}/Owner", id));

        let parsed = odata_protocol_sdk::parse_path(id.strip_prefix(ROOT).unwrap()).unwrap();
        assert_eq!(parsed.entity_set, "Docs");
        assert_eq!(parsed.key.as_deref(), Some("a/b#c d"));
    }

    #[test]
    fn test_unresolvable_key_degrades() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let record = FieldMap::new().with("Name", "Nameless");
        let json = serializer
            .render_entity(&metadata, &record, &RenderOptions::new(MetadataLevel::Full))
            .unwrap()
            .to_json()
            .unwrap();
        assert!(json.get("@odata.id").is_none());
        assert!(json.get("Category@odata.navigationLink").is_none());
        assert_eq!(json["@odata.type"], "#Demo.Product");
        assert_eq!(json["ID"], serde_json::Value::Null);
        assert_eq!(json["Name"], "Nameless");
    }
}

mod single_response_tests {
    use super::*;

    #[test]
    fn test_entity_etag_header() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let response = serializer
            .render_entity(&metadata, &chai(), &RenderOptions::new(MetadataLevel::Minimal))
            .unwrap();
        let json = response.to_json().unwrap();
        assert_eq!(
            json["@odata.context"],
            format!("{}/$metadata#Products/$entity", ROOT)
        );
        assert_eq!(response.headers.etag.as_deref(), json["@odata.etag"].as_str());

        let pairs = response.headers.to_pairs();
        assert!(pairs.iter().any(|(name, _)| *name == "ETag"));
        assert!(
            pairs
                .iter()
                .any(|(name, value)| *name == "Content-Length" && *value == response.body.len().to_string())
        );
    }

    #[test]
    fn test_entity_without_etag_property() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Categories");
        let record = FieldMap::new().with("ID", 10).with("Name", "Beverages");
        let response = serializer
            .render_entity(&metadata, &record, &RenderOptions::new(MetadataLevel::None))
            .unwrap();
        assert_eq!(response.body_str().unwrap(), r#"{"ID":10,"Name":"Beverages"}"#);
        assert!(response.headers.etag.is_none());
    }

    #[test]
    fn test_property_response() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let response = serializer
            .render_property(&metadata, &chai(), "Name", &RenderOptions::new(MetadataLevel::Minimal))
            .unwrap();
        assert_eq!(
            response.body_str().unwrap(),
            format!(r#"{{"@odata.context":"{}/$metadata#Products(1)/Name","value":"Chai"}}"#, ROOT)
        );

        let err = serializer
            .render_property(&metadata, &chai(), "Colour", &RenderOptions::default())
            .unwrap_err();
        assert!(matches!(err, SerializeError::UnknownProperty(_)));
    }

    #[test]
    fn test_references() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let nameless = FieldMap::new().with("Name", "Nameless");
        let json = serializer
            .render_references(&metadata, &[chai(), nameless, chang()], &RenderOptions::default())
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(json["@odata.context"], format!("{}/$metadata#Collection($ref)", ROOT));
        assert_eq!(
            json["value"],
            json!([
                {"@odata.id": format!("{}/Products(1)", ROOT)},
                {"@odata.id": format!("{}/Products(2)", ROOT)},
            ])
        );

        let single = serializer
            .render_reference(&metadata, &chai(), &RenderOptions::default())
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(
            single,
            json!({
                "@odata.context": format!("{}/$metadata#$ref", ROOT),
                "@odata.id": format!("{}/Products(1)", ROOT),
            })
        );
    }

    #[test]
    fn test_raw_value_text() {
        let serializer = serializer();
        let response = serializer.render_raw_value(&Value::from("Chai"));
        assert_eq!(response.body, b"Chai");
        assert_eq!(response.headers.content_type, "text/plain;charset=utf-8");
        assert_eq!(response.headers.content_length, 4);
    }
}

mod delta_tests {
    use super::*;

    #[test]
    fn test_change_feed_payload() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let tracker = ChangeTracker::new();
        tracker.register_entity("Products");
        let start = tracker.current_token("Products").unwrap();

        let key = FieldMap::new().with("ID", 2);
        tracker
            .record_change("Products", &key, Some(&chang()), ChangeKind::Added)
            .unwrap();
        tracker
            .record_change("Products", &FieldMap::new().with("ID", 1), None, ChangeKind::Deleted)
            .unwrap();

        let (events, next) = tracker.changes_since_token(&start).unwrap();
        let json = serializer
            .render_changes(&metadata, &events, &next, &RenderOptions::new(MetadataLevel::Minimal))
            .unwrap()
            .to_json()
            .unwrap();

        assert_eq!(json["@odata.context"], format!("{}/$metadata#Products/$delta", ROOT));
        assert_eq!(json["value"][0]["Name"], "Chang");
        assert_eq!(json["value"][0]["@odata.id"], format!("{}/Products(2)", ROOT));
        assert_eq!(json["value"][1]["@odata.removed"], json!({"reason": "deleted"}));
        assert_eq!(json["value"][1]["@odata.id"], format!("{}/Products(1)", ROOT));
        assert_eq!(json["value"][1]["ID"], 1);

        let delta_link = json["@odata.deltaLink"].as_str().unwrap();
        let token = delta_link
            .strip_prefix(&format!("{}/Products?$deltatoken=", ROOT))
            .unwrap();
        assert_eq!(DeltaToken::decode(token).unwrap(), DeltaToken::new("Products", 2));
        assert!(tracker.changes_since(token).unwrap().0.is_empty());
    }

    #[test]
    fn test_empty_change_feed() {
        let serializer = serializer();
        let metadata = metadata_of(&serializer, "Products");
        let token = DeltaToken::new("Products", 0);
        let json = serializer
            .render_changes(&metadata, &[], &token, &RenderOptions::new(MetadataLevel::None))
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(json["value"], json!([]));
        assert_eq!(json["@odata.deltaLink"], serializer.delta_link(&token));
    }
}

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_shared_serializer_across_threads() {
        let serializer = Arc::new(serializer());
        let expected = {
            let metadata = metadata_of(&serializer, "Products");
            serializer
                .render_collection(&metadata, &[chai(), chang()], &RenderOptions::default())
                .unwrap()
                .body
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let serializer = Arc::clone(&serializer);
                let expected = expected.clone();
                thread::spawn(move || {
                    let metadata = metadata_of(&serializer, "Products");
                    for _ in 0..25 {
                        let body = serializer
                            .render_collection(&metadata, &[chai(), chang()], &RenderOptions::default())
                            .unwrap()
                            .body;
                        assert_eq!(body, expected);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
