//! Registry client against a mocked Confluent REST API

use apache_avro::Schema;
use avro_registry_bridge::{RegistryClient, RegistryError, RegistryOptions};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";
const ORDER: &str = r#"{"type":"record","name":"Order","namespace":"com.example","fields":[{"name":"id","type":"long"}]}"#;

fn order() -> Schema {
    Schema::parse_str(ORDER).unwrap()
}

fn client_for(server: &ServerGuard) -> RegistryClient {
    let client = RegistryClient::new();
    client.configure(&RegistryOptions::new(server.url())).unwrap();
    client
}

#[test]
fn test_get_by_id() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/schemas/ids/1")
        .with_status(200)
        .with_header("content-type", CONTENT_TYPE)
        .with_body(json!({ "schema": ORDER }).to_string())
        .create();

    let client = client_for(&server);
    assert_eq!(client.get_by_id(1), Some(order()));
    mock.assert();
}

#[test]
fn test_get_by_subject_and_id_sends_subject() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/schemas/ids/7")
        .match_query(Matcher::UrlEncoded("subject".into(), "orders-value".into()))
        .with_status(200)
        .with_body(json!({ "schema": ORDER }).to_string())
        .create();

    let client = client_for(&server);
    assert_eq!(client.get_by_subject_and_id("orders-value", 7), Some(order()));
    mock.assert();
}

#[test]
fn test_lookup_failures_are_none() {
    let mut server = Server::new();
    server
        .mock("GET", "/schemas/ids/404")
        .with_status(404)
        .with_body(json!({ "error_code": 40403, "message": "Schema not found" }).to_string())
        .create();
    server
        .mock("GET", "/schemas/ids/500")
        .with_status(500)
        .with_body("internal error")
        .create();

    let client = client_for(&server);
    assert!(client.get_by_id(404).is_none());
    assert!(client.get_by_id(500).is_none());
}

#[test]
fn test_latest_entry() {
    let mut server = Server::new();
    server
        .mock("GET", "/subjects/orders-value/versions/latest")
        .with_status(200)
        .with_body(
            json!({ "subject": "orders-value", "version": 3, "id": 21, "schema": ORDER })
                .to_string(),
        )
        .create();

    let client = client_for(&server);
    let entry = client.get_latest_entry("orders-value").unwrap();
    assert_eq!((entry.version, entry.id), (3, 21));
    assert_eq!(entry.schema, order());
    assert_eq!(client.get_latest_version_id("orders-value"), Some(21));
}

#[test]
fn test_register() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/subjects/orders-value/versions")
        .match_header("content-type", CONTENT_TYPE)
        .match_body(Matcher::PartialJson(json!({ "schemaType": "AVRO" })))
        .with_status(200)
        .with_body(json!({ "id": 5 }).to_string())
        .create();

    let client = client_for(&server);
    assert_eq!(client.register_schema(&order(), "orders-value").unwrap(), 5);
    mock.assert();
}

#[test]
fn test_register_conflict_is_rejected() {
    let mut server = Server::new();
    server
        .mock("POST", "/subjects/orders-value/versions")
        .with_status(409)
        .with_body(json!({ "error_code": 409, "message": "Schema being registered is incompatible" }).to_string())
        .create();

    let client = client_for(&server);
    match client.register_schema(&order(), "orders-value") {
        Err(RegistryError::RegistryRejected(reason)) => assert!(reason.contains("incompatible")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_compatibility() {
    let mut server = Server::new();
    server
        .mock("POST", "/compatibility/subjects/orders-value/versions/latest")
        .with_status(200)
        .with_body(json!({ "is_compatible": false }).to_string())
        .create();
    server
        .mock("POST", "/compatibility/subjects/fresh-value/versions/latest")
        .with_status(404)
        .with_body(json!({ "error_code": 40401, "message": "Subject not found" }).to_string())
        .create();

    let client = client_for(&server);
    assert!(!client.is_compatible(&order(), "orders-value").unwrap());
    assert!(client.is_compatible(&order(), "fresh-value").unwrap());
}

#[test]
fn test_exists() {
    let mut server = Server::new();
    server
        .mock("GET", "/subjects/orders-value/versions")
        .with_status(200)
        .with_body("[1, 2]")
        .create();
    server
        .mock("GET", "/subjects/missing-value/versions")
        .with_status(404)
        .with_body(json!({ "error_code": 40401, "message": "Subject not found" }).to_string())
        .create();

    let client = client_for(&server);
    assert!(client.exists("orders-value"));
    assert_eq!(client.list_versions("orders-value"), Some(vec![1, 2]));
    assert!(!client.exists("missing-value"));
}

#[test]
fn test_basic_auth_header() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/schemas/ids/1")
        .match_header("authorization", "Basic ZnJlZDpsZXRtZWlu")
        .with_status(200)
        .with_body(json!({ "schema": ORDER }).to_string())
        .create();

    let mut options = RegistryOptions::new(server.url());
    options.basic_auth_user_info = Some("fred:letmein".to_string());
    let client = RegistryClient::new();
    client.configure(&options).unwrap();

    assert!(client.get_by_id(1).is_some());
    mock.assert();
}
