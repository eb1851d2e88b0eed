//! Encode and decode through the in-memory `mock://` registry

use avro_registry_bridge::config::keys;
use avro_registry_bridge::registry::{MemoryTransport, RegistryTransport};
use avro_registry_bridge::{
    resolver, wire, DataType, Direction, RecordDecoder, RecordEncoder, RegistryClient,
    RegistryConfig, RegistryError, RegistryOptions, StructField, StructuredValue,
};

fn order_type() -> DataType {
    DataType::Struct(vec![
        StructField::required("id", DataType::Long),
        StructField::optional("note", DataType::Text),
        StructField::required("hash", DataType::fixed(4)),
        StructField::required("tags", DataType::array(DataType::Text, false)),
    ])
}

fn order(id: i64) -> StructuredValue {
    StructuredValue::Struct(vec![
        id.into(),
        StructuredValue::Null,
        vec![1u8, 2, 3, 4].into(),
        StructuredValue::Array(vec!["new".into(), "priority".into()]),
    ])
}

fn config(scope: &str) -> RegistryConfig {
    RegistryConfig::new()
        .with(keys::REGISTRY_URL, format!("mock://{}", scope))
        .with(keys::TOPIC, "orders")
        .with(&keys::naming_strategy(Direction::Value), "topic.record.name")
        .with(&keys::record_name(Direction::Value), "Order")
        .with(&keys::record_namespace(Direction::Value), "com.example")
        .with(&keys::schema_id(Direction::Value), "latest")
}

#[test]
fn test_encode_then_decode_through_registry() {
    let config = config("e2e-roundtrip");
    let producer = RegistryClient::new();
    let mut encoder =
        RecordEncoder::new(&producer, &config, Direction::Value, order_type()).unwrap();
    assert_eq!(encoder.subject(), Some("orders-com.example.Order"));

    let bytes = encoder.encode(&order(42)).unwrap();
    let id = encoder.schema_id().unwrap();
    assert_eq!(wire::unframe(&bytes).unwrap().0, id);

    // a separate client on the same scope sees the registration
    let consumer = RegistryClient::new();
    let writer_schema = resolver::load_value_schema(&consumer, &config).unwrap();
    assert_eq!(&writer_schema, encoder.schema());

    let decoder = RecordDecoder::new(&consumer).with_reader_type(order_type());
    assert_eq!(decoder.decode(&bytes).unwrap(), order(42));

    MemoryTransport::drop_scope("e2e-roundtrip");
}

#[test]
fn test_key_and_value_subjects() {
    let config = config("e2e-keys")
        .with(&keys::naming_strategy(Direction::Key), "topic.name");
    let client = RegistryClient::new();

    let mut keys_encoder =
        RecordEncoder::new(&client, &config, Direction::Key, DataType::Text).unwrap();
    assert_eq!(keys_encoder.subject(), Some("orders-key"));
    let key_bytes = keys_encoder.encode(&"order-42".into()).unwrap();

    let decoder = RecordDecoder::new(&client).with_reader_type(DataType::Text);
    assert_eq!(decoder.decode(&key_bytes).unwrap(), StructuredValue::from("order-42"));
    assert!(client.exists("orders-key"));
    assert!(!client.exists("orders-value"));

    MemoryTransport::drop_scope("e2e-keys");
}

#[test]
fn test_schema_evolution_keeps_old_records_readable() {
    let config = config("e2e-evolution");
    let client = RegistryClient::new();

    let mut v1 = RecordEncoder::new(&client, &config, Direction::Value, order_type()).unwrap();
    let old_bytes = v1.encode(&order(1)).unwrap();

    let mut fields = match order_type() {
        DataType::Struct(fields) => fields,
        _ => unreachable!(),
    };
    fields.push(StructField::optional("channel", DataType::Text));
    let mut v2 =
        RecordEncoder::new(&client, &config, Direction::Value, DataType::Struct(fields)).unwrap();
    let mut new_value = match order(2) {
        StructuredValue::Struct(values) => values,
        _ => unreachable!(),
    };
    new_value.push("web".into());
    let new_bytes = v2.encode(&StructuredValue::Struct(new_value)).unwrap();

    assert_ne!(v1.schema_id(), v2.schema_id());
    assert_eq!(
        client.list_versions("orders-com.example.Order"),
        Some(vec![1, 2])
    );

    // each record decodes with its own writer schema
    let decoder = RecordDecoder::new(&client);
    assert_eq!(decoder.decode(&old_bytes).unwrap(), order(1));
    assert!(decoder.decode(&new_bytes).is_ok());

    MemoryTransport::drop_scope("e2e-evolution");
}

#[test]
fn test_breaking_change_is_rejected_on_first_encode() {
    let config = config("e2e-breaking");
    let client = RegistryClient::new();

    let mut v1 = RecordEncoder::new(&client, &config, Direction::Value, order_type()).unwrap();
    v1.encode(&order(1)).unwrap();

    let narrowed = DataType::Struct(vec![StructField::required("id", DataType::Integer)]);
    let mut v2 = RecordEncoder::new(&client, &config, Direction::Value, narrowed).unwrap();
    assert!(matches!(
        v2.encode(&StructuredValue::Struct(vec![1i32.into()])),
        Err(RegistryError::RegistryRejected(_))
    ));

    MemoryTransport::drop_scope("e2e-breaking");
}

#[test]
fn test_configure_twice_keeps_first_registry() {
    let client = RegistryClient::new();
    client.configure(&RegistryOptions::new("mock://e2e-first")).unwrap();
    client.configure(&RegistryOptions::new("mock://e2e-second")).unwrap();
    assert_eq!(client.configured_url().as_deref(), Some("mock://e2e-first"));

    let schema = apache_avro::Schema::parse_str(r#""string""#).unwrap();
    client.register_schema(&schema, "probe-value").unwrap();
    assert!(MemoryTransport::scope("e2e-first")
        .versions("probe-value")
        .is_ok());
    assert!(MemoryTransport::scope("e2e-second")
        .versions("probe-value")
        .is_err());

    MemoryTransport::drop_scope("e2e-first");
    MemoryTransport::drop_scope("e2e-second");
}

#[test]
fn test_unconfigured_lookup_is_none() {
    let client = RegistryClient::new();
    assert!(client.get_by_subject_and_id("orders-value", 7).is_none());
}

#[test]
fn test_fixed_size_mismatch_writes_nothing() {
    let mut encoder = RecordEncoder::without_registry(
        DataType::Struct(vec![StructField::required("hash", DataType::fixed(3))]),
        "Digest",
        "",
    )
    .unwrap();
    let result = encoder.encode(&StructuredValue::Struct(vec![vec![1u8, 2].into()]));
    assert!(matches!(
        result,
        Err(RegistryError::SizeMismatch {
            expected: 3,
            actual: 2
        })
    ));
}
