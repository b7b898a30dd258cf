//! End-to-end scenarios against the in-memory backends

use hive::{
    AccessType, Hive, HiveConfig, HiveError, KeyType, KeyValue, MemoryConnectionSource,
    MemoryDirectoryProvider, MemoryMetadataStore, Node, PartitionDimension, Resource,
    SecondaryIndex, Status,
};
use std::sync::Arc;
use std::time::Duration;

async fn hive_with_user_dimension() -> Arc<Hive> {
    let hive = Hive::load_in_memory("hive://test").await.unwrap();
    hive.add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();
    hive.add_node("user", Node::new("n1", "db://a")).await.unwrap();
    hive
}

/// Adds the non-partitioning `weather` resource with a `city` index and a
/// record: resource id 7 under partition key 42, city "NY".
async fn with_weather_record(hive: &Hive) {
    hive.add_resource("user", Resource::new("weather", KeyType::Integer, false))
        .await
        .unwrap();
    hive.add_secondary_index("user", "weather", SecondaryIndex::new("city", KeyType::Text))
        .await
        .unwrap();
    hive.insert_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();
    hive.insert_resource_id("user", "weather", &KeyValue::from(7), &KeyValue::from(42))
        .await
        .unwrap();
    hive.insert_secondary_index_key(
        "user",
        "weather",
        "city",
        &KeyValue::from("NY"),
        &KeyValue::from(7),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_install_and_route() {
    let hive = hive_with_user_dimension().await;
    let node = hive
        .insert_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();

    let directory = hive.directory("user").unwrap();
    let node_ids = directory
        .node_ids_of_primary_index_key(&KeyValue::from(42))
        .await
        .unwrap();
    assert_eq!(node_ids, vec![node.id]);

    let conn = hive
        .connection_for_primary_key("user", &KeyValue::from(42), AccessType::Read)
        .await
        .unwrap();
    assert!(conn.read_only);
    assert_eq!(conn.node_id, node.id);
    assert_eq!(conn.uri, "db://a");
}

#[tokio::test]
async fn test_read_only_hive_blocks_writes() {
    let hive = hive_with_user_dimension().await;
    hive.insert_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();

    hive.update_hive_status(Status::ReadOnly).await.unwrap();
    assert_eq!(hive.status(), Status::ReadOnly);

    let err = hive
        .insert_primary_index_key("user", &KeyValue::from(43))
        .await
        .unwrap_err();
    assert!(err.is_read_only());

    // Reads still succeed; writes are refused at the connection layer too
    let conn = hive
        .connection_for_primary_key("user", &KeyValue::from(42), AccessType::Read)
        .await
        .unwrap();
    assert!(conn.read_only);

    let err = hive
        .connection_for_primary_key("user", &KeyValue::from(42), AccessType::ReadWrite)
        .await
        .unwrap_err();
    assert!(err.is_read_only());

    // Unlocking restores writability
    hive.update_hive_status(Status::Writable).await.unwrap();
    hive.insert_primary_index_key("user", &KeyValue::from(43))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_secondary_indexing() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;

    let directory = hive.directory("user").unwrap();
    let node_ids = directory
        .node_ids_of_secondary_index_key("weather", "city", &KeyValue::from("NY"))
        .await
        .unwrap();
    let expected = directory
        .node_ids_of_primary_index_key(&KeyValue::from(42))
        .await
        .unwrap();
    assert_eq!(node_ids, expected);

    let conn = hive
        .connection_for_secondary_key("user", "weather", "city", &KeyValue::from("NY"), AccessType::Read)
        .await
        .unwrap();
    assert_eq!(conn.uri, "db://a");
}

#[tokio::test]
async fn test_cascade_delete_of_primary_key() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;

    hive.delete_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();

    let directory = hive.directory("user").unwrap();
    assert!(!directory
        .does_primary_index_key_exist(&KeyValue::from(42))
        .await
        .unwrap());
    assert!(!directory
        .does_resource_id_exist("weather", &KeyValue::from(7))
        .await
        .unwrap());
    assert!(!directory
        .does_secondary_index_key_exist("weather", "city", &KeyValue::from("NY"), &KeyValue::from(7))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_partitioning_resource_equivalence() {
    let hive = hive_with_user_dimension().await;
    hive.add_resource("user", Resource::new("account", KeyType::Integer, true))
        .await
        .unwrap();

    // Inserting a resource id of a partitioning resource IS a primary-key
    // insertion.
    hive.insert_resource_id("user", "account", &KeyValue::from(99), &KeyValue::from(99))
        .await
        .unwrap();

    let directory = hive.directory("user").unwrap();
    assert!(directory
        .does_primary_index_key_exist(&KeyValue::from(99))
        .await
        .unwrap());
    assert_eq!(
        directory
            .primary_index_key_of_resource_id("account", &KeyValue::from(99))
            .await
            .unwrap(),
        Some(KeyValue::from(99))
    );
}

#[tokio::test]
async fn test_revision_convergence_between_processes() {
    let store = MemoryMetadataStore::new();
    store.install();
    let provider = MemoryDirectoryProvider::new();

    let process_a = Hive::load(
        HiveConfig::new("hive://shared"),
        store.gateways(),
        provider.clone(),
        MemoryConnectionSource::new(),
    )
    .await
    .unwrap();
    let process_b = Hive::load(
        HiveConfig::new("hive://shared"),
        store.gateways(),
        provider.clone(),
        MemoryConnectionSource::new(),
    )
    .await
    .unwrap();

    process_a
        .add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();
    assert_eq!(process_a.revision(), 1);
    assert_eq!(process_b.revision(), 0);

    process_b.sync().await.unwrap();
    assert_eq!(process_b.revision(), 1);
    assert!(process_b.snapshot().dimension("user").is_some());
}

#[tokio::test]
async fn test_background_daemon_converges() {
    let store = MemoryMetadataStore::new();
    store.install();
    let provider = MemoryDirectoryProvider::new();

    let process_a = Hive::load(
        HiveConfig::new("hive://shared"),
        store.gateways(),
        provider.clone(),
        MemoryConnectionSource::new(),
    )
    .await
    .unwrap();
    let process_b = Hive::load(
        HiveConfig::new("hive://shared").with_sync_interval(Duration::from_millis(5)),
        store.gateways(),
        provider.clone(),
        MemoryConnectionSource::new(),
    )
    .await
    .unwrap();
    let daemon = process_b.spawn_sync_daemon();

    process_a
        .add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(process_b.revision(), process_a.revision());
    daemon.shutdown().await;
}

#[tokio::test]
async fn test_revision_bumps_once_per_mutation() {
    let hive = Hive::load_in_memory("hive://test").await.unwrap();
    assert_eq!(hive.revision(), 0);

    hive.add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();
    assert_eq!(hive.revision(), 1);

    hive.add_node("user", Node::new("n1", "db://a")).await.unwrap();
    assert_eq!(hive.revision(), 2);

    hive.add_resource("user", Resource::new("weather", KeyType::Integer, false))
        .await
        .unwrap();
    assert_eq!(hive.revision(), 3);

    hive.delete_resource("user", "weather").await.unwrap();
    assert_eq!(hive.revision(), 4);
}

#[tokio::test]
async fn test_add_then_delete_restores_graph_modulo_revision() {
    let hive = hive_with_user_dimension().await;
    let before = hive.snapshot();

    hive.add_resource("user", Resource::new("weather", KeyType::Integer, false))
        .await
        .unwrap();
    hive.delete_resource("user", "weather").await.unwrap();

    let after = hive.snapshot();
    assert_eq!(after.dimensions, before.dimensions);
    assert_eq!(after.status, before.status);
    assert_eq!(after.revision, before.revision + 2);
}

#[tokio::test]
async fn test_key_read_only_round_trip() {
    let hive = hive_with_user_dimension().await;
    hive.insert_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();
    let directory = hive.directory("user").unwrap();

    hive.update_primary_index_key_read_only("user", &KeyValue::from(42), true)
        .await
        .unwrap();
    assert!(directory
        .read_only_of_primary_index_key(&KeyValue::from(42))
        .await
        .unwrap());
    // A read-only key cannot be deleted...
    let err = hive
        .delete_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap_err();
    assert!(err.is_read_only());

    // ...but it can be unlocked again, restoring writability
    hive.update_primary_index_key_read_only("user", &KeyValue::from(42), false)
        .await
        .unwrap();
    assert!(!directory
        .read_only_of_primary_index_key(&KeyValue::from(42))
        .await
        .unwrap());
    hive.delete_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_read_only_node_blocks_writes_to_its_keys() {
    let hive = hive_with_user_dimension().await;
    hive.insert_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();

    hive.update_node_status("user", "n1", Status::ReadOnly)
        .await
        .unwrap();

    let err = hive
        .connection_for_primary_key("user", &KeyValue::from(42), AccessType::ReadWrite)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HiveError::ReadOnly {
            scope: hive::LockScope::Node,
            ..
        }
    ));

    // No writable node is left for fresh keys either
    let err = hive
        .insert_primary_index_key("user", &KeyValue::from(43))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::NoWritableNode(_)));
}

#[tokio::test]
async fn test_boundary_errors() {
    let hive = hive_with_user_dimension().await;
    hive.add_resource("user", Resource::new("weather", KeyType::Integer, false))
        .await
        .unwrap();
    hive.add_secondary_index("user", "weather", SecondaryIndex::new("city", KeyType::Text))
        .await
        .unwrap();

    // Secondary key referencing a nonexistent resource id
    let err = hive
        .insert_secondary_index_key(
            "user",
            "weather",
            "city",
            &KeyValue::from("NY"),
            &KeyValue::from(7),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::MissingParent(_)));

    // Deleting an unknown primary key
    let err = hive
        .delete_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::NotFound(_)));

    // Duplicate metadata names
    let err = hive
        .add_resource("user", Resource::new("weather", KeyType::Integer, false))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::DuplicateName(_)));

    // Unknown names resolve to NotFound
    assert!(matches!(
        hive.insert_primary_index_key("absent", &KeyValue::from(1))
            .await
            .unwrap_err(),
        HiveError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_uninstalled_schema_fails_load() {
    let store = MemoryMetadataStore::new();
    let err = Hive::load(
        HiveConfig::new("hive://empty"),
        store.gateways(),
        MemoryDirectoryProvider::new(),
        MemoryConnectionSource::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HiveError::MetadataMissing(_)));
}

#[tokio::test]
async fn test_connection_counters_and_failures() {
    let store = MemoryMetadataStore::new();
    store.install();
    let source = MemoryConnectionSource::new();
    let hive = Hive::load(
        HiveConfig::new("hive://test").with_performance_monitoring(),
        store.gateways(),
        MemoryDirectoryProvider::new(),
        source.clone(),
    )
    .await
    .unwrap();
    hive.add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();
    hive.add_node("user", Node::new("n1", "db://a")).await.unwrap();
    hive.insert_primary_index_key("user", &KeyValue::from(42))
        .await
        .unwrap();

    hive.connection_for_primary_key("user", &KeyValue::from(42), AccessType::Read)
        .await
        .unwrap();
    hive.connection_for_primary_key("user", &KeyValue::from(42), AccessType::ReadWrite)
        .await
        .unwrap();

    source.set_failing(true);
    assert!(hive
        .connection_for_primary_key("user", &KeyValue::from(42), AccessType::Read)
        .await
        .is_err());

    let stats = hive.stats().unwrap();
    assert_eq!(stats.new_read_connections, 1);
    assert_eq!(stats.new_write_connections, 1);
    assert_eq!(stats.connection_failures, 1);
    assert!(stats.directory_write_count >= 1);
}

#[tokio::test]
async fn test_graph_matches_gateway_reconstruction_after_sync() {
    let store = MemoryMetadataStore::new();
    store.install();
    let hive = Hive::load(
        HiveConfig::new("hive://test"),
        store.gateways(),
        MemoryDirectoryProvider::new(),
        MemoryConnectionSource::new(),
    )
    .await
    .unwrap();

    hive.add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();
    hive.add_node("user", Node::new("n1", "db://a")).await.unwrap();
    hive.sync().await.unwrap();

    let reconstructed = hive_sync::load_graph(&store.gateways()).await.unwrap();
    assert_eq!(*hive.snapshot(), reconstructed);
}

#[tokio::test]
async fn test_update_primary_key_of_resource_id() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;
    hive.insert_primary_index_key("user", &KeyValue::from(50))
        .await
        .unwrap();

    let directory = hive.directory("user").unwrap();
    directory
        .update_primary_index_key_of_resource_id("weather", &KeyValue::from(7), &KeyValue::from(50))
        .await
        .unwrap();
    assert_eq!(
        directory
            .primary_index_key_of_resource_id("weather", &KeyValue::from(7))
            .await
            .unwrap(),
        Some(KeyValue::from(50))
    );

    // Secondary lookups now route through the new partition key
    let node_ids = directory
        .node_ids_of_secondary_index_key("weather", "city", &KeyValue::from("NY"))
        .await
        .unwrap();
    let expected = directory
        .node_ids_of_primary_index_key(&KeyValue::from(50))
        .await
        .unwrap();
    assert_eq!(node_ids, expected);
}

#[tokio::test]
async fn test_delete_resource_id_cascades_secondary_rows() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;
    let directory = hive.directory("user").unwrap();

    // A second record under the same secondary key must survive the delete
    hive.insert_resource_id("user", "weather", &KeyValue::from(8), &KeyValue::from(42))
        .await
        .unwrap();
    hive.insert_secondary_index_key(
        "user",
        "weather",
        "city",
        &KeyValue::from("NY"),
        &KeyValue::from(8),
    )
    .await
    .unwrap();

    directory
        .delete_resource_id("weather", &KeyValue::from(7))
        .await
        .unwrap();

    assert!(!directory
        .does_resource_id_exist("weather", &KeyValue::from(7))
        .await
        .unwrap());
    assert!(!directory
        .does_secondary_index_key_exist("weather", "city", &KeyValue::from("NY"), &KeyValue::from(7))
        .await
        .unwrap());
    assert!(directory
        .does_secondary_index_key_exist("weather", "city", &KeyValue::from("NY"), &KeyValue::from(8))
        .await
        .unwrap());

    // Deleting it again is an error, not a silent no-op
    let err = directory
        .delete_resource_id("weather", &KeyValue::from(7))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_resource_id_rejects_partitioning_resource() {
    let hive = hive_with_user_dimension().await;
    hive.add_resource("user", Resource::new("account", KeyType::Integer, true))
        .await
        .unwrap();
    hive.insert_resource_id("user", "account", &KeyValue::from(99), &KeyValue::from(99))
        .await
        .unwrap();

    // A partitioning resource's ids are partition keys; the resource-id
    // delete path refuses them
    let directory = hive.directory("user").unwrap();
    let err = directory
        .delete_resource_id("account", &KeyValue::from(99))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::NotFound(_)));

    hive.delete_primary_index_key("user", &KeyValue::from(99))
        .await
        .unwrap();
    assert!(!directory
        .does_primary_index_key_exist(&KeyValue::from(99))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_delete_secondary_index_key() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;
    let directory = hive.directory("user").unwrap();

    directory
        .delete_secondary_index_key("weather", "city", &KeyValue::from("NY"), &KeyValue::from(7))
        .await
        .unwrap();
    assert!(!directory
        .does_secondary_index_key_exist("weather", "city", &KeyValue::from("NY"), &KeyValue::from(7))
        .await
        .unwrap());
    // The resource row itself is untouched
    assert!(directory
        .does_resource_id_exist("weather", &KeyValue::from(7))
        .await
        .unwrap());

    let err = directory
        .delete_secondary_index_key("weather", "city", &KeyValue::from("NY"), &KeyValue::from(7))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::NotFound(_)));
}

#[tokio::test]
async fn test_resource_id_read_surface() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;
    hive.insert_secondary_index_key(
        "user",
        "weather",
        "city",
        &KeyValue::from("SF"),
        &KeyValue::from(7),
    )
    .await
    .unwrap();
    let directory = hive.directory("user").unwrap();

    let node_ids = directory
        .node_ids_of_resource_id("weather", &KeyValue::from(7))
        .await
        .unwrap();
    let expected = directory
        .node_ids_of_primary_index_key(&KeyValue::from(42))
        .await
        .unwrap();
    assert_eq!(node_ids, expected);

    let mut keys = directory
        .secondary_index_keys_of_resource_id("weather", "city", &KeyValue::from(7))
        .await
        .unwrap();
    keys.sort_by_key(|k| k.to_string());
    assert_eq!(keys, vec![KeyValue::from("NY"), KeyValue::from("SF")]);

    // Effective read-only of a resource id follows its partition key
    assert!(!directory
        .read_only_of_resource_id("weather", &KeyValue::from(7))
        .await
        .unwrap());
    hive.update_primary_index_key_read_only("user", &KeyValue::from(42), true)
        .await
        .unwrap();
    assert!(directory
        .read_only_of_resource_id("weather", &KeyValue::from(7))
        .await
        .unwrap());

    // Unknown ids resolve to NotFound, not a default
    let err = directory
        .read_only_of_resource_id("weather", &KeyValue::from(9))
        .await
        .unwrap_err();
    assert!(matches!(err, HiveError::NotFound(_)));
    assert!(directory
        .node_ids_of_resource_id("weather", &KeyValue::from(9))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_partition_dimension_cascades_metadata() {
    let hive = hive_with_user_dimension().await;
    with_weather_record(&hive).await;

    hive.delete_partition_dimension("user").await.unwrap();
    assert!(hive.snapshot().dimension("user").is_none());
    assert!(matches!(
        hive.directory("user").unwrap_err(),
        HiveError::NotFound(_)
    ));

    // Re-adding the dimension starts from empty directory tables
    hive.add_partition_dimension(PartitionDimension::new("user", KeyType::Integer))
        .await
        .unwrap();
    let directory = hive.directory("user").unwrap();
    assert!(!directory
        .does_primary_index_key_exist(&KeyValue::from(42))
        .await
        .unwrap());
}
