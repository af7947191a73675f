//! Integration tests for the Postgres entity store
//!
//! These tests need a running PostgreSQL database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use gameboard_api::domain::agent::{Agent, AgentRole, AgentState, Position, ProviderConfig};
use gameboard_api::domain::block::Block;
use gameboard_api::domain::repositories::{EntityKind, EntityStore, Records};
use gameboard_api::domain::zone::{Zone, ZoneType};
use gameboard_api::infrastructure::repositories::PostgresEntityStore;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Set up test database connection pool and schema
async fn setup_store() -> PostgresEntityStore {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    let store = PostgresEntityStore::new(pool);
    store.migrate().await.expect("Failed to migrate");
    store
}

#[tokio::test]
#[ignore]
async fn test_put_get_delete_roundtrip() {
    let store = setup_store().await;
    let id = format!("test_{}", uuid::Uuid::new_v4().simple());

    store
        .put(EntityKind::Layout, &id, json!({"title": "A"}))
        .await
        .unwrap();
    store
        .put(EntityKind::Layout, &id, json!({"title": "B"}))
        .await
        .unwrap();

    let found = store.get(EntityKind::Layout, &id).await.unwrap().unwrap();
    assert_eq!(found["title"], "B");

    assert!(store.delete(EntityKind::Layout, &id).await.unwrap());
    assert!(!store.delete(EntityKind::Layout, &id).await.unwrap());
    assert!(store.get(EntityKind::Layout, &id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_kinds_are_isolated() {
    let store = setup_store().await;
    let id = format!("test_{}", uuid::Uuid::new_v4().simple());

    store.put(EntityKind::Agent, &id, json!({"a": 1})).await.unwrap();

    assert!(store.get(EntityKind::Layout, &id).await.unwrap().is_none());
    store.delete(EntityKind::Agent, &id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_agent_records_through_typed_view() {
    let records = Records::new(Arc::new(setup_store().await));
    let mut agent = Agent::spawn(
        AgentRole::Reviewer,
        None,
        ProviderConfig::default(),
        Position::new(50.0, 50.0),
    );
    records.save_agent(&agent).await.unwrap();

    agent.move_to(Position::new(5.0, 6.0));
    records.save_agent(&agent).await.unwrap();

    let loaded = records.find_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(loaded.state, AgentState::Idle);
    assert_eq!(loaded.position, Position::new(5.0, 6.0));
    assert_eq!(loaded.role, AgentRole::Reviewer);

    assert!(records.delete_agent(&agent.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_blocks_and_zones_persist() {
    let records = Records::new(Arc::new(setup_store().await));

    let saved = records
        .replace_blocks(vec![Block::new("Website", "landing page")])
        .await
        .unwrap();
    let found = records.find_block(&saved[0].id).await.unwrap().unwrap();
    assert_eq!(found.title, "Website");

    let layout = vec![Zone::new("drop-1", 0.0, 0.0, 100.0, 100.0, ZoneType::DropOff)];
    records.save_zones(&layout).await.unwrap();
    assert_eq!(records.load_zones().await.unwrap(), layout);

    records.replace_blocks(Vec::new()).await.unwrap();
    assert!(records.find_block(&saved[0].id).await.unwrap().is_none());
}
