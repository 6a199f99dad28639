mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use serde_json::json;
use strata_orm::{
    ActiveRecord, DatabaseDriver, Entity, ModelError, OrmConfig, Record, TableManager,
};

struct OrderLine;
impl Entity for OrderLine {}

struct Category;
impl Entity for Category {}

struct Archived;
impl Entity for Archived {
    fn table_name() -> Option<&'static str> {
        Some("projects")
    }

    fn connection() -> Option<&'static str> {
        Some("archive")
    }
}

#[tokio::test]
async fn test_table_names_are_inferred_from_class_names() {
    let manager = TableManager::new();
    assert_eq!(manager.entity::<OrderLine>().table_name(), "order_lines");
    assert_eq!(manager.entity::<Category>().table_name(), "categories");
    assert_eq!(manager.entity::<Project>().table_name(), "projects");
    assert_eq!(manager.entity::<TagAssignment>().table_name(), "tags_users");
}

#[tokio::test]
async fn test_tables_share_cached_schema() {
    let (manager, _) = setup().await;

    let first = manager.create::<User>(None).await.unwrap();
    let second = manager.create::<User>(None).await.unwrap();
    assert!(std::ptr::eq(first.schema(), second.schema()));
    assert!(std::ptr::eq(first.entity(), second.entity()));

    // fresh query state per table
    let filtered = first.create_select().where_eq("id", json!(1));
    assert!(filtered.query().is_some());
    assert!(second.query().is_none());
}

#[tokio::test]
async fn test_connection_factory_runs_once() {
    init_tracing();
    let manager = TableManager::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    manager.set_connection_factory("lazy", move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let driver = seeded_driver().await?;
            Ok::<_, ModelError>(Arc::new(driver) as Arc<dyn DatabaseDriver>)
        }
    });
    assert!(manager.has_connection("lazy"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let (a, b) = tokio::join!(
        manager.table("projects", Some("lazy")),
        manager.table("users", Some("lazy"))
    );
    a.unwrap();
    b.unwrap();
    manager.connection("lazy").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_schema_cache_is_per_connection() {
    init_tracing();
    let manager = TableManager::new();
    manager.set_connection("a", Arc::new(seeded_driver().await.unwrap()));
    manager.set_connection("a/b", Arc::new(seeded_driver().await.unwrap()));

    let nested = manager.table("projects", Some("a/b")).await.unwrap();
    let outer = manager.table("projects", Some("a")).await.unwrap();
    assert!(!std::ptr::eq(nested.schema(), outer.schema()));

    // replacing "a" leaves "a/b" cached
    manager.set_connection("a", Arc::new(seeded_driver().await.unwrap()));
    let again = manager.table("projects", Some("a/b")).await.unwrap();
    assert!(std::ptr::eq(nested.schema(), again.schema()));
    let reloaded = manager.table("projects", Some("a")).await.unwrap();
    assert!(!std::ptr::eq(outer.schema(), reloaded.schema()));
}

#[tokio::test]
async fn test_unknown_connection_and_table() {
    let (manager, _) = setup().await;

    assert!(matches!(
        manager.table("projects", Some("nowhere")).await,
        Err(ModelError::Configuration(_))
    ));
    assert!(matches!(
        manager.table("invoices", None).await,
        Err(ModelError::TableNotFound { .. })
    ));
    assert!(matches!(
        manager.create::<OrderLine>(None).await,
        Err(ModelError::TableNotFound { .. })
    ));
}

#[tokio::test]
async fn test_entity_connection_is_honoured() {
    let (manager, _) = setup().await;
    assert!(matches!(
        Archived::find(&manager).await,
        Err(ModelError::Configuration(_))
    ));

    manager.set_connection("archive", Arc::new(seeded_driver().await.unwrap()));
    let table = Archived::table(&manager).await.unwrap();
    assert_eq!(table.connection(), "archive");
    assert_eq!(table.name(), "projects");

    let explicit = manager.create::<Project>(Some("archive")).await.unwrap();
    assert_eq!(explicit.connection(), "archive");
}

#[tokio::test]
async fn test_named_registration() {
    let (manager, _) = setup().await;
    manager.register::<User>();

    let table = manager.create_named("User").await.unwrap();
    assert_eq!(table.name(), "users");
    assert_eq!(table.entity().class_name(), "User");

    assert!(matches!(
        manager.create_named("Ghost").await,
        Err(ModelError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_unbound_table_reads_plain_rows() {
    let (manager, _) = setup().await;

    let table = manager.table("users", None).await.unwrap();
    let records = table
        .clone()
        .create_select()
        .where_eq("project_id", json!(2))
        .all()
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.first().unwrap().class_name(), "users");

    let rows = table.create_select().where_null("project_id").rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&json!("Barbara")));
}

#[tokio::test]
async fn test_transaction_commits_on_success() {
    let (manager, _) = setup().await;

    let id = manager
        .transaction(None, |manager| async move {
            let mut project = Project::create(&manager).await?;
            project.set("name", "Voyager")?;
            project.save().await?;
            Ok::<_, ModelError>(project.key().cloned())
        })
        .await
        .unwrap();
    assert_eq!(id, Some(json!(4)));
    assert_eq!(Project::find(&manager).await.unwrap().count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_transaction_rolls_back_on_error() {
    let (manager, _) = setup().await;

    let result: Result<(), ModelError> = manager
        .transaction(None, |manager| async move {
            let table = Project::table(&manager).await?;
            let mut project = Record::new(&table);
            project.set("name", "Challenger")?;
            project.save().await?;
            Err::<(), _>(ModelError::UnsupportedOperation("abort".to_string()))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(Project::find(&manager).await.unwrap().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_configuration_drives_defaults() {
    let config = OrmConfig::default()
        .with_default_connection("main")
        .with_max_eager_depth(2);
    let manager = TableManager::with_config(config);
    manager.set_connection("main", Arc::new(seeded_driver().await.unwrap()));

    assert_eq!(manager.config().max_eager_depth, 2);
    let table = manager.create::<Project>(None).await.unwrap();
    assert_eq!(table.connection(), "main");

    assert_eq!(TableManager::global().config().max_eager_depth, 4);
}
