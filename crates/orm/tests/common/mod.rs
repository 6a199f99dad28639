//! Shared fixtures: an in-memory SQLite store, the entities mapped onto it
//! and a driver wrapper that counts executed statements.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use strata_orm::{
    CompiledQuery, DatabaseDriver, Entity, EntityDecl, ModelResult, OrmResult, PreparedStatement,
    PrimaryKeyColumns, QueryOutcome, SqlDialect, SqliteDriver, TableManager,
};

pub const SCHEMA: &str = r#"
CREATE TABLE projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    secret TEXT,
    created_at TEXT,
    updated_at TEXT
);
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER,
    name TEXT NOT NULL,
    email TEXT,
    age INTEGER
);
CREATE TABLE profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    bio TEXT
);
CREATE TABLE tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL
);
CREATE TABLE tags_users (
    user_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (user_id, tag_id)
);

INSERT INTO projects (id, name, secret) VALUES
    (1, 'Apollo', 's1'),
    (2, 'Gemini', 's2'),
    (3, 'Mercury', 's3');
INSERT INTO users (id, project_id, name, email, age) VALUES
    (1, 1, 'Ada', 'ada@example.org', 36),
    (2, 1, 'Grace', 'grace@example.org', 16),
    (3, 2, 'Linus', 'linus@example.org', 28),
    (4, 2, 'Ken', 'ken@example.org', 41),
    (5, NULL, 'Barbara', 'barbara@example.org', 52);
INSERT INTO profiles (id, user_id, bio) VALUES
    (1, 1, 'Analytical engines'),
    (2, 3, 'Kernels');
INSERT INTO tags (id, label) VALUES
    (1, 'rust'),
    (2, 'sql');
INSERT INTO tags_users (user_id, tag_id) VALUES
    (1, 1),
    (1, 2),
    (3, 1);
"#;

pub struct Project;

impl Entity for Project {
    fn declare(decl: &mut EntityDecl) {
        decl.has_many::<User>("users");
        decl.has_many::<User>("adults")
            .constrain(|users| users.where_gte("age", json!(18)));
        decl.getter("display_name", |record| {
            let name = record.value("name")?;
            Ok(json!(format!("Project {}", name.as_str().unwrap_or_default())))
        })
        .hidden(["secret", "updated_at"])
        .serialize(["secret", "display_name"]);
    }
}

pub struct User;

impl Entity for User {
    fn declare(decl: &mut EntityDecl) {
        decl.belongs_to::<Project>("project");
        decl.has_one::<Profile>("profile");
        decl.has_and_belongs_to_many::<Tag>("tags");
        decl.setter("email", |record, value| {
            let lowered = value.as_str().map(str::to_lowercase).map(Value::from).unwrap_or(value);
            record.set_column("email", lowered)
        })
        .property("nickname", Value::Null);
    }
}

pub struct Profile;

impl Entity for Profile {
    fn declare(decl: &mut EntityDecl) {
        decl.belongs_to::<User>("user");
        decl.serialize(["user"]);
    }
}

pub struct Tag;

impl Entity for Tag {
    fn declare(decl: &mut EntityDecl) {
        decl.has_and_belongs_to_many::<User>("users");
    }
}

/// Composite-key association rows
pub struct TagAssignment;

impl Entity for TagAssignment {
    fn table_name() -> Option<&'static str> {
        Some("tags_users")
    }

    fn declare(decl: &mut EntityDecl) {
        decl.has_many::<User>("members");
    }
}

/// Wraps a driver and counts the statements it runs
pub struct CountingDriver {
    inner: SqliteDriver,
    queries: AtomicUsize,
}

impl CountingDriver {
    pub fn new(inner: SqliteDriver) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseDriver for CountingDriver {
    async fn table_exists(&self, table: &str) -> OrmResult<bool> {
        self.inner.table_exists(table).await
    }

    async fn column_names(&self, table: &str) -> OrmResult<Vec<String>> {
        self.inner.column_names(table).await
    }

    async fn primary_keys(&self, table: &str) -> OrmResult<PrimaryKeyColumns> {
        self.inner.primary_keys(table).await
    }

    async fn prepare(&self, sql: &str) -> OrmResult<Box<dyn PreparedStatement>> {
        self.inner.prepare(sql).await
    }

    async fn run(&self, query: &CompiledQuery) -> OrmResult<QueryOutcome> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.run(query).await
    }

    async fn last_insert_id(&self) -> OrmResult<Value> {
        self.inner.last_insert_id().await
    }

    fn is_writable(&self) -> bool {
        self.inner.is_writable()
    }

    async fn begin_transaction(&self) -> OrmResult<bool> {
        self.inner.begin_transaction().await
    }

    async fn commit(&self) -> OrmResult<bool> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> OrmResult<bool> {
        self.inner.rollback().await
    }

    fn sql_dialect(&self) -> SqlDialect {
        self.inner.sql_dialect()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh seeded in-memory store
pub async fn seeded_driver() -> ModelResult<SqliteDriver> {
    let driver = SqliteDriver::in_memory().await?;
    driver.execute_script(SCHEMA).await?;
    Ok(driver)
}

/// Manager whose default connection is a counted, seeded store
pub async fn setup() -> (TableManager, Arc<CountingDriver>) {
    init_tracing();
    let driver = Arc::new(CountingDriver::new(
        seeded_driver().await.expect("seeded store"),
    ));
    let manager = TableManager::new();
    manager.set_connection("default", driver.clone());
    (manager, driver)
}
