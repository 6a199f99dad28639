//! Table Manager - entity to table resolution with shared caches
//!
//! The manager owns three write-once caches: entity metadata per entity
//! type, driver instances per connection name, and table schema per
//! (connection, table). Every [`Table`] it returns is a fresh value sharing
//! the cached schema, so query state never leaks between callers.
//!
//! Schemas are cached rather than whole tables because a table holds the
//! manager; caching tables inside the manager would make the two keep each
//! other alive.

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tokio::sync::OnceCell;

use crate::backends::DatabaseDriver;
use crate::config::OrmConfig;
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, EntityMeta};
use crate::relationships::TargetEntity;
use crate::table::{Table, TableSchema};
use crate::BoxFuture;

type DriverFactory = Box<dyn Fn() -> BoxFuture<'static, ModelResult<Arc<dyn DatabaseDriver>>> + Send + Sync>;

/// A named connection: a ready driver, or a factory run on first use
struct ConnectionSlot {
    driver: OnceCell<Arc<dyn DatabaseDriver>>,
    factory: Option<DriverFactory>,
}

struct ManagerInner {
    config: OrmConfig,
    entities: DashMap<TypeId, Arc<EntityMeta>>,
    anonymous: DashMap<String, Arc<EntityMeta>>,
    registry: DashMap<String, TargetEntity>,
    connections: DashMap<String, Arc<ConnectionSlot>>,
    /// Keyed by (connection, table)
    schemas: DashMap<(String, String), Arc<OnceCell<Arc<TableSchema>>>>,
}

/// Registry mapping entities to ready-to-use tables
#[derive(Clone)]
pub struct TableManager {
    inner: Arc<ManagerInner>,
}

static GLOBAL: Lazy<TableManager> = Lazy::new(TableManager::new);

impl Default for TableManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TableManager {
    /// Manager with default configuration
    pub fn new() -> Self {
        Self::with_config(OrmConfig::default())
    }

    pub fn with_config(config: OrmConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                entities: DashMap::new(),
                anonymous: DashMap::new(),
                registry: DashMap::new(),
                connections: DashMap::new(),
                schemas: DashMap::new(),
            }),
        }
    }

    /// Process-wide manager with default configuration
    pub fn global() -> &'static TableManager {
        &GLOBAL
    }

    pub fn config(&self) -> &OrmConfig {
        &self.inner.config
    }

    /// Register a ready driver under `name`, replacing any previous one
    pub fn set_connection(&self, name: &str, driver: Arc<dyn DatabaseDriver>) {
        self.replace_slot(
            name,
            ConnectionSlot {
                driver: OnceCell::new_with(Some(driver)),
                factory: None,
            },
        );
    }

    /// Register a factory run once, on first use of `name`
    pub fn set_connection_factory<F, Fut>(&self, name: &str, factory: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ModelResult<Arc<dyn DatabaseDriver>>> + Send + 'static,
    {
        let factory: DriverFactory = Box::new(move || Box::pin(factory()));
        self.replace_slot(
            name,
            ConnectionSlot {
                driver: OnceCell::new(),
                factory: Some(factory),
            },
        );
    }

    fn replace_slot(&self, name: &str, slot: ConnectionSlot) {
        self.inner.connections.insert(name.to_string(), Arc::new(slot));
        self.inner.schemas.retain(|(connection, _), _| connection != name);
    }

    pub fn has_connection(&self, name: &str) -> bool {
        self.inner.connections.contains_key(name)
    }

    /// Driver registered under `name`, instantiating it on first use
    pub async fn connection(&self, name: &str) -> ModelResult<Arc<dyn DatabaseDriver>> {
        let slot = self
            .inner
            .connections
            .get(name)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| ModelError::Configuration(format!("Unknown connection '{}'", name)))?;

        let driver = slot
            .driver
            .get_or_try_init(|| async {
                match &slot.factory {
                    Some(factory) => {
                        tracing::info!("Instantiating connection '{}' from its factory", name);
                        factory().await
                    }
                    None => Err(ModelError::Configuration(format!(
                        "Connection '{}' has neither a driver nor a factory",
                        name
                    ))),
                }
            })
            .await?;

        Ok(Arc::clone(driver))
    }

    /// Metadata of `E`, collected on first use
    pub fn entity<E: Entity>(&self) -> Arc<EntityMeta> {
        let type_id = TypeId::of::<E>();
        if let Some(meta) = self.inner.entities.get(&type_id) {
            return Arc::clone(meta.value());
        }

        let meta = Arc::new(EntityMeta::of::<E>());
        Arc::clone(self.inner.entities.entry(type_id).or_insert(meta).value())
    }

    /// Make `E` reachable through [`create_named`](Self::create_named)
    pub fn register<E: Entity>(&self) {
        self.inner
            .registry
            .insert(E::class_name().to_string(), TargetEntity::of::<E>());
    }

    /// Table for the entity registered under `class_name`
    pub async fn create_named(&self, class_name: &str) -> ModelResult<Table> {
        let target = self
            .inner
            .registry
            .get(class_name)
            .map(|entry| *entry.value())
            .ok_or_else(|| {
                ModelError::Configuration(format!("Entity class '{}' is not registered", class_name))
            })?;
        target.open_table(self).await
    }

    /// Table bound to `E` on `connection`, or on the entity's own
    /// connection, or on the default one
    pub async fn create<E: Entity>(&self, connection: Option<&str>) -> ModelResult<Table> {
        let entity = self.entity::<E>();
        let connection = connection
            .or(entity.connection())
            .unwrap_or(&self.inner.config.default_connection)
            .to_string();

        let driver = self.connection(&connection).await?;
        let schema = self.schema(&connection, entity.table_name(), &driver).await?;
        Ok(Table::new(schema, driver, self.clone(), entity, &connection))
    }

    /// Table with no entity bound
    pub async fn table(&self, name: &str, connection: Option<&str>) -> ModelResult<Table> {
        let connection = connection
            .unwrap_or(&self.inner.config.default_connection)
            .to_string();
        let entity = Arc::clone(
            self.inner
                .anonymous
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(EntityMeta::anonymous(name)))
                .value(),
        );

        let driver = self.connection(&connection).await?;
        let schema = self.schema(&connection, name, &driver).await?;
        Ok(Table::new(schema, driver, self.clone(), entity, &connection))
    }

    async fn schema(
        &self,
        connection: &str,
        table: &str,
        driver: &Arc<dyn DatabaseDriver>,
    ) -> ModelResult<Arc<TableSchema>> {
        let cell = Arc::clone(
            self.inner
                .schemas
                .entry((connection.to_string(), table.to_string()))
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let schema = cell
            .get_or_try_init(|| async { TableSchema::load(driver.as_ref(), table).await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(schema))
    }

    /// Run `f` inside a transaction on `connection`: commit on `Ok`,
    /// roll back on `Err`
    pub async fn transaction<F, Fut, T>(&self, connection: Option<&str>, f: F) -> ModelResult<T>
    where
        F: FnOnce(TableManager) -> Fut,
        Fut: Future<Output = ModelResult<T>>,
    {
        let name = connection
            .unwrap_or(&self.inner.config.default_connection)
            .to_string();
        let driver = self.connection(&name).await?;

        driver.begin_transaction().await?;
        match f(self.clone()).await {
            Ok(value) => {
                driver.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = driver.rollback().await {
                    tracing::warn!("Rollback on '{}' failed: {}", name, rollback_err);
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for TableManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connections: Vec<String> = self
            .inner
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        f.debug_struct("TableManager")
            .field("config", &self.inner.config)
            .field("connections", &connections)
            .field("entities", &self.inner.entities.len())
            .field("schemas", &self.inner.schemas.len())
            .finish()
    }
}
