//! Builder for configuring cache instances

use std::sync::Arc;

use super::ResourceCache;
use crate::api::{ResourceApi, RestClient};
use crate::config::{ApiConfig, CacheConfig, Config};
use crate::coordinator::{Coordinator, Shared};
use crate::schema::Schema;
use crate::store::CacheStore;
use crate::{CacheError, Result};

/// Builder for configuring [`ResourceCache`] instances.
///
/// ```rust,no_run
/// use rescache::{ApiConfig, ResourceCache};
///
/// #[tokio::main]
/// async fn main() -> rescache::Result<()> {
///     let cache = ResourceCache::builder()
///         .rest(ApiConfig::new().base_url("https://api.glitch.com"))
///         .build()?;
///
///     let project = cache.load("project", "hello-express").await?;
///     println!("{project:?}");
///     Ok(())
/// }
/// ```
pub struct ResourceCacheBuilder {
    schema: Schema,
    config: CacheConfig,
    api: Option<Arc<dyn ResourceApi>>,
    api_config: Option<ApiConfig>,
}

impl ResourceCacheBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema::community(),
            config: CacheConfig::default(),
            api: None,
            api_config: None,
        }
    }

    /// Replace the default community schema.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Set TTL, windows and batch size.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom API implementation.
    pub fn api(mut self, api: Arc<dyn ResourceApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Talk to the REST API with the given settings.
    ///
    /// Ignored if [`api`](Self::api) is also set.
    pub fn rest(mut self, config: ApiConfig) -> Self {
        self.api_config = Some(config);
        self
    }

    /// Apply settings loaded from a config file.
    pub fn from_config(self, config: Config) -> Self {
        self.config(config.cache).rest(config.api)
    }

    /// Build the cache and spawn its coordinator task.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn build(self) -> Result<ResourceCache> {
        self.config.validate()?;
        let schema = Arc::new(self.schema);

        let api: Arc<dyn ResourceApi> = match (self.api, self.api_config) {
            (Some(api), _) => api,
            (None, Some(api_config)) => Arc::new(RestClient::new(&api_config, Arc::clone(&schema))?),
            (None, None) => return Err(CacheError::NoApi),
        };

        let store = CacheStore::new(schema).with_ttl(self.config.ttl);
        let shared = Arc::new(Shared::new(store));
        let commands = Coordinator::spawn(Arc::clone(&shared), api, self.config);
        Ok(ResourceCache::new(shared, commands))
    }
}

impl Default for ResourceCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
