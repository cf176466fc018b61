//! Remote Object Cache.
//!
//! Every remote read the synchronizers make goes through [`AdManager`]:
//! - `find_one`: exact single-entity lookup, memoized per run
//! - `find_multi` / `find_multi_scoped` / `find_all_scoped`: batched reads, never memoized
//! - `create`: batch create
//!
//! The cache covers one pipeline run; `reset` starts the next one. Only
//! successful single lookups are stored; a miss raises [`ObjectNotFound`]
//! and is retried on the next call.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ObjectNotFound, RemoteError, SyncError};
use crate::service::{endpoints, AdManagerService, Endpoint, Statement};

// ---------------------------------------------------------------------------
// Lookup key + cache
// ---------------------------------------------------------------------------

/// Composite memoization key: endpoint plus the ordered field/value pairs.
///
/// Values are keyed by JSON text so `"1"` and `1` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupKey {
    pub endpoint: Endpoint,
    pub pairs: Vec<(String, String)>,
}

impl LookupKey {
    pub fn new(endpoint: Endpoint, pairs: &[(&str, Value)]) -> Self {
        Self {
            endpoint,
            pairs: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    entries: BTreeMap<LookupKey, Value>,
}

impl LookupCache {
    pub fn get(&self, key: &LookupKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: LookupKey, entity: Value) {
        self.entries.insert(key, entity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remote traffic counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemoteCallStats {
    pub queries: usize,
    pub creates: usize,
    pub objects_created: usize,
    pub cache_hits: usize,
}

impl RemoteCallStats {
    pub fn total_calls(&self) -> usize {
        self.queries + self.creates
    }
}

/// `id` of a remote entity.
pub fn entity_id(endpoint: Endpoint, entity: &Value) -> Result<Value, RemoteError> {
    entity
        .get("id")
        .cloned()
        .ok_or_else(|| RemoteError::Decode(format!("{endpoint}: entity has no id: {entity}")))
}

// ---------------------------------------------------------------------------
// AdManager: service + cache
// ---------------------------------------------------------------------------

pub struct AdManager<S> {
    service: S,
    cache: LookupCache,
    stats: RemoteCallStats,
}

impl<S: AdManagerService> AdManager<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            cache: LookupCache::default(),
            stats: RemoteCallStats::default(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Drop every memoized lookup and zero the counters.
    pub fn reset(&mut self) {
        self.cache = LookupCache::default();
        self.stats = RemoteCallStats::default();
    }

    pub fn stats(&self) -> RemoteCallStats {
        self.stats
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    async fn query(
        &mut self,
        endpoint: Endpoint,
        statement: &Statement,
    ) -> Result<Vec<Value>, RemoteError> {
        self.stats.queries += 1;
        let results = self.service.query(endpoint, statement).await?;
        debug!(
            endpoint = %endpoint,
            query = %statement.describe(),
            results = results.len(),
            "remote query"
        );
        Ok(results)
    }

    /// Exactly one entity matching every pair, memoized for the run.
    pub async fn find_one(
        &mut self,
        endpoint: Endpoint,
        pairs: &[(&str, Value)],
    ) -> Result<Value, SyncError> {
        let key = LookupKey::new(endpoint, pairs);
        if let Some(hit) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return Ok(hit.clone());
        }

        let statement = pairs
            .iter()
            .fold(Statement::new(), |st, (k, v)| st.and_eq(*k, v.clone()));
        let mut results = self.query(endpoint, &statement).await?;
        if results.len() != 1 {
            return Err(ObjectNotFound {
                endpoint,
                criteria: statement.describe(),
                matches: results.len(),
            }
            .into());
        }

        let entity = results.remove(0);
        self.cache.insert(key, entity.clone());
        Ok(entity)
    }

    /// All entities whose `key` is in `values`. An empty `values` list makes
    /// no remote call.
    pub async fn find_multi(
        &mut self,
        endpoint: Endpoint,
        key: &str,
        values: Vec<Value>,
    ) -> Result<Vec<Value>, SyncError> {
        self.find_multi_scoped(endpoint, &[], key, values).await
    }

    /// [`AdManager::find_multi`] additionally restricted by equality `scope`.
    pub async fn find_multi_scoped(
        &mut self,
        endpoint: Endpoint,
        scope: &[(&str, Value)],
        key: &str,
        values: Vec<Value>,
    ) -> Result<Vec<Value>, SyncError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let statement = scope
            .iter()
            .fold(Statement::new().and_in(key, values), |st, (k, v)| {
                st.and_eq(*k, v.clone())
            });
        Ok(self.query(endpoint, &statement).await?)
    }

    /// Every entity matching the equality `scope`.
    pub async fn find_all_scoped(
        &mut self,
        endpoint: Endpoint,
        scope: &[(&str, Value)],
    ) -> Result<Vec<Value>, SyncError> {
        let statement = scope
            .iter()
            .fold(Statement::new(), |st, (k, v)| st.and_eq(*k, v.clone()));
        Ok(self.query(endpoint, &statement).await?)
    }

    pub async fn create(
        &mut self,
        endpoint: Endpoint,
        objects: Vec<Value>,
    ) -> Result<Vec<Value>, SyncError> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let n = objects.len();
        self.stats.creates += 1;
        let created = self.service.create(endpoint, objects).await?;
        self.stats.objects_created += n;
        debug!(endpoint = %endpoint, requested = n, created = created.len(), "remote create");
        Ok(created)
    }

    // --- named resolvers ---------------------------------------------------

    pub async fn find_advertiser(&mut self, name: &str) -> Result<Value, SyncError> {
        self.find_one(endpoints::COMPANIES, &[("name", Value::from(name))])
            .await
    }

    pub async fn find_trafficker(&mut self, name: &str) -> Result<Value, SyncError> {
        self.find_one(endpoints::USERS, &[("name", Value::from(name))])
            .await
    }

    pub async fn find_order(&mut self, name: &str) -> Result<Value, SyncError> {
        self.find_one(endpoints::ORDERS, &[("name", Value::from(name))])
            .await
    }

    pub async fn find_targeting_key(&mut self, name: &str) -> Result<Value, SyncError> {
        self.find_one(endpoints::TARGETING_KEYS, &[("name", Value::from(name))])
            .await
    }

    pub async fn find_targeting_value(
        &mut self,
        key_id: &Value,
        name: &str,
    ) -> Result<Value, SyncError> {
        self.find_one(
            endpoints::TARGETING_VALUES,
            &[
                ("customTargetingKeyId", key_id.clone()),
                ("name", Value::from(name)),
            ],
        )
        .await
    }
}
