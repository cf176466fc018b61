//! In-memory ad platform.
//!
//! Deterministic stand-in for the remote service: queries are evaluated
//! against stored entities with the same predicate semantics the gateway
//! uses, creates assign sequential ids and a few server-managed fields.
//! No network I/O.
//!
//! Clones share state, so a test can hand one clone to a pipeline and keep
//! another for seeding and inspection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use gasp_admanager::{endpoints, AdManagerService, Endpoint, RemoteError, Statement};
use serde_json::{json, Map, Value};

/// Entity collections held by the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Companies,
    Users,
    Orders,
    LineItems,
    Creatives,
    Associations,
    TargetingKeys,
    TargetingValues,
}

impl Collection {
    pub fn for_endpoint(endpoint: Endpoint) -> Option<Self> {
        let c = match endpoint {
            e if e == endpoints::COMPANIES => Collection::Companies,
            e if e == endpoints::USERS => Collection::Users,
            e if e == endpoints::ORDERS || e == endpoints::CREATE_ORDERS => Collection::Orders,
            e if e == endpoints::LINE_ITEMS || e == endpoints::CREATE_LINE_ITEMS => {
                Collection::LineItems
            }
            e if e == endpoints::CREATIVES || e == endpoints::CREATE_CREATIVES => {
                Collection::Creatives
            }
            e if e == endpoints::ASSOCIATIONS || e == endpoints::CREATE_ASSOCIATIONS => {
                Collection::Associations
            }
            e if e == endpoints::TARGETING_KEYS => Collection::TargetingKeys,
            e if e == endpoints::TARGETING_VALUES => Collection::TargetingValues,
            _ => return None,
        };
        Some(c)
    }

    /// Fields the platform fills in on create.
    fn server_fields(&self) -> Map<String, Value> {
        let v = match self {
            Collection::Orders => json!({"status": "DRAFT", "isArchived": false}),
            Collection::LineItems => json!({"status": "DRAFT", "isArchived": false}),
            Collection::Creatives => json!({"previewUrl": "https://preview.invalid/creative"}),
            Collection::Associations => json!({"status": "ACTIVE"}),
            _ => json!({}),
        };
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub endpoint: Endpoint,
    pub statement: Statement,
    pub results: usize,
}

#[derive(Debug, Clone)]
pub struct RecordedCreate {
    pub endpoint: Endpoint,
    pub objects: Vec<Value>,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    entities: BTreeMap<Collection, Vec<Value>>,
    queries: Vec<RecordedQuery>,
    creates: Vec<RecordedCreate>,
    failures: BTreeMap<Endpoint, RemoteError>,
}

impl FakeState {
    fn assign_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

#[derive(Clone, Default)]
pub struct FakeAdManager {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAdManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    // --- seeding ------------------------------------------------------------

    /// Store `entity` as-is, adding an `id` when it has none. Returns the id.
    pub fn insert(&self, collection: Collection, mut entity: Value) -> u64 {
        let mut st = self.state();
        let id = match entity.get("id").and_then(Value::as_u64) {
            Some(id) => id,
            None => {
                let id = st.assign_id();
                entity["id"] = json!(id);
                id
            }
        };
        st.entities.entry(collection).or_default().push(entity);
        id
    }

    pub fn seed_company(&self, name: &str) -> u64 {
        self.insert(
            Collection::Companies,
            json!({"name": name, "type": "ADVERTISER"}),
        )
    }

    pub fn seed_user(&self, name: &str) -> u64 {
        self.insert(
            Collection::Users,
            json!({"name": name, "email": format!("{}@example.invalid", name.to_lowercase())}),
        )
    }

    pub fn seed_targeting_key(&self, name: &str) -> u64 {
        self.insert(
            Collection::TargetingKeys,
            json!({"name": name, "type": "PREDEFINED"}),
        )
    }

    pub fn seed_targeting_value(&self, key_id: u64, name: &str) -> u64 {
        self.insert(
            Collection::TargetingValues,
            json!({"customTargetingKeyId": key_id, "name": name, "matchType": "EXACT"}),
        )
    }

    /// Make every subsequent call to `endpoint` fail with `err`.
    pub fn fail_on(&self, endpoint: Endpoint, err: RemoteError) {
        self.state().failures.insert(endpoint, err);
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    // --- inspection ---------------------------------------------------------

    pub fn entities(&self, collection: Collection) -> Vec<Value> {
        self.state()
            .entities
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_by_name(&self, collection: Collection, name: &str) -> Option<Value> {
        self.entities(collection)
            .into_iter()
            .find(|e| e.get("name").and_then(Value::as_str) == Some(name))
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state().queries.clone()
    }

    pub fn creates(&self) -> Vec<RecordedCreate> {
        self.state().creates.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state().queries.len()
    }

    pub fn queries_to(&self, endpoint: Endpoint) -> usize {
        self.state()
            .queries
            .iter()
            .filter(|q| q.endpoint == endpoint)
            .count()
    }

    pub fn create_count(&self) -> usize {
        self.state().creates.len()
    }

    pub fn creates_to(&self, endpoint: Endpoint) -> Vec<RecordedCreate> {
        self.state()
            .creates
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Forget recorded calls; stored entities are kept.
    pub fn reset_log(&self) {
        let mut st = self.state();
        st.queries.clear();
        st.creates.clear();
    }
}

fn unknown_endpoint(endpoint: Endpoint) -> RemoteError {
    RemoteError::Api {
        status: Some(404),
        message: format!("{endpoint}: unknown endpoint"),
    }
}

#[async_trait]
impl AdManagerService for FakeAdManager {
    async fn query(
        &self,
        endpoint: Endpoint,
        statement: &Statement,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut st = self.state();
        if let Some(err) = st.failures.get(&endpoint) {
            return Err(err.clone());
        }
        let collection = Collection::for_endpoint(endpoint).ok_or_else(|| unknown_endpoint(endpoint))?;

        let results: Vec<Value> = st
            .entities
            .get(&collection)
            .map(|all| all.iter().filter(|e| statement.matches(e)).cloned().collect())
            .unwrap_or_default();

        st.queries.push(RecordedQuery {
            endpoint,
            statement: statement.clone(),
            results: results.len(),
        });
        Ok(results)
    }

    async fn create(
        &self,
        endpoint: Endpoint,
        objects: Vec<Value>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut st = self.state();
        if let Some(err) = st.failures.get(&endpoint) {
            return Err(err.clone());
        }
        let collection = Collection::for_endpoint(endpoint).ok_or_else(|| unknown_endpoint(endpoint))?;

        st.creates.push(RecordedCreate {
            endpoint,
            objects: objects.clone(),
        });

        let mut created = Vec::with_capacity(objects.len());
        for obj in objects {
            let Value::Object(mut fields) = obj else {
                return Err(RemoteError::Api {
                    status: Some(400),
                    message: format!("{endpoint}: object expected"),
                });
            };
            // the discriminator selects the remote type; it is not stored
            fields.remove("xsi_type");
            for (k, v) in collection.server_fields() {
                fields.entry(k).or_insert(v);
            }
            if collection != Collection::Associations {
                let id = st.assign_id();
                fields.insert("id".into(), json!(id));
            }
            let entity = Value::Object(fields);
            st.entities
                .entry(collection)
                .or_default()
                .push(entity.clone());
            created.push(entity);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_ids_and_strips_discriminator() {
        let fake = FakeAdManager::new();
        let out = fake
            .create(
                endpoints::CREATE_CREATIVES,
                vec![json!({"xsi_type": "ThirdPartyCreative", "name": "C"})],
            )
            .await
            .unwrap();
        assert!(out[0].get("id").is_some());
        assert!(out[0].get("xsi_type").is_none());
        assert!(fake.find_by_name(Collection::Creatives, "C").is_some());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let fake = FakeAdManager::new();
        let other = fake.clone();
        other.seed_company("Acme");

        let st = Statement::new().and_eq("name", json!("Acme"));
        let out = fake.query(endpoints::COMPANIES, &st).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(other.query_count(), 1);
    }

    #[tokio::test]
    async fn injected_failure_is_returned() {
        let fake = FakeAdManager::new();
        fake.fail_on(
            endpoints::USERS,
            RemoteError::Transport("connection reset".into()),
        );
        let err = fake
            .query(endpoints::USERS, &Statement::new())
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Transport("connection reset".into()));
    }
}
