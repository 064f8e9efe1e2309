//! In-process collaborators: document store, auth provider and storage.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::aggregates::Identity;
use crate::ports::{
    AuthError, AuthProvider, CollectionQuery, Direction, Document, DocumentStore, DocumentWrite,
    KeyValueStorage, Snapshot, StorageError, StoreError, Subscription,
};

pub const USER_NOT_FOUND: &str = "There is no account for this email address.";
pub const WRONG_PASSWORD: &str = "The password is invalid.";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> { m.lock().unwrap_or_else(PoisonError::into_inner) }

// =============================================================================
// Document store
// =============================================================================

#[derive(Default)]
struct StoreInner {
    collections: HashMap<String, Vec<Document>>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    last_stamp: i64,
    unavailable: bool,
}

struct Listener {
    query: CollectionQuery,
    tx: mpsc::UnboundedSender<Snapshot>,
}

impl StoreInner {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable { Err(StoreError::Unavailable("document store offline".into())) } else { Ok(()) }
    }

    /// Server clock: wall time, forced strictly increasing.
    fn stamp(&mut self) -> i64 {
        self.last_stamp = Utc::now().timestamp_millis().max(self.last_stamp + 1);
        self.last_stamp
    }

    fn apply_write(&mut self, fields: &mut Map<String, Value>, write: DocumentWrite) {
        fields.extend(write.fields);
        for name in write.server_timestamps {
            let now = self.stamp();
            fields.insert(name, Value::from(now));
        }
    }

    fn notify(&mut self, collection: &str) {
        let collections = &self.collections;
        self.listeners.retain(|_, l| {
            l.query.collection != collection || l.tx.send(Ok(ordered(collections, &l.query))).is_ok()
        });
    }
}

fn ordered(collections: &HashMap<String, Vec<Document>>, query: &CollectionQuery) -> Vec<Document> {
    let mut docs = collections.get(&query.collection).cloned().unwrap_or_default();
    docs.sort_by(|a, b| {
        let o = compare_values(a.fields.get(&query.order_by), b.fields.get(&query.order_by));
        match query.direction { Direction::Asc => o, Direction::Desc => o.reverse() }
    });
    docs
}

/// Missing and null sort lowest, then booleans, numbers, strings, the rest.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Document store held in process memory, with ordered push subscriptions.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Writes a document under a caller-chosen id, replacing any existing one.
    pub fn insert(&self, collection: &str, id: &str, write: DocumentWrite) {
        let mut inner = lock(&self.inner);
        let mut fields = Map::new();
        inner.apply_write(&mut fields, write);
        let docs = inner.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.fields = fields,
            None => docs.push(Document { id: id.to_string(), fields }),
        }
        inner.notify(collection);
    }

    /// While unavailable, point operations and new subscriptions fail.
    pub fn set_available(&self, available: bool) { lock(&self.inner).unavailable = !available; }

    /// Delivers an error notification to every listener on `collection`.
    pub fn fail_listeners(&self, collection: &str, message: &str) {
        let inner = lock(&self.inner);
        for l in inner.listeners.values().filter(|l| l.query.collection == collection) {
            let _ = l.tx.send(Err(StoreError::Unavailable(message.to_string())));
        }
    }

    pub fn listener_count(&self) -> usize { lock(&self.inner).listeners.len() }

    pub fn document_count(&self, collection: &str) -> usize {
        lock(&self.inner).collections.get(collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn subscribe(&self, query: CollectionQuery) -> Result<Subscription<Snapshot>, StoreError> {
        let mut inner = lock(&self.inner);
        inner.check_available()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(ordered(&inner.collections, &query)));
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(id, Listener { query, tx });

        let weak: Weak<Mutex<StoreInner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        }))
    }

    async fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, StoreError> {
        let mut inner = lock(&self.inner);
        inner.check_available()?;
        let id = Uuid::now_v7().simple().to_string();
        let mut fields = Map::new();
        inner.apply_write(&mut fields, write);
        inner.collections.entry(collection.to_string()).or_default().push(Document { id: id.clone(), fields });
        inner.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        inner.check_available()?;
        let not_found = || StoreError::NotFound { collection: collection.to_string(), id: id.to_string() };
        let mut fields = inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| d.fields.clone())
            .ok_or_else(not_found)?;
        inner.apply_write(&mut fields, write);
        if let Some(doc) = inner.collections.get_mut(collection).and_then(|docs| docs.iter_mut().find(|d| d.id == id)) {
            doc.fields = fields;
        }
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        inner.check_available()?;
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        inner.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let inner = lock(&self.inner);
        inner.check_available()?;
        Ok(inner.collections.get(collection).and_then(|docs| docs.iter().find(|d| d.id == id)).cloned())
    }
}

// =============================================================================
// Auth provider
// =============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub password: String,
}

#[derive(Default)]
struct AuthInner {
    accounts: Vec<Account>,
    current: Option<Identity>,
    listeners: HashMap<u64, mpsc::UnboundedSender<Option<Identity>>>,
    next_listener: u64,
}

impl AuthInner {
    fn set_current(&mut self, identity: Option<Identity>) {
        self.current = identity;
        let current = &self.current;
        self.listeners.retain(|_, tx| tx.send(current.clone()).is_ok());
    }
}

/// Email/password accounts held in memory; one signed-in identity at a time.
#[derive(Clone, Default)]
pub struct MemoryAuthProvider {
    inner: Arc<Mutex<AuthInner>>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self { Self::default() }

    pub fn add_account(&self, uid: &str, email: &str, password: &str) {
        lock(&self.inner).accounts.push(Account { uid: uid.into(), email: email.into(), password: password.into() });
    }

    pub fn current(&self) -> Option<Identity> { lock(&self.inner).current.clone() }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut inner = lock(&self.inner);
        let account = inner.accounts.iter().find(|a| a.email.eq_ignore_ascii_case(email)).ok_or_else(|| AuthError::new(USER_NOT_FOUND))?;
        if account.password != password {
            return Err(AuthError::new(WRONG_PASSWORD));
        }
        let identity = Identity { id: account.uid.as_str().into(), email: Some(account.email.clone()) };
        inner.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        lock(&self.inner).set_current(None);
        Ok(())
    }

    fn subscribe(&self) -> Subscription<Option<Identity>> {
        let mut inner = lock(&self.inner);
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(inner.current.clone());
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(id, tx);
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        })
    }
}

// =============================================================================
// Key-value storage
// =============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> { Ok(lock(&self.values).get(key).cloned()) }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}
