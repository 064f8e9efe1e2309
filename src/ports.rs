//! Collaborator ports.
//!
//! The storefront core talks to the outside world through four narrow
//! interfaces: a remote document store, an auth provider, an admin registry
//! and device-local key-value storage. Adapters live in [`crate::adapters`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::aggregates::Identity;
use crate::domain::value_objects::IdentityId;

pub const PRODUCTS_COLLECTION: &str = "products";
pub const CATEGORIES_COLLECTION: &str = "categories";
pub const ADMINS_COLLECTION: &str = "admins";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Subscription closed")]
    Closed,
}

/// Authentication failure, carrying the provider's message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage key rejected: {0}")]
    InvalidKey(String),
}

/// A stored record: its id plus its field map.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction { Asc, Desc }

/// A whole collection, ordered server-side by one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: String,
    pub direction: Direction,
}

impl CollectionQuery {
    pub fn new(collection: &str, order_by: &str, direction: Direction) -> Self {
        Self { collection: collection.to_string(), order_by: order_by.to_string(), direction }
    }
}

/// Field values for a create or partial update. Fields named in
/// `server_timestamps` are stamped by the store at write time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Map<String, Value>,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn new(fields: Map<String, Value>) -> Self { Self { fields, server_timestamps: vec![] } }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn server_timestamp(mut self, name: &str) -> Self {
        self.server_timestamps.push(name.to_string());
        self
    }
}

pub type Snapshot = Result<Vec<Document>, StoreError>;

/// A push feed plus the handle that releases it.
///
/// Cancellation runs exactly once: either through [`Subscription::cancel`] or,
/// failing that, when the subscription is dropped.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> Subscription<T> {
    pub fn new(rx: mpsc::UnboundedReceiver<T>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { rx, cancel: Some(Box::new(cancel)) }
    }

    /// Next delivered value, or `None` once the feed has been torn down.
    pub async fn next(&mut self) -> Option<T> { self.rx.recv().await }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<T> { self.rx.try_recv().ok() }

    pub fn cancel(mut self) { self.release(); }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.rx.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) { self.release(); }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Registers a listener that receives the complete ordered collection on
    /// every change, starting with the current contents.
    async fn subscribe(&self, query: CollectionQuery) -> Result<Subscription<Snapshot>, StoreError>;
    async fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, StoreError>;
    async fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), StoreError>;
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Delivers the current identity (or its absence) now and on every change.
    fn subscribe(&self) -> Subscription<Option<Identity>>;
}

#[async_trait]
pub trait AdminRegistry: Send + Sync {
    async fn is_admin(&self, id: &IdentityId) -> Result<bool, StoreError>;
}

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
