//! Seed file for the in-process collaborators.
//!
//! ```json
//! {
//!   "categories": [{ "name": "Lighting" }],
//!   "products": [{ "id": "lamp", "name": "Lamp", "price": 500, "category": "Lighting" }],
//!   "admins": ["u-admin"],
//!   "accounts": [{ "uid": "u-admin", "email": "admin@shop.test", "password": "..." }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::memory::{Account, MemoryAuthProvider, MemoryDocumentStore};
use crate::ports::{DocumentWrite, ADMINS_COLLECTION, CATEGORIES_COLLECTION, PRODUCTS_COLLECTION};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Seed file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seed file malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub categories: Vec<Map<String, Value>>,
    pub products: Vec<Map<String, Value>>,
    pub admins: Vec<String>,
    pub accounts: Vec<Account>,
}

impl SeedData {
    pub fn from_path(path: &Path) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    pub fn apply(self, docs: &MemoryDocumentStore, auth: &MemoryAuthProvider) {
        for fields in self.categories {
            insert_record(docs, CATEGORIES_COLLECTION, fields, false);
        }
        for fields in self.products {
            insert_record(docs, PRODUCTS_COLLECTION, fields, true);
        }
        for uid in &self.admins {
            docs.insert(ADMINS_COLLECTION, uid, DocumentWrite::default());
        }
        for a in &self.accounts {
            auth.add_account(&a.uid, &a.email, &a.password);
        }
        tracing::info!(
            products = docs.document_count(PRODUCTS_COLLECTION),
            categories = docs.document_count(CATEGORIES_COLLECTION),
            "seed data loaded"
        );
    }
}

fn insert_record(docs: &MemoryDocumentStore, collection: &str, mut fields: Map<String, Value>, stamp_created: bool) {
    let id = match fields.remove("id") {
        Some(Value::String(id)) => id,
        _ => Uuid::now_v7().simple().to_string(),
    };
    let needs_stamp = stamp_created && !fields.contains_key("createdAt");
    let mut write = DocumentWrite::new(fields);
    if needs_stamp {
        write = write.server_timestamp("createdAt");
    }
    docs.insert(collection, &id, write);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::DocumentStore;

    #[tokio::test]
    async fn test_seed_populates_collaborators() {
        let seed: SeedData = serde_json::from_value(serde_json::json!({
            "categories": [{ "name": "Lighting" }],
            "products": [{ "id": "lamp", "name": "Lamp", "price": 500 }, { "name": "Vase", "price": 80 }],
            "admins": ["u1"],
            "accounts": [{ "uid": "u1", "email": "a@shop.test", "password": "pw" }]
        })).unwrap();
        let docs = MemoryDocumentStore::new();
        let auth = MemoryAuthProvider::new();
        seed.apply(&docs, &auth);

        assert_eq!(docs.document_count(PRODUCTS_COLLECTION), 2);
        let lamp = docs.get(PRODUCTS_COLLECTION, "lamp").await.unwrap().unwrap();
        assert!(lamp.fields.get("createdAt").is_some());
        assert!(docs.get(ADMINS_COLLECTION, "u1").await.unwrap().is_some());
        assert!(crate::ports::AuthProvider::sign_in(&auth, "a@shop.test", "pw").await.is_ok());
    }
}
