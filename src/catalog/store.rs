//! Live catalog state fed by remote snapshots.

use std::sync::Arc;

use crate::domain::aggregates::{CategoryItem, Product};
use crate::ports::{
    CollectionQuery, Direction, Document, DocumentStore, Snapshot, StoreError, Subscription,
    CATEGORIES_COLLECTION, PRODUCTS_COLLECTION,
};

/// One notification from either catalog feed.
#[derive(Debug)]
pub enum CatalogUpdate {
    Products(Snapshot),
    Categories(Snapshot),
}

/// Products (newest first) and categories (by name), each replaced wholesale
/// on every notification. Consumers get shared read-only snapshots.
#[derive(Clone, Debug, Default)]
pub struct CatalogStore {
    products: Arc<[Product]>,
    categories: Arc<[CategoryItem]>,
}

impl CatalogStore {
    pub fn new() -> Self { Self::default() }

    pub fn products(&self) -> Arc<[Product]> { Arc::clone(&self.products) }
    pub fn categories(&self) -> Arc<[CategoryItem]> { Arc::clone(&self.categories) }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id.as_str() == id)
    }

    /// Applies a notification. A failed notification keeps the last snapshot.
    pub fn apply(&mut self, update: CatalogUpdate) {
        match update {
            CatalogUpdate::Products(Ok(docs)) => {
                self.products = decode_all(&docs, Product::from_document, PRODUCTS_COLLECTION).into();
                tracing::debug!(count = self.products.len(), "products snapshot applied");
            }
            CatalogUpdate::Categories(Ok(docs)) => {
                self.categories = decode_all(&docs, CategoryItem::from_document, CATEGORIES_COLLECTION).into();
                tracing::debug!(count = self.categories.len(), "categories snapshot applied");
            }
            CatalogUpdate::Products(Err(e)) | CatalogUpdate::Categories(Err(e)) => {
                tracing::warn!(error = %e, "catalog subscription failed; keeping last snapshot");
            }
        }
    }
}

fn decode_all<T>(docs: &[Document], decode: fn(&Document) -> Result<T, serde_json::Error>, collection: &str) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode(doc) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(collection, id = %doc.id, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect()
}

enum Feed { Products, Categories }

/// The two catalog subscriptions, opened together and released together.
#[derive(Debug)]
pub struct CatalogFeed {
    products: Option<Subscription<Snapshot>>,
    categories: Option<Subscription<Snapshot>>,
}

impl CatalogFeed {
    pub fn products_query() -> CollectionQuery { CollectionQuery::new(PRODUCTS_COLLECTION, "createdAt", Direction::Desc) }
    pub fn categories_query() -> CollectionQuery { CollectionQuery::new(CATEGORIES_COLLECTION, "name", Direction::Asc) }

    pub async fn open(store: &dyn DocumentStore) -> Result<Self, StoreError> {
        let products = store.subscribe(Self::products_query()).await?;
        let categories = store.subscribe(Self::categories_query()).await?;
        Ok(Self { products: Some(products), categories: Some(categories) })
    }

    /// Waits for the next notification from either feed. Returns `None` once
    /// both feeds have ended.
    pub async fn next(&mut self) -> Option<CatalogUpdate> {
        loop {
            let (feed, snapshot) = match (self.products.as_mut(), self.categories.as_mut()) {
                (None, None) => return None,
                (Some(p), None) => (Feed::Products, p.next().await),
                (None, Some(c)) => (Feed::Categories, c.next().await),
                (Some(p), Some(c)) => tokio::select! {
                    s = p.next() => (Feed::Products, s),
                    s = c.next() => (Feed::Categories, s),
                },
            };
            match (feed, snapshot) {
                (Feed::Products, Some(s)) => return Some(CatalogUpdate::Products(s)),
                (Feed::Categories, Some(s)) => return Some(CatalogUpdate::Categories(s)),
                (Feed::Products, None) => self.products = None,
                (Feed::Categories, None) => self.categories = None,
            }
        }
    }

    pub fn close(mut self) {
        if let Some(p) = self.products.take() { p.cancel(); }
        if let Some(c) = self.categories.take() { c.cancel(); }
    }
}
