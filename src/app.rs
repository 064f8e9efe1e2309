//! Storefront context: the stores a client session owns, and the listener
//! tasks that feed them.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admin::AdminPanel;
use crate::cart_store::{CartStore, StorageKeys};
use crate::catalog::{CatalogFeed, CatalogStore};
use crate::checkout::CheckoutConfig;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::ports::{AdminRegistry, AuthProvider, DocumentStore, KeyValueStorage};
use crate::session::SessionStore;

/// Everything one storefront client owns. Each store has a single owner and
/// is mutated only through this context.
pub struct Storefront {
    pub catalog: CatalogStore,
    pub cart: CartStore,
    pub session: SessionStore,
    pub admin: AdminPanel,
    pub checkout: CheckoutConfig,
    cart_open: bool,
}

/// The context behind the async lock that serialises every dispatch.
pub type SharedStorefront = Arc<Mutex<Storefront>>;

/// Collaborators a [`Storefront`] is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub documents: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub registry: Arc<dyn AdminRegistry>,
    pub storage: Arc<dyn KeyValueStorage>,
}

impl Storefront {
    pub fn new(collaborators: &Collaborators, keys: StorageKeys, checkout: CheckoutConfig) -> Self {
        Self {
            catalog: CatalogStore::new(),
            cart: CartStore::load(collaborators.storage.clone(), keys),
            session: SessionStore::new(collaborators.auth.clone(), collaborators.registry.clone()),
            admin: AdminPanel::new(collaborators.documents.clone()),
            checkout,
            cart_open: false,
        }
    }

    pub fn into_shared(self) -> SharedStorefront { Arc::new(Mutex::new(self)) }

    pub fn is_cart_open(&self) -> bool { self.cart_open }
    pub fn close_cart(&mut self) { self.cart_open = false; }

    /// Drains pending domain events, logging them and applying UI signals.
    pub fn dispatch_events(&mut self) {
        let events = self.cart.take_events().into_iter().chain(self.session.take_events());
        for event in events {
            tracing::debug!(?event, "domain event");
            if event == DomainEvent::Cart(CartEvent::Opened) {
                self.cart_open = true;
            }
        }
    }
}

/// Background tasks pumping remote notifications into a [`SharedStorefront`].
#[derive(Debug)]
pub struct Listeners {
    tasks: Vec<JoinHandle<()>>,
}

impl Listeners {
    /// Opens the catalog feed and the auth-state feed. A catalog that cannot
    /// be subscribed is logged and left at its current snapshot.
    pub async fn start(shared: SharedStorefront, collaborators: &Collaborators) -> Self {
        let mut tasks = Vec::with_capacity(2);

        match CatalogFeed::open(collaborators.documents.as_ref()).await {
            Ok(mut feed) => {
                let shared = shared.clone();
                tasks.push(tokio::spawn(async move {
                    while let Some(update) = feed.next().await {
                        shared.lock().await.catalog.apply(update);
                    }
                    feed.close();
                }));
            }
            Err(e) => tracing::warn!(error = %e, "catalog subscription unavailable"),
        }

        let mut auth_feed = shared.lock().await.session.listen();
        tasks.push(tokio::spawn(async move {
            while let Some(identity) = auth_feed.next().await {
                let mut storefront = shared.lock().await;
                storefront.session.handle_auth_change(identity).await;
                storefront.dispatch_events();
            }
            auth_feed.cancel();
        }));

        Self { tasks }
    }

    /// Stops the pumps. Aborting a task drops its subscriptions, which
    /// releases them at the collaborator.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryAuthProvider, MemoryDocumentStore, MemoryStorage};
    use crate::ports::{DocumentWrite, PRODUCTS_COLLECTION};
    use crate::session::DocumentAdminRegistry;
    use std::time::Duration;

    fn collaborators(docs: &Arc<MemoryDocumentStore>, auth: &Arc<MemoryAuthProvider>) -> Collaborators {
        Collaborators {
            documents: docs.clone(),
            auth: auth.clone(),
            registry: Arc::new(DocumentAdminRegistry::new(docs.clone())),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    async fn eventually<F: Fn(&Storefront) -> bool>(shared: &SharedStorefront, check: F) -> bool {
        for _ in 0..100 {
            if check(&*shared.lock().await) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_listeners_feed_catalog_and_session() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let c = collaborators(&docs, &auth);
        let shared = Storefront::new(&c, StorageKeys::default(), CheckoutConfig::default()).into_shared();
        assert!(shared.lock().await.session.is_loading());

        let listeners = Listeners::start(shared.clone(), &c).await;
        assert!(eventually(&shared, |s| !s.session.is_loading()).await);

        docs.insert(PRODUCTS_COLLECTION, "lamp", DocumentWrite::default().field("name", "Lamp").field("price", 500));
        assert!(eventually(&shared, |s| s.catalog.product("lamp").is_some()).await);

        listeners.shutdown().await;
        assert_eq!(docs.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_notification_keeps_catalog() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        docs.insert(PRODUCTS_COLLECTION, "lamp", DocumentWrite::default().field("name", "Lamp"));
        let c = collaborators(&docs, &auth);
        let shared = Storefront::new(&c, StorageKeys::default(), CheckoutConfig::default()).into_shared();
        let listeners = Listeners::start(shared.clone(), &c).await;
        assert!(eventually(&shared, |s| s.catalog.products().len() == 1).await);

        docs.fail_listeners(PRODUCTS_COLLECTION, "permission denied");
        docs.insert(PRODUCTS_COLLECTION, "vase", DocumentWrite::default().field("name", "Vase"));
        assert!(eventually(&shared, |s| s.catalog.products().len() == 2).await);
        assert!(shared.lock().await.catalog.product("lamp").is_some());
        listeners.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_notification_alone_changes_nothing() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        docs.insert(PRODUCTS_COLLECTION, "lamp", DocumentWrite::default().field("name", "Lamp"));
        let c = collaborators(&docs, &auth);
        let shared = Storefront::new(&c, StorageKeys::default(), CheckoutConfig::default()).into_shared();
        let listeners = Listeners::start(shared.clone(), &c).await;
        assert!(eventually(&shared, |s| s.catalog.products().len() == 1).await);

        docs.fail_listeners(PRODUCTS_COLLECTION, "permission denied");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(shared.lock().await.catalog.products().len(), 1);
        assert_eq!(docs.listener_count(), 2);
        listeners.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_to_cart_opens_cart() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let mut storefront = Storefront::new(&collaborators(&docs, &auth), StorageKeys::default(), CheckoutConfig::default());
        let product = crate::domain::aggregates::Product {
            id: "p1".into(), name: "Lamp".into(), price: Default::default(), category: String::new(),
            description: String::new(), image: String::new(), stock: 1, created_at: Default::default(),
        };
        storefront.cart.add_to_cart(&product, 1);
        assert!(!storefront.is_cart_open());
        storefront.dispatch_events();
        assert!(storefront.is_cart_open());
        storefront.close_cart();
        assert!(!storefront.is_cart_open());
    }
}
