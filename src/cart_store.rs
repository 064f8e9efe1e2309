//! Cart and wishlist with write-through local persistence.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::domain::aggregates::{Cart, Product, Wishlist};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{ProductId, Quantity};
use crate::ports::KeyValueStorage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageKeys {
    pub cart: String,
    pub wishlist: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self { cart: "storefront_cart".to_string(), wishlist: "storefront_wishlist".to_string() }
    }
}

/// Sole owner and sole writer of the persisted cart and wishlist.
pub struct CartStore {
    cart: Cart,
    wishlist: Wishlist,
    storage: Arc<dyn KeyValueStorage>,
    keys: StorageKeys,
    events: Vec<DomainEvent>,
}

impl CartStore {
    /// Seeds both collections from storage. Missing or unreadable values
    /// start empty.
    pub fn load(storage: Arc<dyn KeyValueStorage>, keys: StorageKeys) -> Self {
        let cart = restore::<Cart>(storage.as_ref(), &keys.cart).merged();
        let wishlist = restore::<Wishlist>(storage.as_ref(), &keys.wishlist).dedup();
        tracing::debug!(items = cart.items().len(), liked = wishlist.len(), "cart restored");
        Self { cart, wishlist, storage, keys, events: vec![] }
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn wishlist(&self) -> &Wishlist { &self.wishlist }

    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) {
        self.cart.add_item(product, Quantity::new(quantity));
        self.persist();
    }

    pub fn remove_from_cart(&mut self, id: &ProductId) {
        self.cart.remove_item(id);
        self.persist();
    }

    pub fn update_quantity(&mut self, id: &ProductId, delta: i64) {
        self.cart.update_quantity(id, delta);
        self.persist();
    }

    /// Returns whether the product is liked after the toggle.
    pub fn toggle_wishlist(&mut self, id: &ProductId) -> bool {
        let added = self.wishlist.toggle(id);
        self.events.push(CartEvent::WishlistToggled { product_id: id.clone(), added }.into());
        self.persist();
        added
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn persist(&mut self) {
        self.events.extend(self.cart.take_events());
        write(self.storage.as_ref(), &self.keys.cart, &self.cart);
        write(self.storage.as_ref(), &self.keys.wishlist, &self.wishlist);
    }
}

fn restore<T: DeserializeOwned + Default>(storage: &dyn KeyValueStorage, key: &str) -> T {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "local storage read failed; starting empty");
            return T::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(key, error = %e, "persisted value unreadable; starting empty");
        T::default()
    })
}

fn write<T: serde::Serialize>(storage: &dyn KeyValueStorage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(|e| e.to_string())
        .and_then(|text| storage.set(key, &text).map_err(|e| e.to_string()));
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "local storage write failed");
    }
}
