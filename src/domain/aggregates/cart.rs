//! Cart and Wishlist Aggregates

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::Product;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Price, ProductId, Quantity};

/// A product snapshot taken when it was added, plus a quantity.
/// The snapshot is never refreshed from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn id(&self) -> &ProductId { &self.product.id }
    pub fn line_total(&self) -> Price { self.product.price.times(self.quantity) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn contains(&self, id: &ProductId) -> bool { self.items.iter().any(|i| i.id() == id) }

    /// Number of units across all lines.
    pub fn unit_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity.value())).sum() }
    pub fn total(&self) -> Price { self.items.iter().map(CartItem::line_total).sum() }

    pub fn add_item(&mut self, product: &Product, quantity: Quantity) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity = existing.quantity.add(quantity);
        } else {
            self.items.push(CartItem { product: product.clone(), quantity });
        }
        self.raise(CartEvent::ItemAdded { product_id: product.id.clone(), quantity });
        self.raise(CartEvent::Opened);
    }

    /// Adjusts quantity by `delta`, flooring at one. Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: &ProductId, delta: i64) {
        let Some(item) = self.items.iter_mut().find(|i| i.id() == id) else { return };
        item.quantity = item.quantity.apply_delta(delta);
        let quantity = item.quantity;
        self.raise(CartEvent::QuantityChanged { product_id: id.clone(), quantity });
    }

    pub fn remove_item(&mut self, id: &ProductId) {
        let before = self.items.len();
        self.items.retain(|i| i.id() != id);
        if self.items.len() != before {
            self.raise(CartEvent::ItemRemoved { product_id: id.clone() });
        }
    }

    /// Folds repeated lines for one product into its first line, summing
    /// quantities.
    pub(crate) fn merged(self) -> Self {
        let mut items: Vec<CartItem> = Vec::with_capacity(self.items.len());
        for item in self.items {
            match items.iter_mut().find(|i| i.id() == item.id()) {
                Some(existing) => existing.quantity = existing.quantity.add(item.quantity),
                None => items.push(item),
            }
        }
        Self { items, events: self.events }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise(&mut self, e: CartEvent) { self.events.push(e.into()); }
}

/// Liked product ids, in the order they were first liked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist(Vec<ProductId>);

impl Wishlist {
    pub fn ids(&self) -> &[ProductId] { &self.0 }
    pub fn contains(&self, id: &ProductId) -> bool { self.0.contains(id) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Flips membership and returns whether the id is now present.
    pub fn toggle(&mut self, id: &ProductId) -> bool {
        if self.contains(id) {
            self.0.retain(|i| i != id);
            false
        } else {
            self.0.push(id.clone());
            true
        }
    }

    /// Drops duplicate ids that may appear in hand-edited persisted data.
    pub(crate) fn dedup(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.0.retain(|id| seen.insert(id.clone()));
        self
    }
}
