//! Domain events
use crate::domain::value_objects::{IdentityId, ProductId, Quantity};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Session(SessionEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    /// The cart view should be shown. Raised on every add, even for merges.
    Opened,
    ItemAdded { product_id: ProductId, quantity: Quantity },
    ItemRemoved { product_id: ProductId },
    QuantityChanged { product_id: ProductId, quantity: Quantity },
    WishlistToggled { product_id: ProductId, added: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { identity_id: IdentityId, admin: bool },
    SignedOut,
    AdminRejected { identity_id: IdentityId },
}

impl From<CartEvent> for DomainEvent {
    fn from(e: CartEvent) -> Self { DomainEvent::Cart(e) }
}

impl From<SessionEvent> for DomainEvent {
    fn from(e: SessionEvent) -> Self { DomainEvent::Session(e) }
}
