//! Storefront client core
//!
//! Catalog, cart, wishlist and admin session state for a storefront backed
//! by a hosted document store.
//!
//! ## Features
//! - Live product and category catalog
//! - Search, category filter and sort for the product grid
//! - Cart and wishlist persisted to local storage
//! - Admin sign-in gated by an admin registry
//! - Order hand-off as a pre-filled chat message

pub mod adapters;
pub mod admin;
pub mod app;
pub mod cart_store;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod media;
pub mod ports;
pub mod routes;
pub mod session;

use thiserror::Error;

pub use app::{Collaborators, Listeners, SharedStorefront, Storefront};
pub use config::StorefrontConfig;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Store(#[from] ports::StoreError),

    #[error(transparent)]
    Auth(#[from] ports::AuthError),

    #[error(transparent)]
    Storage(#[from] ports::StorageError),

    #[error(transparent)]
    Session(#[from] session::SessionError),

    #[error(transparent)]
    Admin(#[from] admin::AdminError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Seed(#[from] adapters::SeedError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
