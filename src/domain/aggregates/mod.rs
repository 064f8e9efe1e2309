//! Aggregates module
pub mod product;
pub mod cart;
pub mod session;

pub use product::{CategoryItem, Product};
pub use cart::{Cart, CartItem, Wishlist};
pub use session::{Identity, Session, SessionState};
