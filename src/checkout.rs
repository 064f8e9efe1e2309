//! Checkout hand-off: a plain-text order summary sent to a chat deep link.

use crate::domain::aggregates::CartItem;
use crate::domain::value_objects::Price;

pub const DEFAULT_CLOSING_LINE: &str = "Please confirm availability and share payment details.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Destination number in international format without `+`.
    pub phone: String,
    pub store_name: String,
    /// Prefixed to every amount; empty for none.
    pub currency_symbol: String,
    pub closing_line: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            phone: String::new(),
            store_name: "our store".to_string(),
            currency_symbol: String::new(),
            closing_line: DEFAULT_CLOSING_LINE.to_string(),
        }
    }
}

/// Builds the order message. An empty cart yields no item lines and a zero
/// total; callers are expected not to offer checkout in that case.
pub fn compose_message(items: &[CartItem], config: &CheckoutConfig) -> String {
    let symbol = &config.currency_symbol;
    let mut message = format!("Hello {}! I'd like to place an order:\n\n", config.store_name);
    for item in items {
        message.push_str(&format!(
            "• {} (Qty: {}) - {symbol}{}\n",
            item.product.name,
            item.quantity,
            item.line_total()
        ));
    }
    let total: Price = items.iter().map(CartItem::line_total).sum();
    message.push_str(&format!("\n*Total: {symbol}{total}*\n\n{}", config.closing_line));
    message
}

/// Deep link that opens the messaging app with `message` pre-filled.
pub fn handoff_url(config: &CheckoutConfig, message: &str) -> String {
    format!("https://wa.me/{}?text={}", config.phone, urlencoding::encode(message))
}
