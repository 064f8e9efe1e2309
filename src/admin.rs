//! Admin writes: product and category CRUD against the document store.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::aggregates::{CategoryItem, Product, Session};
use crate::domain::value_objects::{CategoryId, Price, ProductId};
use crate::ports::{DocumentStore, DocumentWrite, StoreError, CATEGORIES_COLLECTION, PRODUCTS_COLLECTION};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Unauthorized: You do not have admin access.")]
    Unauthorized,

    #[error("Invalid product: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw product form input. Numbers arrive as text or JSON numbers and are
/// coerced, never rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProductForm {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(deserialize_with = "form_text")]
    pub price: String,
    pub category: String,
    pub description: String,
    pub image: String,
    #[serde(deserialize_with = "form_text")]
    pub stock: String,
}

fn not_blank(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut e = ValidationError::new("required");
        e.message = Some("name is required".into());
        return Err(e);
    }
    Ok(())
}

/// Reads a form field sent as text, a number, or null.
fn form_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(), price: String::new(), category: String::new(),
            description: String::new(), image: String::new(), stock: "10".to_string(),
        }
    }
}

impl ProductForm {
    pub fn from_product(p: &Product) -> Self {
        Self {
            name: p.name.clone(), price: p.price.amount().to_string(), category: p.category.clone(),
            description: p.description.clone(), image: p.image.clone(), stock: p.stock.to_string(),
        }
    }

    /// Unparseable or negative prices become zero.
    pub fn coerced_price(&self) -> Decimal {
        Decimal::from_str(self.price.trim())
            .ok()
            .filter(|d| !d.is_sign_negative())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn coerced_stock(&self) -> u32 { self.stock.trim().parse().unwrap_or(0) }

    /// The chosen category, else the first known one, else [`UNCATEGORIZED`].
    pub fn resolved_category(&self, categories: &[CategoryItem]) -> String {
        if !self.category.is_empty() {
            return self.category.clone();
        }
        categories.first().map_or_else(|| UNCATEGORIZED.to_string(), |c| c.name.clone())
    }

    fn to_fields(&self, categories: &[CategoryItem]) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::from(self.name.trim()));
        fields.insert("price".into(), decimal_value(self.coerced_price()));
        fields.insert("category".into(), Value::from(self.resolved_category(categories)));
        fields.insert("description".into(), Value::from(self.description.as_str()));
        fields.insert("image".into(), Value::from(self.image.trim()));
        fields.insert("stock".into(), Value::from(self.coerced_stock()));
        fields
    }
}

fn decimal_value(d: Decimal) -> Value {
    serde_json::to_value(Price::new(d)).unwrap_or(Value::from(0))
}

/// Admin operations. Every call checks the caller's session first.
#[derive(Clone)]
pub struct AdminPanel {
    store: Arc<dyn DocumentStore>,
}

impl AdminPanel {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self { Self { store } }

    /// Creates a product when `editing` is `None`, otherwise updates it.
    pub async fn save_product(
        &self,
        session: &Session,
        editing: Option<&ProductId>,
        form: &ProductForm,
        categories: &[CategoryItem],
    ) -> Result<ProductId, AdminError> {
        require_admin(session)?;
        form.validate()?;
        let write = DocumentWrite::new(form.to_fields(categories)).server_timestamp("updatedAt");
        let id = match editing {
            Some(id) => {
                self.store.update(PRODUCTS_COLLECTION, id.as_str(), write).await?;
                id.clone()
            }
            None => ProductId::new(self.store.create(PRODUCTS_COLLECTION, write.server_timestamp("createdAt")).await?),
        };
        tracing::info!(product = %id, created = editing.is_none(), "product saved");
        Ok(id)
    }

    pub async fn delete_product(&self, session: &Session, id: &ProductId) -> Result<(), AdminError> {
        require_admin(session)?;
        self.store.delete(PRODUCTS_COLLECTION, id.as_str()).await?;
        tracing::info!(product = %id, "product deleted");
        Ok(())
    }

    /// Adds a category. A blank name is ignored and yields `None`.
    pub async fn add_category(&self, session: &Session, name: &str) -> Result<Option<CategoryId>, AdminError> {
        require_admin(session)?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let id = self.store.create(CATEGORIES_COLLECTION, DocumentWrite::default().field("name", name)).await?;
        tracing::info!(category = %id, name, "category added");
        Ok(Some(CategoryId::new(id)))
    }

    /// Deletes a category. Products naming it keep the dangling reference.
    pub async fn delete_category(&self, session: &Session, id: &CategoryId) -> Result<(), AdminError> {
        require_admin(session)?;
        self.store.delete(CATEGORIES_COLLECTION, id.as_str()).await?;
        tracing::info!(category = %id, "category deleted");
        Ok(())
    }
}

fn require_admin(session: &Session) -> Result<(), AdminError> {
    if session.is_admin() { Ok(()) } else { Err(AdminError::Unauthorized) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDocumentStore;
    use crate::domain::aggregates::Identity;
    use serde_json::json;

    fn admin() -> Session { Session::Admin(Identity::new("root")) }

    fn form(name: &str, price: &str, stock: &str) -> ProductForm {
        ProductForm { name: name.into(), price: price.into(), stock: stock.into(), ..ProductForm::default() }
    }

    #[test]
    fn test_coercion_defaults() {
        let f = form("Lamp", "abc", "-2");
        assert_eq!(f.coerced_price(), Decimal::ZERO);
        assert_eq!(f.coerced_stock(), 0);
        assert_eq!(form("Lamp", "-5", "3").coerced_price(), Decimal::ZERO);
        assert_eq!(form("Lamp", " 19.99 ", "3").coerced_price(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_category_fallbacks() {
        let f = form("Lamp", "1", "1");
        assert_eq!(f.resolved_category(&[]), UNCATEGORIZED);
        let cats = vec![CategoryItem { id: CategoryId::new("c1"), name: "Decor".into() }];
        assert_eq!(f.resolved_category(&cats), "Decor");
        let chosen = ProductForm { category: "Lighting".into(), ..f };
        assert_eq!(chosen.resolved_category(&cats), "Lighting");
    }

    #[tokio::test]
    async fn test_create_then_update_product() {
        let store = Arc::new(MemoryDocumentStore::new());
        let panel = AdminPanel::new(store.clone());
        let id = panel.save_product(&admin(), None, &form("Lamp", "500", "4"), &[]).await.unwrap();

        let doc = store.get(PRODUCTS_COLLECTION, id.as_str()).await.unwrap().unwrap();
        assert_eq!(doc.fields["category"], json!(UNCATEGORIZED));
        assert!(doc.fields.get("createdAt").is_some());
        let created = doc.fields["createdAt"].clone();

        panel.save_product(&admin(), Some(&id), &form("Lamp", "oops", "4"), &[]).await.unwrap();
        let doc = store.get(PRODUCTS_COLLECTION, id.as_str()).await.unwrap().unwrap();
        let product = Product::from_document(&doc).unwrap();
        assert!(product.price.amount().is_zero());
        assert_eq!(doc.fields["createdAt"], created);
    }

    #[tokio::test]
    async fn test_requires_admin_session() {
        let panel = AdminPanel::new(Arc::new(MemoryDocumentStore::new()));
        let member = Session::Authenticated(Identity::new("u1"));
        let err = panel.save_product(&member, None, &form("Lamp", "1", "1"), &[]).await.unwrap_err();
        assert!(matches!(err, AdminError::Unauthorized));
        assert!(matches!(panel.add_category(&Session::Unauthenticated, "X").await, Err(AdminError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let panel = AdminPanel::new(Arc::new(MemoryDocumentStore::new()));
        let err = panel.save_product(&admin(), None, &form("", "1", "1"), &[]).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let store = Arc::new(MemoryDocumentStore::new());
        let panel = AdminPanel::new(store.clone());
        let err = panel.save_product(&admin(), None, &form("   ", "1", "1"), &[]).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
        assert_eq!(store.document_count(PRODUCTS_COLLECTION), 0);
    }

    #[test]
    fn test_form_accepts_numbers_and_null() {
        let f: ProductForm = serde_json::from_value(json!({ "name": "Clock", "price": 75.5, "stock": 2 })).unwrap();
        assert_eq!((f.price.as_str(), f.stock.as_str()), ("75.5", "2"));
        assert_eq!(f.coerced_price(), Decimal::new(755, 1));
        assert_eq!(f.coerced_stock(), 2);

        let f: ProductForm = serde_json::from_value(json!({ "name": "Clock", "price": null })).unwrap();
        assert_eq!(f.coerced_price(), Decimal::ZERO);
        assert_eq!(f.stock, "10");
    }

    #[tokio::test]
    async fn test_category_add_blank_and_delete() {
        let store = Arc::new(MemoryDocumentStore::new());
        let panel = AdminPanel::new(store.clone());
        assert_eq!(panel.add_category(&admin(), "   ").await.unwrap(), None);
        let id = panel.add_category(&admin(), " Decor ").await.unwrap().unwrap();
        let doc = store.get(CATEGORIES_COLLECTION, id.as_str()).await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Decor"));
        panel.delete_category(&admin(), &id).await.unwrap();
        assert_eq!(store.document_count(CATEGORIES_COLLECTION), 0);
    }

    #[test]
    fn test_form_from_product() {
        let p = Product {
            id: ProductId::new("p"), name: "Lamp".into(), price: Price::new(Decimal::new(500, 0)),
            category: "Lighting".into(), description: "d".into(), image: "i".into(), stock: 7, created_at: Default::default(),
        };
        let f = ProductForm::from_product(&p);
        assert_eq!((f.price.as_str(), f.stock.as_str()), ("500", "7"));
    }
}
