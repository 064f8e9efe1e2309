//! Product and Category records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::domain::value_objects::{CategoryId, CreatedAt, Price, ProductId};
use crate::ports::Document;

/// A catalog product as delivered by the remote store.
///
/// `category` is a free-text reference to a category name; it is not checked
/// against the category collection and may dangle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "Price::deserialize_lenient")]
    pub price: Price,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default, deserialize_with = "CreatedAt::deserialize_lenient")]
    pub created_at: CreatedAt,
}

impl Product {
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(with_id(doc))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
}

impl CategoryItem {
    pub fn from_document(doc: &Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(with_id(doc))
    }
}

/// Document fields with the document id spliced in under `id`.
fn with_id(doc: &Document) -> Value {
    let mut fields = doc.fields.clone();
    fields.insert("id".to_string(), Value::String(doc.id.clone()));
    Value::Object(fields)
}
