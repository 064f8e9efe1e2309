use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_client::adapters::{MemoryAuthProvider, MemoryDocumentStore, MemoryStorage, SeedData};
use storefront_client::cart_store::StorageKeys;
use storefront_client::checkout::CheckoutConfig;
use storefront_client::ports::KeyValueStorage;
use storefront_client::session::DocumentAdminRegistry;
use storefront_client::{routes, Collaborators, Listeners, Storefront};

struct Harness {
    app: Router,
    storage: Arc<MemoryStorage>,
    listeners: Listeners,
}

fn seed() -> SeedData {
    serde_json::from_value(json!({
        "categories": [{ "name": "Lighting" }, { "name": "Decor" }],
        "products": [
            { "id": "lamp", "name": "Lamp", "price": 500, "category": "Lighting", "createdAt": 3000,
              "image": "https://drive.google.com/file/d/ABCDEFGHIJKLMNOPQRSTUVWXY/view" },
            { "id": "vase", "name": "Vase", "price": 1250, "category": "Decor", "createdAt": 2000 },
            { "id": "rug", "name": "Rug", "price": 200, "category": "Decor", "createdAt": 1000 }
        ],
        "admins": ["u-admin"],
        "accounts": [
            { "uid": "u-admin", "email": "admin@shop.test", "password": "hunter22" },
            { "uid": "u-member", "email": "member@shop.test", "password": "hunter22" }
        ]
    }))
    .unwrap()
}

async fn start(storage: Arc<MemoryStorage>) -> Harness {
    let docs = Arc::new(MemoryDocumentStore::new());
    let auth = Arc::new(MemoryAuthProvider::new());
    seed().apply(&docs, &auth);
    let collaborators = Collaborators {
        documents: docs.clone(),
        auth,
        registry: Arc::new(DocumentAdminRegistry::new(docs)),
        storage: storage.clone(),
    };
    let checkout = CheckoutConfig { phone: "15550001111".into(), ..CheckoutConfig::default() };
    let shared = Storefront::new(&collaborators, StorageKeys::default(), checkout).into_shared();
    let listeners = Listeners::start(shared.clone(), &collaborators).await;
    let harness = Harness { app: routes::router(shared), storage, listeners };
    wait_for(&harness, "/api/v1/products", |v| v.as_array().map_or(false, |a| a.len() == 3)).await;
    harness
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    let request = match body {
        Some(b) => request.body(Body::from(b.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> Value { call(app, Method::GET, uri, None).await.1 }

async fn wait_for<F: Fn(&Value) -> bool>(h: &Harness, uri: &str, check: F) -> Value {
    for _ in 0..200 {
        let value = get(&h.app, uri).await;
        if check(&value) {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition on {uri} never held");
}

fn ids(value: &Value) -> Vec<&str> {
    value.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_product_listing_pipeline() {
    let h = start(Arc::new(MemoryStorage::new())).await;

    let all = get(&h.app, "/api/v1/products").await;
    assert_eq!(ids(&all), ["lamp", "vase", "rug"]);
    assert_eq!(all[0]["imageUrl"], "https://drive.google.com/thumbnail?id=ABCDEFGHIJKLMNOPQRSTUVWXY&sz=s0");
    assert!(all[1]["imageUrl"].as_str().unwrap().starts_with("https://images.unsplash.com/"));

    assert_eq!(ids(&get(&h.app, "/api/v1/products?sort=price-low").await), ["rug", "lamp", "vase"]);
    assert_eq!(ids(&get(&h.app, "/api/v1/products?sort=price-high").await), ["vase", "lamp", "rug"]);
    assert_eq!(ids(&get(&h.app, "/api/v1/products?category=Decor").await), ["vase", "rug"]);
    assert_eq!(ids(&get(&h.app, "/api/v1/products?search=LA&category=all").await), ["lamp"]);
    assert_eq!(ids(&get(&h.app, "/api/v1/products?sort=bogus").await), ["lamp", "vase", "rug"]);

    let categories = get(&h.app, "/api/v1/categories").await;
    let names: Vec<&str> = categories.as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Decor", "Lighting"]);
    h.listeners.shutdown().await;
}

#[tokio::test]
async fn test_cart_wishlist_and_checkout() {
    let h = start(Arc::new(MemoryStorage::new())).await;

    let (status, _) = call(&h.app, Method::GET, "/api/v1/checkout", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, cart) = call(&h.app, Method::POST, "/api/v1/cart", Some(json!({ "product_id": "lamp" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["open"], true);
    let (_, cart) = call(&h.app, Method::POST, "/api/v1/cart", Some(json!({ "product_id": "lamp" }))).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["unitCount"], 2);
    assert_eq!(cart["total"], 1000.0);

    let (status, _) = call(&h.app, Method::POST, "/api/v1/cart", Some(json!({ "product_id": "ghost" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, checkout) = call(&h.app, Method::GET, "/api/v1/checkout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(checkout["message"].as_str().unwrap().contains("Lamp (Qty: 2) - 1,000"));
    assert!(checkout["url"].as_str().unwrap().starts_with("https://wa.me/15550001111?text="));

    let (_, cart) = call(&h.app, Method::PATCH, "/api/v1/cart/lamp", Some(json!({ "delta": -5 }))).await;
    assert_eq!(cart["unitCount"], 1);
    let (_, cart) = call(&h.app, Method::DELETE, "/api/v1/cart/lamp", None).await;
    assert_eq!(cart["items"], json!([]));

    let (_, liked) = call(&h.app, Method::POST, "/api/v1/wishlist/vase", None).await;
    assert_eq!(liked["wishlisted"], true);
    assert_eq!(get(&h.app, "/api/v1/wishlist").await, json!(["vase"]));
    let listing = get(&h.app, "/api/v1/products?category=Decor").await;
    assert_eq!(listing[0]["wishlisted"], true);
    let (_, liked) = call(&h.app, Method::POST, "/api/v1/wishlist/vase", None).await;
    assert_eq!(liked["wishlisted"], false);

    assert_eq!(h.storage.get("storefront_wishlist").unwrap().as_deref(), Some("[]"));
    assert_eq!(h.storage.get("storefront_cart").unwrap().as_deref(), Some("[]"));
    h.listeners.shutdown().await;
}

#[tokio::test]
async fn test_cart_survives_restart_and_corruption() {
    let storage = Arc::new(MemoryStorage::new());
    let h = start(storage.clone()).await;
    call(&h.app, Method::POST, "/api/v1/cart", Some(json!({ "product_id": "vase", "quantity": 3 }))).await;
    h.listeners.shutdown().await;

    let h = start(storage.clone()).await;
    let cart = get(&h.app, "/api/v1/cart").await;
    assert_eq!(cart["unitCount"], 3);
    assert_eq!(cart["open"], false);
    h.listeners.shutdown().await;

    storage.set("storefront_cart", "{not json").unwrap();
    storage.set("storefront_wishlist", "42").unwrap();
    let h = start(storage).await;
    assert_eq!(get(&h.app, "/api/v1/cart").await["items"], json!([]));
    assert_eq!(get(&h.app, "/api/v1/wishlist").await, json!([]));
    h.listeners.shutdown().await;
}

#[tokio::test]
async fn test_admin_session_and_product_writes() {
    let h = start(Arc::new(MemoryStorage::new())).await;
    wait_for(&h, "/api/v1/session", |v| v["loading"] == false).await;

    let new_product = json!({ "name": "Clock", "price": 75, "stock": 2 });
    let (status, _) = call(&h.app, Method::POST, "/api/v1/admin/products", Some(new_product.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let wrong = json!({ "email": "admin@shop.test", "password": "nope" });
    let (status, _) = call(&h.app, Method::POST, "/api/v1/session/admin", Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let member = json!({ "email": "member@shop.test", "password": "hunter22" });
    let (status, _) = call(&h.app, Method::POST, "/api/v1/session/admin", Some(member)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    wait_for(&h, "/api/v1/session", |v| v["state"] == "unauthenticated").await;

    let admin = json!({ "email": "admin@shop.test", "password": "hunter22" });
    let (status, session) = call(&h.app, Method::POST, "/api/v1/session/admin", Some(admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["state"], "authenticated-admin");

    let (status, created) = call(&h.app, Method::POST, "/api/v1/admin/products", Some(new_product)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    let listing = wait_for(&h, "/api/v1/products", |v| v.as_array().map_or(false, |a| a.len() == 4)).await;
    assert_eq!(listing[0]["id"], id.as_str());
    assert_eq!(listing[0]["category"], "Decor");
    assert_eq!(listing[0]["price"], 75.0);
    assert_eq!(listing[0]["stock"], 2);

    let (status, _) = call(&h.app, Method::PUT, "/api/v1/admin/products/ghost", Some(json!({ "name": "Ghost" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&h.app, Method::POST, "/api/v1/admin/products", Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&h.app, Method::POST, "/api/v1/admin/products", Some(json!({ "name": "" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let found = get(&h.app, "/api/v1/admin/products?search=clo").await;
    assert_eq!(ids(&found), [id.as_str()]);

    let (status, _) = call(&h.app, Method::DELETE, &format!("/api/v1/admin/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    wait_for(&h, "/api/v1/products", |v| v.as_array().map_or(false, |a| a.len() == 3)).await;

    let (status, _) = call(&h.app, Method::POST, "/api/v1/admin/categories", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&h.app, Method::POST, "/api/v1/admin/categories", Some(json!({ "name": "Garden" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    wait_for(&h, "/api/v1/categories", |v| v.as_array().map_or(false, |a| a.len() == 3)).await;

    let (_, session) = call(&h.app, Method::DELETE, "/api/v1/session", None).await;
    assert_eq!(session["state"], "unauthenticated");
    let (status, _) = call(&h.app, Method::GET, "/api/v1/admin/products", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    h.listeners.shutdown().await;
}
