//! JSON HTTP surface over a [`SharedStorefront`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::admin::{AdminError, ProductForm};
use crate::app::SharedStorefront;
use crate::catalog::{admin_filter, ListingQuery};
use crate::checkout::{compose_message, handoff_url};
use crate::domain::aggregates::{CartItem, CategoryItem, Product, Session, SessionState};
use crate::domain::value_objects::{CategoryId, Price, ProductId};
use crate::media::normalize_image_link;
use crate::ports::StoreError;
use crate::session::SessionError;
use crate::StorefrontError;

pub fn router(state: SharedStorefront) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-client"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/cart", get(get_cart).post(add_to_cart))
        .route("/api/v1/cart/close", post(close_cart))
        .route("/api/v1/cart/:id", delete(remove_from_cart).patch(update_quantity))
        .route("/api/v1/wishlist", get(get_wishlist))
        .route("/api/v1/wishlist/:id", post(toggle_wishlist))
        .route("/api/v1/checkout", get(checkout))
        .route("/api/v1/session", get(get_session).delete(sign_out))
        .route("/api/v1/session/admin", post(admin_sign_in))
        .route("/api/v1/admin/products", get(admin_products).post(create_product))
        .route("/api/v1/admin/products/:id", put(update_product).delete(delete_product))
        .route("/api/v1/admin/categories", post(create_category))
        .route("/api/v1/admin/categories/:id", delete(delete_category))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            tracing::error!(status = %self.0, error = %self.1, "request failed");
        }
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<StorefrontError> for ApiError {
    fn from(e: StorefrontError) -> Self {
        let status = match &e {
            StorefrontError::Session(SessionError::Authentication(_)) | StorefrontError::Auth(_) => StatusCode::UNAUTHORIZED,
            StorefrontError::Session(SessionError::Unauthorized) | StorefrontError::Admin(AdminError::Unauthorized) => StatusCode::FORBIDDEN,
            StorefrontError::Admin(AdminError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            StorefrontError::Admin(AdminError::Store(StoreError::NotFound { .. }))
            | StorefrontError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            StorefrontError::Admin(AdminError::Store(_)) | StorefrontError::Store(_) => StatusCode::BAD_GATEWAY,
            StorefrontError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            StorefrontError::EmptyCart => StatusCode::CONFLICT,
            StorefrontError::Storage(_) | StorefrontError::Config(_) | StorefrontError::Seed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, e.to_string())
    }
}

impl From<AdminError> for ApiError {
    fn from(e: AdminError) -> Self { StorefrontError::from(e).into() }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self { StorefrontError::from(e).into() }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub image_url: String,
    pub wishlisted: bool,
}

impl ProductView {
    fn new(product: &Product, wishlisted: bool) -> Self {
        Self { image_url: normalize_image_link(&product.image), product: product.clone(), wishlisted }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub unit_count: u64,
    pub total: Price,
    pub open: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartItem,
    pub image_url: String,
    pub line_total: Price,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SessionState,
    pub identity_id: Option<String>,
    pub is_admin: bool,
    pub loading: bool,
}

fn cart_view(storefront: &crate::app::Storefront) -> CartView {
    let cart = storefront.cart.cart();
    CartView {
        items: cart
            .items()
            .iter()
            .map(|i| CartLineView { image_url: normalize_image_link(&i.product.image), line_total: i.line_total(), item: i.clone() })
            .collect(),
        unit_count: cart.unit_count(),
        total: cart.total(),
        open: storefront.is_cart_open(),
    }
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(State(s): State<SharedStorefront>, Query(q): Query<ListingQuery>) -> Json<Vec<ProductView>> {
    let storefront = s.lock().await;
    let products = storefront.catalog.products();
    let wishlist = storefront.cart.wishlist();
    Json(q.derive(&products).into_iter().map(|p| ProductView::new(p, wishlist.contains(&p.id))).collect())
}

async fn list_categories(State(s): State<SharedStorefront>) -> Json<Vec<CategoryItem>> {
    Json(s.lock().await.catalog.categories().to_vec())
}

// =============================================================================
// Cart & wishlist
// =============================================================================

async fn get_cart(State(s): State<SharedStorefront>) -> Json<CartView> { Json(cart_view(&*s.lock().await)) }

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest { pub product_id: String, pub quantity: Option<u32> }

async fn add_to_cart(State(s): State<SharedStorefront>, Json(r): Json<AddToCartRequest>) -> ApiResult<Json<CartView>> {
    let mut storefront = s.lock().await;
    let product = storefront
        .catalog
        .product(&r.product_id)
        .cloned()
        .ok_or_else(|| StorefrontError::ProductNotFound(r.product_id.clone()))?;
    storefront.cart.add_to_cart(&product, r.quantity.unwrap_or(1));
    storefront.dispatch_events();
    Ok(Json(cart_view(&storefront)))
}

async fn close_cart(State(s): State<SharedStorefront>) -> StatusCode {
    s.lock().await.close_cart();
    StatusCode::NO_CONTENT
}

async fn remove_from_cart(State(s): State<SharedStorefront>, Path(id): Path<String>) -> Json<CartView> {
    let mut storefront = s.lock().await;
    storefront.cart.remove_from_cart(&ProductId::new(id));
    storefront.dispatch_events();
    Json(cart_view(&storefront))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest { pub delta: i64 }

async fn update_quantity(State(s): State<SharedStorefront>, Path(id): Path<String>, Json(r): Json<QuantityRequest>) -> Json<CartView> {
    let mut storefront = s.lock().await;
    storefront.cart.update_quantity(&ProductId::new(id), r.delta);
    storefront.dispatch_events();
    Json(cart_view(&storefront))
}

async fn get_wishlist(State(s): State<SharedStorefront>) -> Json<Vec<ProductId>> {
    Json(s.lock().await.cart.wishlist().ids().to_vec())
}

async fn toggle_wishlist(State(s): State<SharedStorefront>, Path(id): Path<String>) -> Json<serde_json::Value> {
    let mut storefront = s.lock().await;
    let liked = storefront.cart.toggle_wishlist(&ProductId::new(id));
    storefront.dispatch_events();
    Json(serde_json::json!({ "wishlisted": liked }))
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse { pub message: String, pub url: String }

async fn checkout(State(s): State<SharedStorefront>) -> ApiResult<Json<CheckoutResponse>> {
    let storefront = s.lock().await;
    let cart = storefront.cart.cart();
    if cart.is_empty() {
        return Err(StorefrontError::EmptyCart.into());
    }
    let message = compose_message(cart.items(), &storefront.checkout);
    let url = handoff_url(&storefront.checkout, &message);
    Ok(Json(CheckoutResponse { message, url }))
}

// =============================================================================
// Session
// =============================================================================

fn session_view(session: &Session, loading: bool) -> SessionView {
    SessionView {
        state: session.state(),
        identity_id: session.identity().map(|i| i.id.to_string()),
        is_admin: session.is_admin(),
        loading,
    }
}

async fn get_session(State(s): State<SharedStorefront>) -> Json<SessionView> {
    let storefront = s.lock().await;
    Json(session_view(storefront.session.session(), storefront.session.is_loading()))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest { pub email: String, pub password: String }

async fn admin_sign_in(State(s): State<SharedStorefront>, Json(r): Json<SignInRequest>) -> ApiResult<Json<SessionView>> {
    let mut storefront = s.lock().await;
    let result = storefront.session.admin_sign_in(&r.email, &r.password).await;
    storefront.dispatch_events();
    result?;
    Ok(Json(session_view(storefront.session.session(), storefront.session.is_loading())))
}

async fn sign_out(State(s): State<SharedStorefront>) -> Json<SessionView> {
    let mut storefront = s.lock().await;
    storefront.session.sign_out().await;
    storefront.dispatch_events();
    Json(session_view(storefront.session.session(), storefront.session.is_loading()))
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AdminSearch { #[serde(default)] pub search: String }

async fn admin_products(State(s): State<SharedStorefront>, Query(q): Query<AdminSearch>) -> ApiResult<Json<Vec<ProductView>>> {
    let storefront = s.lock().await;
    if !storefront.session.session().is_admin() {
        return Err(AdminError::Unauthorized.into());
    }
    let products = storefront.catalog.products();
    Ok(Json(admin_filter(&products, &q.search).into_iter().map(|p| ProductView::new(p, false)).collect()))
}

#[derive(Debug, Serialize)]
pub struct SavedResponse { pub id: String }

async fn create_product(State(s): State<SharedStorefront>, Json(form): Json<ProductForm>) -> ApiResult<(StatusCode, Json<SavedResponse>)> {
    let storefront = s.lock().await;
    let categories = storefront.catalog.categories();
    let id = storefront.admin.save_product(storefront.session.session(), None, &form, &categories).await?;
    Ok((StatusCode::CREATED, Json(SavedResponse { id: id.to_string() })))
}

async fn update_product(State(s): State<SharedStorefront>, Path(id): Path<String>, Json(form): Json<ProductForm>) -> ApiResult<Json<SavedResponse>> {
    let storefront = s.lock().await;
    let categories = storefront.catalog.categories();
    let id = storefront.admin.save_product(storefront.session.session(), Some(&ProductId::new(id)), &form, &categories).await?;
    Ok(Json(SavedResponse { id: id.to_string() }))
}

async fn delete_product(State(s): State<SharedStorefront>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let storefront = s.lock().await;
    storefront.admin.delete_product(storefront.session.session(), &ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest { pub name: String }

async fn create_category(State(s): State<SharedStorefront>, Json(r): Json<CategoryRequest>) -> ApiResult<Response> {
    let storefront = s.lock().await;
    Ok(match storefront.admin.add_category(storefront.session.session(), &r.name).await? {
        Some(id) => (StatusCode::CREATED, Json(SavedResponse { id: id.to_string() })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn delete_category(State(s): State<SharedStorefront>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let storefront = s.lock().await;
    storefront.admin.delete_category(storefront.session.session(), &CategoryId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
