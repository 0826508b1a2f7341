use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::CartView;
use crate::errors::AppError;
use crate::AppCartService;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    /// New absolute quantity. Zero removes the item from the cart.
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price_at_time: String,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub subtotal: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        let subtotal = cart.subtotal().to_string();
        CartResponse {
            id: cart.id,
            user_id: cart.user_id,
            items: cart
                .items
                .into_iter()
                .map(|item| CartItemResponse {
                    line_total: item.line_total().to_string(),
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    price_at_time: item.price_at_time.to_string(),
                })
                .collect(),
            subtotal,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /carts/{user_id}
///
/// Returns the user's cart, creating an empty one on first access.
#[utoipa::path(
    get,
    path = "/carts/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner UUID"),
    ),
    responses(
        (status = 200, description = "The user's cart", body = CartResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "carts"
)]
pub async fn get_cart(
    svc: web::Data<AppCartService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    let cart = web::block(move || svc.get_cart(user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /carts/{user_id}/items
///
/// Adds a product to the cart, merging quantities if it is already there.
/// The unit price is snapshotted from the product's current effective price.
#[utoipa::path(
    post,
    path = "/carts/{user_id}/items",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner UUID"),
    ),
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Requested quantity exceeds available stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "carts"
)]
pub async fn add_cart_item(
    svc: web::Data<AppCartService>,
    path: web::Path<Uuid>,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let body = body.into_inner();

    let cart = web::block(move || svc.add_item(user_id, body.product_id, body.quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /carts/{user_id}/items/{product_id}
///
/// Sets the absolute quantity of a cart line. Quantity zero removes it.
#[utoipa::path(
    put,
    path = "/carts/{user_id}/items/{product_id}",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
        (status = 409, description = "Requested quantity exceeds available stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "carts"
)]
pub async fn update_cart_item(
    svc: web::Data<AppCartService>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let (user_id, product_id) = path.into_inner();
    let body = body.into_inner();

    let cart = web::block(move || svc.update_item(user_id, product_id, body.quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /carts/{user_id}/items/{product_id}
///
/// Removes a single product from the cart.
#[utoipa::path(
    delete,
    path = "/carts/{user_id}/items/{product_id}",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "carts"
)]
pub async fn remove_cart_item(
    svc: web::Data<AppCartService>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, product_id) = path.into_inner();

    let cart = web::block(move || svc.remove_item(user_id, product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /carts/{user_id}
///
/// Empties the cart without ordering anything.
#[utoipa::path(
    delete,
    path = "/carts/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "Cart owner UUID"),
    ),
    responses(
        (status = 200, description = "The now-empty cart", body = CartResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "carts"
)]
pub async fn clear_cart(
    svc: web::Data<AppCartService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    let cart = web::block(move || svc.clear_cart(user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
