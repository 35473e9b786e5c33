//! Checkout and order history.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use mercado_core::{OrderId, Price, ProductId, Quantity, UserId};

use super::reply;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::order::Order;
use crate::state::AppState;
use crate::validation::{Required, ValidationError};

/// Checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(alias = "product_id")]
    pub product_id: Option<ProductId>,
    /// Must match the caller when given.
    #[serde(alias = "user_id")]
    pub user_id: Option<UserId>,
    #[serde(alias = "quantidade")]
    pub quantity: Option<i64>,
}

/// Order history filter.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(alias = "id")]
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Placed {
    order_id: OrderId,
    total: Price,
}

/// Place an order for the authenticated user.
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let mut required = Required::default();
    let product_id = required.take("productId", body.product_id);
    let quantity = required.take("quantity", body.quantity);
    let (Some(product_id), Some(quantity)) = (product_id, quantity) else {
        return Err(required.into_error().into());
    };

    let quantity = Quantity::new(quantity)
        .map_err(|_| ValidationError::invalid("quantity", "must be an integer greater than zero"))?;

    if body.user_id.is_some_and(|id| id != user.user_id) {
        return Err(AppError::Forbidden(
            "Cannot place an order for another user".to_string(),
        ));
    }

    let order = OrderRepository::new(state.db())
        .place(product_id, user.user_id, quantity)
        .await?;

    tracing::info!(
        order_id = %order.id,
        product_id = %product_id,
        user_id = %user.user_id,
        total = %order.total,
        "Order placed"
    );

    Ok(reply(
        StatusCode::CREATED,
        "Order placed",
        Placed {
            order_id: order.id,
            total: order.total,
        },
    ))
}

/// List the caller's orders, newest first.
pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.db())
        .list_for_user(user.user_id, query.product_id)
        .await?;

    Ok(Json(orders))
}
