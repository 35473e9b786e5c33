//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mercado_core::{OrderId, Price, ProductId, Quantity, UserId};

/// A completed checkout. Orders are never updated or deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    /// Buyer, `None` only for rows written without an authenticated user.
    pub user_id: Option<UserId>,
    pub quantity: Quantity,
    /// Unit price times quantity at the time of checkout.
    pub total: Price,
    pub created_at: DateTime<Utc>,
}
