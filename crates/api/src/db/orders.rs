//! Order repository for database operations.

use chrono::Utc;
use thiserror::Error;

use mercado_core::{OrderId, Price, PriceError, ProductId, Quantity, UserId};

use super::{Database, RepositoryError};
use crate::models::order::Order;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The product tracks stock and has fewer units than requested.
    #[error("insufficient stock: {available} available")]
    InsufficientStock {
        /// Units on hand.
        available: i64,
    },

    /// Price times quantity does not fit a decimal.
    #[error("invalid order total: {0}")]
    Total(#[from] PriceError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::from_sqlx(err))
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    db: &'a Database,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record an order for `quantity` units of a product.
    ///
    /// The stock decrement is the first statement of the transaction, so the
    /// write lock is taken before anything is read and concurrent checkouts
    /// queue on the busy timeout instead of failing. The order insert
    /// commits together with the decrement.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::ProductNotFound` if the product does not exist.
    /// Returns `PlaceOrderError::InsufficientStock` if stock is tracked and too low.
    /// Returns `PlaceOrderError::Repository` for database errors.
    pub async fn place(
        &self,
        product_id: ProductId,
        user_id: UserId,
        quantity: Quantity,
    ) -> Result<Order, PlaceOrderError> {
        self.db
            .bounded(async {
                let mut tx = self.db.begin().await?;

                // NULL stock is untracked and stays NULL.
                let price = sqlx::query_scalar::<_, Price>(
                    r"
                    UPDATE products
                    SET stock = stock - ?
                    WHERE id = ? AND (stock IS NULL OR stock >= ?)
                    RETURNING price
                    ",
                )
                .bind(quantity)
                .bind(product_id)
                .bind(quantity)
                .fetch_optional(&mut *tx)
                .await?;

                let Some(price) = price else {
                    let stock =
                        sqlx::query_scalar::<_, Option<i64>>("SELECT stock FROM products WHERE id = ?")
                            .bind(product_id)
                            .fetch_optional(&mut *tx)
                            .await?;
                    return Err(match stock {
                        Some(Some(available)) => PlaceOrderError::InsufficientStock { available },
                        _ => PlaceOrderError::ProductNotFound,
                    });
                };

                let total = price.total_for(quantity)?;
                let created_at = Utc::now();

                let result = sqlx::query(
                    r"
                    INSERT INTO orders (product_id, user_id, quantity, total, created_at)
                    VALUES (?, ?, ?, ?, ?)
                    ",
                )
                .bind(product_id)
                .bind(user_id)
                .bind(quantity)
                .bind(total)
                .bind(created_at)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;

                Ok(Order {
                    id: OrderId::new(result.last_insert_rowid()),
                    product_id,
                    user_id: Some(user_id),
                    quantity,
                    total,
                    created_at,
                })
            })
            .await
    }

    /// List a user's orders, newest first, optionally for one product only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        product_id: Option<ProductId>,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.db
            .query_all(
                sqlx::query_as(
                    r"
                    SELECT id, product_id, user_id, quantity, total, created_at
                    FROM orders
                    WHERE user_id = ? AND (? IS NULL OR product_id = ?)
                    ORDER BY id DESC
                    ",
                )
                .bind(user_id)
                .bind(product_id)
                .bind(product_id),
            )
            .await
    }
}
