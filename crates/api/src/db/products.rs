//! Product repository for database operations.
//!
//! Products and their image rows are always written in one transaction.

use chrono::Utc;

use mercado_core::{CategoryId, ProductId};

use super::{Database, RepositoryError};
use crate::models::product::{NewProduct, Product, ProductChanges};

const SELECT_PRODUCTS: &str = r"
    SELECT p.id, p.name, p.category_id, p.description, p.price, p.stock,
           i.path AS image_path, p.created_at
    FROM products p
    LEFT JOIN images i ON i.product_id = p.id
";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    db: &'a Database,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// List every product in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{SELECT_PRODUCTS} ORDER BY p.id");
        self.db.query_all(sqlx::query_as(&sql)).await
    }

    /// List the products of one category in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{SELECT_PRODUCTS} WHERE p.category_id = ? ORDER BY p.id");
        self.db
            .query_all(sqlx::query_as(&sql).bind(category_id))
            .await
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{SELECT_PRODUCTS} WHERE p.id = ?");
        self.db.query_one(sqlx::query_as(&sql).bind(id)).await
    }

    /// Insert a product and, when given, its image row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if either insert fails; nothing is written
    /// in that case.
    pub async fn create(
        &self,
        product: &NewProduct,
        image_path: Option<&str>,
    ) -> Result<ProductId, RepositoryError> {
        self.db
            .bounded(async {
                let mut tx = self.db.begin().await?;

                let result = sqlx::query(
                    r"
                    INSERT INTO products (name, category_id, description, price, stock, created_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ",
                )
                .bind(&product.name)
                .bind(product.category_id)
                .bind(&product.description)
                .bind(product.price)
                .bind(product.stock)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(RepositoryError::from_sqlx)?;

                let id = ProductId::new(result.last_insert_rowid());

                if let Some(path) = image_path {
                    sqlx::query("INSERT INTO images (product_id, path) VALUES (?, ?)")
                        .bind(id)
                        .bind(path)
                        .execute(&mut *tx)
                        .await
                        .map_err(RepositoryError::from_sqlx)?;
                }

                tx.commit().await?;
                Ok(id)
            })
            .await
    }

    /// Apply a partial update; fields left as `None` keep their stored value.
    ///
    /// When `image_path` is given it replaces the current image row. Returns
    /// the path of the superseded image, if there was one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
        image_path: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        self.db
            .bounded(async {
                let mut tx = self.db.begin().await?;

                let result = sqlx::query(
                    r"
                    UPDATE products
                    SET name = COALESCE(?, name),
                        category_id = COALESCE(?, category_id),
                        description = COALESCE(?, description),
                        price = COALESCE(?, price),
                        stock = COALESCE(?, stock)
                    WHERE id = ?
                    ",
                )
                .bind(changes.name.as_deref())
                .bind(changes.category_id)
                .bind(changes.description.as_deref())
                .bind(changes.price)
                .bind(changes.stock)
                .bind(id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound);
                }

                let mut replaced = None;
                if let Some(path) = image_path {
                    replaced = sqlx::query_scalar::<_, String>(
                        "DELETE FROM images WHERE product_id = ? RETURNING path",
                    )
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;

                    sqlx::query("INSERT INTO images (product_id, path) VALUES (?, ?)")
                        .bind(id)
                        .bind(path)
                        .execute(&mut *tx)
                        .await
                        .map_err(RepositoryError::from_sqlx)?;
                }

                tx.commit().await?;
                Ok(replaced)
            })
            .await
    }

    /// Delete a product and its image row.
    ///
    /// Returns the path of the removed image, if there was one. Orders that
    /// reference the product are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID; the
    /// store is left unchanged.
    pub async fn delete(&self, id: ProductId) -> Result<Option<String>, RepositoryError> {
        self.db
            .bounded(async {
                let mut tx = self.db.begin().await?;

                let image = sqlx::query_scalar::<_, String>(
                    "DELETE FROM images WHERE product_id = ? RETURNING path",
                )
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

                let result = sqlx::query("DELETE FROM products WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound);
                }

                tx.commit().await?;
                Ok(image)
            })
            .await
    }
}
