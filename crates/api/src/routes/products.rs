//! Product catalog handlers.
//!
//! Create and update accept either a JSON body or `multipart/form-data`
//! with the same fields as text parts plus an optional `image` file part.

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use mercado_core::{CategoryId, Price, ProductId};

use super::{NoData, reply};
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::models::product::{NewProduct, ProductChanges, ProductView};
use crate::services::uploads::{ImageUpload, UploadError};
use crate::state::AppState;
use crate::validation::{Required, ValidationError, check_stock, non_blank};

/// Name of the multipart part carrying the image.
const IMAGE_PART: &str = "image";

/// Product fields as sent by clients. Every field is optional here; create
/// decides which ones are required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    #[serde(alias = "nome")]
    pub name: Option<String>,
    #[serde(alias = "category_id", alias = "category", alias = "categoria")]
    pub category_id: Option<CategoryId>,
    #[serde(alias = "descricao")]
    pub description: Option<String>,
    #[serde(alias = "preco")]
    pub price: Option<Price>,
    #[serde(alias = "estoque")]
    pub stock: Option<i64>,
}

impl ProductFields {
    /// Set a field from a multipart text part. Unknown names are ignored.
    fn set_text(&mut self, name: &str, value: String) -> std::result::Result<(), ValidationError> {
        match name {
            "name" | "nome" => self.name = Some(value),
            "categoryId" | "category_id" | "category" | "categoria" => {
                self.category_id = parse_optional(&value, "categoryId")?.map(CategoryId::new);
            }
            "description" | "descricao" => self.description = Some(value),
            "price" | "preco" => {
                self.price = match value.trim() {
                    "" => None,
                    text => Some(
                        text.parse::<Price>()
                            .map_err(|e| ValidationError::invalid("price", e.to_string()))?,
                    ),
                };
            }
            "stock" | "estoque" => self.stock = parse_optional(&value, "stock")?,
            _ => {}
        }
        Ok(())
    }
}

fn parse_optional(
    value: &str,
    field: &'static str,
) -> std::result::Result<Option<i64>, ValidationError> {
    match value.trim() {
        "" => Ok(None),
        text => text
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::invalid(field, "must be an integer")),
    }
}

/// Product fields plus the optional image, from JSON or multipart.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub fields: ProductFields,
    pub image: Option<ImageUpload>,
}

impl<S> FromRequest<S> for ProductForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let ApiJson(fields) = ApiJson::<ProductFields>::from_request(req, state).await?;
            return Ok(Self {
                fields,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| UploadError::Multipart(e.body_text()))?;

        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| UploadError::Multipart(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_PART {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Multipart(e.body_text()))?;

                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
                    continue;
                }

                form.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| UploadError::Multipart(e.body_text()))?;
                form.fields.set_text(&name, value)?;
            }
        }

        Ok(form)
    }
}

#[derive(Debug, Serialize)]
struct Created {
    id: ProductId,
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
        other => AppError::Database(other),
    }
}

/// List all products.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let base_url = &state.config().public_base_url;
    let products = ProductRepository::new(state.db()).list().await?;

    Ok(Json(
        products
            .into_iter()
            .map(|p| ProductView::from_product(p, base_url))
            .collect(),
    ))
}

/// List the products of one category.
pub async fn list_by_category(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> Result<Json<Vec<ProductView>>> {
    let base_url = &state.config().public_base_url;
    let products = ProductRepository::new(state.db())
        .list_by_category(category_id)
        .await?;

    Ok(Json(
        products
            .into_iter()
            .map(|p| ProductView::from_product(p, base_url))
            .collect(),
    ))
}

/// Show one product.
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.db())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductView::from_product(
        product,
        &state.config().public_base_url,
    )))
}

/// Create a product, storing its image if one was sent.
pub async fn create(
    State(state): State<AppState>,
    form: ProductForm,
) -> Result<impl IntoResponse> {
    let fields = form.fields;

    let mut required = Required::default();
    let name = required.take("name", fields.name);
    let category_id = required.take("categoryId", fields.category_id);
    let description = required.take("description", fields.description);
    let price = required.take("price", fields.price);
    let (Some(name), Some(category_id), Some(description), Some(price)) =
        (name, category_id, description, price)
    else {
        return Err(required.into_error().into());
    };

    let product = NewProduct {
        name: name.trim().to_string(),
        category_id,
        description,
        price,
        stock: check_stock(fields.stock)?,
    };

    let images = state.images();
    let image_path = match &form.image {
        Some(upload) => Some(images.save(upload).await?),
        None => None,
    };

    let created = ProductRepository::new(state.db())
        .create(&product, image_path.as_deref())
        .await;

    let id = match created {
        Ok(id) => id,
        Err(e) => {
            if let Some(path) = &image_path {
                images.remove(path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %id, has_image = image_path.is_some(), "Product created");
    Ok(reply(StatusCode::CREATED, "Product created", Created { id }))
}

/// Update the given fields of a product; omitted fields keep their values.
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    form: ProductForm,
) -> Result<impl IntoResponse> {
    let fields = form.fields;
    let changes = ProductChanges {
        name: non_blank(fields.name).map(|n| n.trim().to_string()),
        category_id: fields.category_id,
        description: non_blank(fields.description),
        price: fields.price,
        stock: check_stock(fields.stock)?,
    };

    let images = state.images();
    let image_path = match &form.image {
        Some(upload) => Some(images.save(upload).await?),
        None => None,
    };

    let updated = ProductRepository::new(state.db())
        .update(id, &changes, image_path.as_deref())
        .await;

    match updated {
        Ok(replaced) => {
            if let Some(old) = replaced {
                images.remove(&old).await;
            }
        }
        Err(e) => {
            if let Some(path) = &image_path {
                images.remove(path).await;
            }
            return Err(not_found(e));
        }
    }

    tracing::info!(product_id = %id, "Product updated");
    Ok(reply(StatusCode::OK, "Product updated", NoData {}))
}

/// Delete a product and its image.
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<impl IntoResponse> {
    let removed = ProductRepository::new(state.db())
        .delete(id)
        .await
        .map_err(not_found)?;

    if let Some(path) = removed {
        state.images().remove(&path).await;
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(reply(StatusCode::OK, "Product deleted", NoData {}))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_aliases() {
        let fields: ProductFields = serde_json::from_str(
            r#"{"nome": "Caneca", "categoria": 3, "descricao": "Azul", "preco": 19.99}"#,
        )
        .unwrap();
        assert_eq!(fields.name.as_deref(), Some("Caneca"));
        assert_eq!(fields.category_id, Some(CategoryId::new(3)));
        assert_eq!(fields.description.as_deref(), Some("Azul"));
        assert_eq!(fields.price.unwrap().to_string(), "19.99");
    }

    #[test]
    fn test_multipart_text_fields() {
        let mut fields = ProductFields::default();
        fields.set_text("name", "Mug".to_string()).unwrap();
        fields.set_text("categoryId", "0".to_string()).unwrap();
        fields.set_text("price", " 12.50 ".to_string()).unwrap();
        fields.set_text("stock", "".to_string()).unwrap();
        fields.set_text("unrelated", "ignored".to_string()).unwrap();

        assert_eq!(fields.name.as_deref(), Some("Mug"));
        assert_eq!(fields.category_id, Some(CategoryId::new(0)));
        assert_eq!(fields.price.unwrap().to_string(), "12.50");
        assert_eq!(fields.stock, None);
    }

    #[test]
    fn test_multipart_bad_numbers() {
        let mut fields = ProductFields::default();
        assert!(fields.set_text("categoryId", "abc".to_string()).is_err());
        assert!(fields.set_text("price", "-1".to_string()).is_err());
        assert!(fields.set_text("stock", "1.5".to_string()).is_err());
    }
}
