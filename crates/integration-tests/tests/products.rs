//! Catalog CRUD and image uploads through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use mercado_integration_tests::{BASE_URL, Part, TestApp, multipart_body};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

fn image(file_name: &str) -> Part<'_> {
    Part::File {
        name: "image",
        file_name,
        content_type: "image/png",
        bytes: PNG,
    }
}

#[tokio::test]
async fn test_create_and_show_product() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = app
        .json(
            Method::POST,
            "/products",
            Some(&token),
            &json!({
                "name": "Mug",
                "categoryId": 2,
                "description": "Blue ceramic mug",
                "price": 19.99,
                "stock": 5
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["message"], "Product created");
    let id = res.body["id"].as_i64().unwrap();

    let res = app
        .call(Method::GET, &format!("/products/{id}"), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["id"], id);
    assert_eq!(res.body["name"], "Mug");
    assert_eq!(res.body["categoryId"], 2);
    assert_eq!(res.body["price"], "19.99");
    assert_eq!(res.body["stock"], 5);
    assert!(res.body["imageUrl"].is_null());
}

#[tokio::test]
async fn test_create_requires_fields() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = app
        .json(
            Method::POST,
            "/products",
            Some(&token),
            &json!({"name": "Mug", "categoryId": 0}),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let message = res.body["message"].as_str().unwrap();
    assert!(message.contains("description"), "{message}");
    assert!(message.contains("price"), "{message}");
    assert!(!message.contains("categoryId"), "{message}");
}

#[tokio::test]
async fn test_create_rejects_negative_price() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = app
        .json(
            Method::POST,
            "/products",
            Some(&token),
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": -1}),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_filter_by_category() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    for (name, category) in [("Mug", 1), ("Plate", 1), ("Lamp", 2)] {
        app.create_product(
            &token,
            &json!({"name": name, "categoryId": category, "description": "d", "price": "5.00"}),
        )
        .await;
    }

    let all = app.call(Method::GET, "/products", Some(&token)).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 3);

    let kitchen = app
        .call(Method::GET, "/products/category/1", Some(&token))
        .await;
    let names: Vec<&str> = kitchen
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Mug") && names.contains(&"Plate"));

    let empty = app
        .call(Method::GET, "/products/category/99", Some(&token))
        .await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body, json!([]));
}

#[tokio::test]
async fn test_partial_update_keeps_other_fields() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;
    let id = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "Blue", "price": 10, "stock": 3}),
        )
        .await;

    let res = app
        .json(
            Method::PUT,
            &format!("/products/{id}"),
            Some(&token),
            &json!({"price": "12.50"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Product updated");

    let product = app
        .call(Method::GET, &format!("/products/{id}"), Some(&token))
        .await
        .body;
    assert_eq!(product["price"], "12.50");
    assert_eq!(product["name"], "Mug");
    assert_eq!(product["description"], "Blue");
    assert_eq!(product["categoryId"], 1);
    assert_eq!(product["stock"], 3);
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = app
        .json(
            Method::PUT,
            "/products/4242",
            Some(&token),
            &json!({"name": "Ghost"}),
        )
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["message"], "Product not found");
}

#[tokio::test]
async fn test_delete_product() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;
    let id = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": 1}),
        )
        .await;

    let res = app
        .call(Method::DELETE, &format!("/products/{id}"), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Product deleted");

    let res = app
        .call(Method::GET, &format!("/products/{id}"), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .call(Method::DELETE, &format!("/products/{id}"), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_bad_request() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = app.call(Method::GET, "/products/abc", Some(&token)).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_multipart_create_stores_and_serves_image() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let body = multipart_body(&[
        Part::Text("name", "Mug"),
        Part::Text("categoryId", "1"),
        Part::Text("description", "With a picture"),
        Part::Text("price", "9.90"),
        Part::File {
            name: "image",
            file_name: "mug.png",
            content_type: "image/png",
            bytes: PNG,
        },
    ]);
    let res = app.multipart(Method::POST, "/products", &token, body).await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    let id = res.body["id"].as_i64().unwrap();

    let product = app
        .call(Method::GET, &format!("/products/{id}"), Some(&token))
        .await
        .body;
    let image_url = product["imageUrl"].as_str().unwrap();
    let path = image_url.strip_prefix(BASE_URL).unwrap();
    assert!(path.starts_with("uploads/"), "{image_url}");
    assert!(path.ends_with("mug.png"), "{image_url}");

    let file_name = path.strip_prefix("uploads/").unwrap();
    assert_eq!(
        std::fs::read(app.upload_dir().join(file_name)).unwrap(),
        PNG
    );

    let served = app.call(Method::GET, &format!("/{path}"), None).await;
    assert_eq!(served.status, StatusCode::OK);
}

#[tokio::test]
async fn test_multipart_rejects_unsupported_type() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let body = multipart_body(&[
        Part::Text("name", "Notes"),
        Part::Text("categoryId", "1"),
        Part::Text("description", "Text file"),
        Part::Text("price", "1"),
        Part::File {
            name: "image",
            file_name: "notes.txt",
            content_type: "text/plain",
            bytes: b"hello",
        },
    ]);
    let res = app.multipart(Method::POST, "/products", &token, body).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(app.upload_dir()).unwrap().count(), 0);
    let list = app.call(Method::GET, "/products", Some(&token)).await;
    assert_eq!(list.body, json!([]));
}

#[tokio::test]
async fn test_image_replaced_and_removed() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let body = multipart_body(&[
        Part::Text("name", "Mug"),
        Part::Text("categoryId", "1"),
        Part::Text("description", "d"),
        Part::Text("price", "1"),
        image("first.png"),
    ]);
    let id = app
        .multipart(Method::POST, "/products", &token, body)
        .await
        .body["id"]
        .as_i64()
        .unwrap();

    let body = multipart_body(&[image("second.png")]);
    let res = app
        .multipart(Method::PUT, &format!("/products/{id}"), &token, body)
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);

    let files: Vec<String> = std::fs::read_dir(app.upload_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("second.png"));

    app.call(Method::DELETE, &format!("/products/{id}"), Some(&token))
        .await;
    assert_eq!(std::fs::read_dir(app.upload_dir()).unwrap().count(), 0);
}
