//! Handler tests for Products domain
//!
//! These tests drive the products router end to end against the in-memory
//! repository and cache:
//! - Request deserialization and validation errors
//! - Response serialization (derived `is_on_sale` / `current_price`)
//! - HTTP status codes
//! - Cache side effects of update and delete
//! - `multipart/form-data` uploads of photos and warranty files

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use domain_products::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For oneshot()

struct TestApp {
    app: Router,
    repo: InMemoryProductRepository,
    cache: InMemoryProductCache,
    media: InMemoryMediaStorage,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 8, 16, 12, 10, 0).unwrap()
}

fn test_app() -> TestApp {
    let repo = InMemoryProductRepository::new();
    let cache = InMemoryProductCache::new();
    let media = InMemoryMediaStorage::new();
    let service = ProductService::new(repo.clone(), cache.clone())
        .with_media(media.clone())
        .with_clock(FixedClock(now()));

    TestApp {
        app: handlers::router(service),
        repo,
        cache,
        media,
    }
}

fn new_product(name: &str, on_sale: bool) -> NewProduct {
    let (sale_start, sale_end) = if on_sale {
        (
            Some(now() - Duration::days(1)),
            Some(now() + Duration::days(1)),
        )
    } else {
        (None, None)
    };

    NewProduct {
        name: name.to_string(),
        description: format!("{} description", name),
        price: "20.00".parse().unwrap(),
        sale_start,
        sale_end,
        photo: None,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

const BOUNDARY: &str = "product-form-boundary";

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// Helper to parse JSON response body
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_product_returns_201_with_derived_fields() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/",
            json!({
                "name": "New product",
                "description": "New awesome product",
                "price": "123.45"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["name"], "New product");
    assert_eq!(body["description"], "New awesome product");
    assert_eq!(body["price"], "123.45");
    assert_eq!(body["is_on_sale"], false);
    assert_eq!(body["current_price"], 123.45);
    assert_eq!(body["cart_items"], json!([]));
    assert_eq!(body["photo"], Value::Null);
}

#[tokio::test]
async fn test_create_via_new_path() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/new",
            json!({
                "name": "Lamp",
                "description": "Desk lamp",
                "price": 15,
                "sale_start": "12:10 PM 15 August 2022",
                "sale_end": "12:10 PM 17 August 2022"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["price"], "15.00");
    assert_eq!(body["sale_start"], "12:10 PM 15 August 2022");
    assert_eq!(body["is_on_sale"], true);
    assert_eq!(body["current_price"], 13.5);
}

#[tokio::test]
async fn test_create_never_writes_cache() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "name": "Lamp", "description": "Desk lamp", "price": "10" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(t.cache.is_empty().await);
}

#[tokio::test]
async fn test_create_rejects_non_positive_price_first() {
    let t = test_app();

    for price in [json!("0"), json!("-12.50"), json!(-1)] {
        let response = t
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/",
                json!({ "name": "", "description": "x", "price": price }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["details"], json!({ "price": ["Must be above $0.0"] }));
    }

    let (count, _) = t
        .repo
        .list(&ProductQuery::default(), now())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_create_rejects_invalid_numbers_and_out_of_range_prices() {
    let t = test_app();

    let cases = [
        (json!("abc"), "A valid number is required."),
        (json!("0.99"), "Ensure this value is greater than or equal to 1.00."),
        (json!("100000.01"), "Ensure this value is less than or equal to 100000.00."),
        (json!("10.001"), "Ensure that there are no more than 2 decimal places."),
    ];

    for (price, message) in cases {
        let response = t
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/",
                json!({ "name": "Lamp", "description": "Desk lamp", "price": price }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["price"], json!([message]));
    }
}

#[tokio::test]
async fn test_create_rejects_prices_beyond_decimal() {
    let t = test_app();

    let cases = [
        (json!("-1e30"), "Must be above $0.0"),
        (json!(-1e30), "Must be above $0.0"),
        (json!("-inf"), "Must be above $0.0"),
        (json!("1e30"), "Ensure this value is less than or equal to 100000.00."),
        (json!(1e30), "Ensure this value is less than or equal to 100000.00."),
    ];

    for (price, message) in cases {
        let response = t
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/",
                json!({ "name": "Lamp", "description": "Desk lamp", "price": price }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["details"], json!({ "price": [message] }), "price {}", price);
    }
}

#[tokio::test]
async fn test_abbreviated_sale_month_is_rejected() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/",
            json!({
                "name": "Lamp",
                "description": "Desk lamp",
                "price": "10",
                "sale_start": "12:10 PM 16 Aug 2022"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert!(body["details"]["sale_start"][0]
        .as_str()
        .unwrap()
        .starts_with("Datetime has wrong format"));
}

#[tokio::test]
async fn test_create_reports_all_field_errors() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/",
            json!({ "description": "x", "price": "10", "sale_end": "2022-08-16" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["details"]["name"], json!(["This field is required."]));
    assert_eq!(
        body["details"]["description"],
        json!(["Ensure this field has at least 2 characters."])
    );
    assert!(body["details"]["sale_end"][0]
        .as_str()
        .unwrap()
        .starts_with("Datetime has wrong format"));
}

#[tokio::test]
async fn test_create_discards_warranty() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/",
            json!({
                "name": "Lamp",
                "description": "Desk lamp",
                "price": "10",
                "warranty": "7 day return"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["description"], "Desk lamp");
    assert!(body.get("warranty").is_none());
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let t = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = t.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_product_not_found_and_invalid_id() {
    let t = test_app();

    let response = t.app.clone().oneshot(get("/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.app.oneshot(get("/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["error"], "INVALID_ID");
}

#[tokio::test]
async fn test_patch_with_warranty_appends_and_caches() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/{}", product.id),
            json!({ "warranty": ["7 day return"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expected = "Lamp description\n\nWarranty Information:\n7 day return";
    let body = json_body(response.into_body()).await;
    assert_eq!(body["description"], expected);

    let stored = t.repo.get_by_id(product.id).await.unwrap().unwrap();
    assert_eq!(stored.description, expected);

    let snapshot = t.cache.get(&cache_key(product.id)).await.unwrap();
    assert_eq!(snapshot.name, "Lamp");
    assert_eq!(snapshot.description, expected);
    assert_eq!(snapshot.price.to_string(), "20.00");
}

#[tokio::test]
async fn test_multipart_create_stores_photo() {
    let t = test_app();

    let response = t
        .app
        .oneshot(multipart_request(
            "POST",
            "/",
            &[
                Part::Text("name", "Lamp"),
                Part::Text("description", "Desk lamp"),
                Part::Text("price", "25.5"),
                Part::Text("sale_start", ""),
                Part::File("photo", "lamp.png", PNG),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["price"], "25.50");
    assert_eq!(body["sale_start"], Value::Null);

    let reference = body["photo"].as_str().unwrap();
    assert!(reference.starts_with("products/photos/"));
    assert!(reference.ends_with(".png"));
    assert_eq!(t.media.get(reference).await.as_deref(), Some(PNG));

    let stored = t.repo.get_by_id(body["id"].as_i64().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.photo.as_deref(), Some(reference));
}

#[tokio::test]
async fn test_multipart_patch_appends_warranty_file() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();

    let response = t
        .app
        .oneshot(multipart_request(
            "PATCH",
            &format!("/{}", product.id),
            &[Part::File(
                "warranty",
                "warranty.txt",
                b"7 day return\n1 year parts\n",
            )],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expected = "Lamp description\n\nWarranty Information:\n7 day return\n; 1 year parts\n";
    let body = json_body(response.into_body()).await;
    assert_eq!(body["description"], expected);

    let snapshot = t.cache.get(&cache_key(product.id)).await.unwrap();
    assert_eq!(snapshot.description, expected);
}

#[tokio::test]
async fn test_multipart_rejects_bad_files() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();
    let uri = format!("/{}", product.id);

    let response = t
        .app
        .clone()
        .oneshot(multipart_request(
            "PATCH",
            &uri,
            &[Part::File("warranty", "warranty.txt", &[0xff, 0xfe, 0x41])],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(
        body["details"],
        json!({ "warranty": ["The submitted file is not valid UTF-8 text."] })
    );

    let response = t
        .app
        .oneshot(multipart_request(
            "PATCH",
            &uri,
            &[Part::File("photo", "lamp.png", b"%PDF-1.7")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert!(body["details"]["photo"][0]
        .as_str()
        .unwrap()
        .starts_with("Upload a valid image."));

    assert!(t.media.is_empty().await);
    let stored = t.repo.get_by_id(product.id).await.unwrap().unwrap();
    assert_eq!(stored.description, "Lamp description");
    assert!(!t.cache.contains(&cache_key(product.id)).await);
}

#[tokio::test]
async fn test_put_replaces_fields_and_requires_core_fields() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", true)).await.unwrap();
    let uri = format!("/{}", product.id);

    let response = t
        .app
        .clone()
        .oneshot(json_request("PUT", &uri, json!({ "name": "Floor lamp" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(t.cache.is_empty().await);

    let response = t
        .app
        .oneshot(json_request(
            "PUT",
            &uri,
            json!({
                "name": "Floor lamp",
                "description": "Tall lamp",
                "price": "99.9",
                "sale_start": null,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["name"], "Floor lamp");
    assert_eq!(body["price"], "99.90");
    assert_eq!(body["sale_start"], Value::Null);
    assert_eq!(body["is_on_sale"], false);
    assert_eq!(body["current_price"], 99.9);
    assert!(t.cache.contains(&cache_key(product.id)).await);
}

#[tokio::test]
async fn test_update_missing_product_is_404() {
    let t = test_app();

    let response = t
        .app
        .oneshot(json_request("PATCH", "/7", json!({ "price": "10" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(t.cache.is_empty().await);
}

#[tokio::test]
async fn test_delete_evicts_cache_key_from_body() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();
    let snapshot = product.snapshot();
    t.cache.set(&cache_key(product.id), &snapshot).await.unwrap();
    t.cache.set(&cache_key(99), &snapshot).await.unwrap();

    let response = t
        .app
        .oneshot(json_request(
            "DELETE",
            &format!("/{}", product.id),
            json!({ "id": 99 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(t.repo.get_by_id(product.id).await.unwrap().is_none());
    assert!(!t.cache.contains("product_data_99").await);
    assert!(t.cache.contains(&cache_key(product.id)).await);
}

#[tokio::test]
async fn test_delete_without_body_evicts_path_key() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();
    t.cache
        .set(&cache_key(product.id), &product.snapshot())
        .await
        .unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", product.id))
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(t.cache.is_empty().await);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", product.id))
        .body(Body::empty())
        .unwrap();
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_on_sale_filter() {
    let t = test_app();
    t.repo.create(new_product("On sale", true)).await.unwrap();
    t.repo.create(new_product("Full price", false)).await.unwrap();

    let response = t.app.clone().oneshot(get("/?on_sale=false")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["count"], 2);

    let response = t.app.clone().oneshot(get("/?on_sale=True")).await.unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "On sale");
    assert_eq!(body["results"][0]["is_on_sale"], true);
    assert_eq!(body["results"][0]["current_price"], 18.0);

    let response = t.app.oneshot(get("/")).await.unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["next"], Value::Null);
    assert_eq!(body["previous"], Value::Null);
}

#[tokio::test]
async fn test_list_search_and_id_filter() {
    let t = test_app();
    t.repo.create(new_product("Mineral water", false)).await.unwrap();
    t.repo.create(new_product("Orange juice", false)).await.unwrap();

    let response = t
        .app
        .clone()
        .oneshot(get("/?search=WATER,description"))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Mineral water");

    let response = t.app.clone().oneshot(get("/?id=2")).await.unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Orange juice");

    let response = t.app.oneshot(get("/?id=two")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["details"], json!({ "id": ["Enter a number."] }));
}

#[tokio::test]
async fn test_list_pagination_links() {
    let t = test_app();
    for i in 0..12 {
        t.repo
            .create(new_product(&format!("Product {}", i), false))
            .await
            .unwrap();
    }
    let app = Router::new().nest("/api/v1/products", t.app);

    let response = app
        .clone()
        .oneshot(get("/api/v1/products?limit=5&offset=5&search=product"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["count"], 12);
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
    assert_eq!(body["results"][0]["id"], 6);
    assert_eq!(
        body["next"],
        "/api/v1/products?limit=5&offset=10&search=product"
    );
    assert_eq!(body["previous"], "/api/v1/products?limit=5&search=product");

    let response = app
        .oneshot(get("/api/v1/products?limit=500"))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();

    let response = t
        .app
        .clone()
        .oneshot(get(&format!("/{}/stats", product.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(
        body,
        json!({ "stats": { "2019-01-01": [5, 10, 15], "2019-01-02": [20, 1, 1] } })
    );

    let response = t.app.oneshot(get("/404/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_items_are_projected() {
    let t = test_app();
    let product = t.repo.create(new_product("Lamp", false)).await.unwrap();
    let uri = format!("/{}/cart-items", product.id);

    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "quantity": 0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .app
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "quantity": 3 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = t
        .app
        .oneshot(get(&format!("/{}", product.id)))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(
        body["cart_items"],
        json!([{ "product": product.id, "quantity": 3 }])
    );
}
