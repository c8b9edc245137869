//! HTTP handlers for Products API

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Multipart, OriginalUri, Query, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AppError, IdPath, JsonBody, ValidatedJson,
    errors::responses::{
        BadRequestIdResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::ProductResult;
use crate::media::Upload;
use crate::models::{CartItem, CartItemPayload, ProductStats};
use crate::query::{ListParams, ProductPage};
use crate::repository::ProductRepository;
use crate::serializer::{ProductPayload, ProductView};
use crate::service::ProductService;

/// OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        create_product_new,
        get_product,
        replace_product,
        patch_product,
        delete_product,
        product_stats,
        add_cart_item,
    ),
    components(
        schemas(
            ProductView, ProductPayload, ProductPage, ProductStats,
            CartItem, CartItemPayload, DeleteRequest
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestIdResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints")
    )
)]
pub struct ApiDoc;

/// Create the products router with all HTTP endpoints
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/new", post(create_product_new))
        .route(
            "/{id}",
            get(get_product)
                .put(replace_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .route("/{id}/stats", get(product_stats))
        .route("/{id}/cart-items", post(add_cart_item))
        .with_state(shared_service)
}

/// Product write body, sent as JSON or as `multipart/form-data`.
///
/// In a multipart body, `photo` and `warranty` parts carrying a filename are
/// file uploads; every other part is read as text.
struct ProductForm(ProductPayload);

impl ProductForm {
    fn is_multipart(req: &Request) -> bool {
        req.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"))
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<ProductPayload, AppError> {
        let mut payload = ProductPayload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            match (name.as_str(), file_name) {
                // browsers send an empty, unnamed part when no file was chosen
                ("photo" | "warranty", Some(file_name)) if file_name.is_empty() && bytes.is_empty() => {}
                ("photo" | "warranty", Some(file_name)) => {
                    let upload = Upload {
                        file_name: Some(file_name),
                        content_type,
                        bytes: bytes.to_vec(),
                    };
                    if name == "photo" {
                        payload.photo_file = Some(upload);
                    } else {
                        payload.warranty_file = Some(upload);
                    }
                }
                _ => {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                        AppError::BadRequest(format!("Form field '{}' is not valid UTF-8", name))
                    })?;
                    payload.set_form_field(&name, text);
                }
            }
        }

        Ok(payload)
    }
}

impl<S> FromRequest<S> for ProductForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !Self::is_multipart(&req) {
            let JsonBody(payload) = JsonBody::<ProductPayload>::from_request(req, state).await?;
            return Ok(Self(payload));
        }

        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Self::from_multipart(multipart).await.map(Self)
    }
}

/// List products with optional filters, search and pagination
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(ListParams),
    responses(
        (status = 200, description = "One page of products", body = ProductPage),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    OriginalUri(uri): OriginalUri,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProductResult<Json<ProductPage>> {
    let page = service.list_products(uri.path(), &pairs).await?;
    Ok(Json(page))
}

/// Create a new product
///
/// A multipart body may carry the photo as an image file part.
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body(content(
        (ProductPayload = "application/json"),
        (ProductPayload = "multipart/form-data")
    )),
    responses(
        (status = 201, description = "Product created successfully", body = ProductView),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    ProductForm(payload): ProductForm,
) -> ProductResult<impl IntoResponse> {
    let product = service.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Create a new product (legacy path)
#[utoipa::path(
    post,
    path = "/new",
    tag = "Products",
    request_body(content(
        (ProductPayload = "application/json"),
        (ProductPayload = "multipart/form-data")
    )),
    responses(
        (status = 201, description = "Product created successfully", body = ProductView),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product_new<R: ProductRepository>(
    state: State<Arc<ProductService<R>>>,
    body: ProductForm,
) -> ProductResult<impl IntoResponse> {
    create_product(state, body).await
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = ProductView),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<ProductView>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Replace a product's writable fields
///
/// `name`, `description` and `price` are required. An optional `warranty`
/// is appended to the description; in a multipart body it may be a text
/// file part.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body(content(
        (ProductPayload = "application/json"),
        (ProductPayload = "multipart/form-data")
    )),
    responses(
        (status = 200, description = "Product updated successfully", body = ProductView),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn replace_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    ProductForm(payload): ProductForm,
) -> ProductResult<Json<ProductView>> {
    let product = service.update_product(id, payload, false).await?;
    Ok(Json(product))
}

/// Update some of a product's fields
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body(content(
        (ProductPayload = "application/json"),
        (ProductPayload = "multipart/form-data")
    )),
    responses(
        (status = 200, description = "Product updated successfully", body = ProductView),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn patch_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    ProductForm(payload): ProductForm,
) -> ProductResult<Json<ProductView>> {
    let product = service.update_product(id, payload, true).await?;
    Ok(Json(product))
}

/// Optional body of a delete request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeleteRequest {
    /// Selects the cache entry to evict; defaults to the path id
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 5)]
    pub id: Option<Value>,
}

impl DeleteRequest {
    fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid delete body: {}", e)))
    }

    fn cache_id(&self, path_id: i64) -> String {
        match &self.id {
            None | Some(Value::Null) => path_id.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Delete a product
///
/// The evicted cache entry is keyed by the body's `id`, which may differ
/// from the deleted product.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body(content = DeleteRequest, description = "Optional cache key override"),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let request = DeleteRequest::from_body(&body)?;
    service.delete_product(id, &request.cache_id(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sales statistics for a product
#[utoipa::path(
    get,
    path = "/{id}/stats",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Daily statistics", body = ProductStats),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn product_stats<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<ProductStats>> {
    let stats = service.product_stats(id).await?;
    Ok(Json(stats))
}

/// Add a product to a shopping cart
#[utoipa::path(
    post,
    path = "/{id}/cart-items",
    tag = "Products",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = CartItemPayload,
    responses(
        (status = 201, description = "Cart item created", body = CartItem),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn add_cart_item<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(payload): ValidatedJson<CartItemPayload>,
) -> ProductResult<impl IntoResponse> {
    let item = service.add_cart_item(id, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}
