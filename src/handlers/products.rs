use std::str::FromStr;

use actix_web::{web, HttpResponse, Scope};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::page::{ProductSortField, Sort, SortDirection, DEFAULT_PAGE_SIZE};
use crate::domain::product::{Product, ProductDraft, ProductFilter};
use crate::errors::{AppError, ErrorBody};

use super::{blocking, money, AppState, DecimalInput, PageParams, PageResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Non-negative decimal, as a number or a string.
    #[schema(value_type = String, example = "9.99")]
    pub price: DecimalInput,
    pub category: Option<String>,
    pub stock_quantity: i32,
    /// Defaults to true.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ProductRequest {
    fn into_draft(self) -> Result<ProductDraft, DomainError> {
        Ok(ProductDraft {
            price: self.price.parse("price")?,
            name: self.name,
            description: self.description,
            category: self.category,
            stock_quantity: self.stock_quantity,
            active: self.active,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockAdjustmentRequest {
    /// Signed change applied to the current stock.
    pub delta: i32,
}

/// Filters and paging for `GET /products`.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
}

fn price_bound(value: Option<&str>, field: &str) -> Result<Option<BigDecimal>, DomainError> {
    value
        .map(|raw| {
            BigDecimal::from_str(raw.trim())
                .map_err(|_| DomainError::InvalidInput(format!("{field} is not a decimal: '{raw}'")))
        })
        .transpose()
}

impl ProductListQuery {
    fn filter(&self) -> Result<ProductFilter, DomainError> {
        let blank_to_none = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Ok(ProductFilter {
            name: blank_to_none(&self.name),
            category: blank_to_none(&self.category),
            min_price: price_bound(self.min_price.as_deref(), "min_price")?,
            max_price: price_bound(self.max_price.as_deref(), "max_price")?,
            active: self.active,
        })
    }

    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page.unwrap_or(1),
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort: self.sort.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            price: money(&p.price),
            name: p.name,
            description: p.description,
            category: p.category,
            stock_quantity: p.stock_quantity,
            active: p.active,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// Catalog routes, mounted under both `/products` and `/api/v1/products`.
pub fn products_scope(prefix: &str) -> Scope {
    web::scope(prefix)
        .route("", web::get().to(list_products))
        .route("", web::post().to(create_product))
        .route("/{id}", web::get().to(get_product))
        .route("/{id}", web::put().to(update_product))
        .route("/{id}", web::delete().to(delete_product))
        .route("/{id}/stock", web::patch().to(adjust_stock))
}

#[utoipa::path(
    get,
    path = "/products",
    params(
        ("name" = Option<String>, Query, description = "Case-insensitive name substring"),
        ("category" = Option<String>, Query, description = "Case-insensitive category"),
        ("min_price" = Option<String>, Query, description = "Lowest price, inclusive"),
        ("max_price" = Option<String>, Query, description = "Highest price, inclusive"),
        ("active" = Option<bool>, Query, description = "Only active or inactive products"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("size" = Option<i64>, Query, description = "Items per page (default 10, max 100)"),
        ("sort" = Option<String>, Query, description = "id|name|price|stock_quantity|created_at, optionally followed by ,asc or ,desc (default id,asc)"),
    ),
    responses(
        (status = 200, description = "Page of products", body = PageResponse<ProductResponse>),
        (status = 400, description = "Bad filter or sort", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let page = query
        .page_params()
        .to_request(Sort::new(ProductSortField::Id, SortDirection::Asc))?;
    let result = blocking(move || state.catalog.list_products(&filter, &page)).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from_page(result, ProductResponse::from)))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = blocking(move || state.catalog.get_product(id)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let draft = body.into_inner().into_draft()?;
    let product = blocking(move || state.catalog.create_product(draft)).await?;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// Replaces every editable field. Lines already on orders keep their price.
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let draft = body.into_inner().into_draft()?;
    let product = blocking(move || state.catalog.update_product(id, draft)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    patch,
    path = "/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorBody),
        (status = 409, description = "Stock would go below zero", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<StockAdjustmentRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let delta = body.delta;
    let product = blocking(move || state.catalog.adjust_stock(id, delta)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = ErrorBody),
        (status = 409, description = "Product is on an open order", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn delete_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    blocking(move || state.catalog.delete_product(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::handlers::configure;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn stock_scenario_over_http() {
        let state = web::Data::new(AppState::in_memory());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "P2", "price": 4.5, "stock_quantity": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let product: Value = test::read_body_json(resp).await;
        assert_eq!(product["price"], "4.50");
        assert_eq!(product["active"], true);
        let id = product["id"].as_str().unwrap().to_string();

        for (delta, expected) in [(5, 5), (-5, 0)] {
            let req = test::TestRequest::patch()
                .uri(&format!("/products/{id}/stock"))
                .set_json(json!({ "delta": delta }))
                .to_request();
            let product: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(product["stock_quantity"], expected);
        }

        let req = test::TestRequest::patch()
            .uri(&format!("/products/{id}/stock"))
            .set_json(json!({ "delta": -1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/products/{id}"))
            .to_request();
        let product: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(product["stock_quantity"], 0);
    }

    #[actix_web::test]
    async fn list_applies_query_filters() {
        let state = web::Data::new(AppState::in_memory());
        for (name, price, category) in [
            ("Espresso", "4.00", "Drinks"),
            ("Cold Brew", "7.50", "drinks"),
            ("Cheesecake", "12.00", "Desserts"),
        ] {
            state
                .catalog
                .create_product(ProductDraft {
                    name: name.to_string(),
                    description: None,
                    price: price.parse().unwrap(),
                    category: Some(category.to_string()),
                    stock_quantity: 1,
                    active: true,
                })
                .unwrap();
        }
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/products?category=DRINKS&sort=price,desc")
            .to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["items"][0]["name"], "Cold Brew");

        let req = test::TestRequest::get()
            .uri("/products?min_price=5&max_price=10")
            .to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 1);

        let req = test::TestRequest::get()
            .uri("/products?min_price=10&max_price=5")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn product_on_open_order_cannot_be_deleted() {
        let state = web::Data::new(AppState::in_memory());
        let product = state
            .catalog
            .create_product(ProductDraft {
                name: "Coffee".to_string(),
                description: None,
                price: "3.00".parse().unwrap(),
                category: None,
                stock_quantity: 1,
                active: true,
            })
            .unwrap();
        let order = state.orders.create_order("Maria", None).unwrap();
        state.orders.add_item(order.id(), product.id, 1).unwrap();
        let app = app!(state);

        let req = test::TestRequest::delete()
            .uri(&format!("/products/{}", product.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "PRODUCT_IN_USE");

        state.orders.close(order.id()).unwrap();
        let req = test::TestRequest::delete()
            .uri(&format!("/products/{}", product.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn invalid_product_is_rejected() {
        let state = web::Data::new(AppState::in_memory());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "X", "price": "1.00", "stock_quantity": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "Coffee", "price": "abc", "stock_quantity": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
