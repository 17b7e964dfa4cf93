use actix_web::{web, HttpResponse, Scope};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{LineItem, Order};
use crate::domain::page::{OrderSortField, Sort, SortDirection};
use crate::domain::payment::PaymentMethod;
use crate::errors::{AppError, ErrorBody};

use super::{blocking, money, AppState, DecimalInput, PageParams, PageResponse};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    /// Optional link to a registered customer.
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyDiscountRequest {
    /// Percentage between 0 and 100. Defaults to 0.
    #[schema(value_type = Option<String>, example = "10")]
    pub discount_percent: Option<DecimalInput>,
    /// Fixed amount subtracted after the percentage. Defaults to 0.
    #[schema(value_type = Option<String>, example = "2.00")]
    pub discount_amount: Option<DecimalInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// One of the names returned by `/comandas/payment-methods`.
    pub payment_method: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodQuery {
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_id: Option<Uuid>,
    pub status: String,
    pub created_at: String,
    pub closed_at: Option<String>,
    pub subtotal: String,
    pub discount_percent: String,
    pub discount_amount: String,
    pub total: String,
    pub payment_method: Option<String>,
    pub items: Vec<OrderItemResponse>,
}

impl From<&LineItem> for OrderItemResponse {
    fn from(line: &LineItem) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: money(&line.unit_price),
            line_total: money(&line.line_total()),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id(),
            customer_name: order.customer_name().to_string(),
            customer_id: order.customer_id(),
            status: order.status().to_string(),
            created_at: order.created_at().to_rfc3339(),
            closed_at: order.closed_at().map(|t| t.to_rfc3339()),
            subtotal: money(&order.subtotal()),
            discount_percent: money(order.discount().percent()),
            discount_amount: money(order.discount().amount()),
            total: money(&order.total()),
            payment_method: order.payment_method().map(|m| m.to_string()),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
        }
    }
}

// ── Routes ───────────────────────────────────────────────────────────────────

pub fn comandas_scope() -> Scope {
    web::scope("/comandas")
        .route("", web::get().to(list_orders))
        .route("", web::post().to(create_order))
        .route("/payment-methods", web::get().to(payment_methods))
        .route("/{id}", web::get().to(get_order))
        .route("/{id}", web::delete().to(delete_order))
        .route("/{id}/items", web::post().to(add_item))
        .route("/{id}/items/{item_id}", web::delete().to(remove_item))
        .route("/{id}/discount", web::patch().to(apply_discount))
        .route("/{id}/payment", web::patch().to(set_payment_method))
        .route("/{id}/checkout", web::patch().to(checkout))
        .route("/{id}/close", web::patch().to(close))
}

/// Shopping-cart alias over the same orders.
pub fn carts_scope() -> Scope {
    web::scope("/carts")
        .route("", web::get().to(list_orders))
        .route("", web::post().to(create_order))
        .route("/{id}", web::get().to(get_order))
        .route("/{id}/items", web::post().to(add_item))
        .route("/{id}/items/{item_id}", web::delete().to(remove_item))
        .route("/{id}/checkout", web::patch().to(checkout))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /comandas
#[utoipa::path(
    get,
    path = "/comandas",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("size" = Option<i64>, Query, description = "Items per page (default 10, max 100)"),
        ("sort" = Option<String>, Query, description = "created_at|customer_name|status|id, optionally followed by ,asc or ,desc (default created_at,desc)"),
    ),
    responses(
        (status = 200, description = "Page of orders with their items", body = PageResponse<OrderResponse>),
        (status = 400, description = "Unknown sort field or direction", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = query.to_request(Sort::new(OrderSortField::CreatedAt, SortDirection::Desc))?;
    let result = blocking(move || state.orders.list_orders(&page)).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from_page(result, OrderResponse::from)))
}

/// GET /comandas/{id}
#[utoipa::path(
    get,
    path = "/comandas/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = blocking(move || state.orders.get_order(id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /comandas
///
/// Opens a tab. `customer_name` is stored as given even when `customer_id`
/// links a registered customer.
#[utoipa::path(
    post,
    path = "/comandas",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order opened", body = OrderResponse),
        (status = 400, description = "Blank customer name", body = ErrorBody),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order = blocking(move || {
        state
            .orders
            .create_order(&body.customer_name, body.customer_id)
    })
    .await?;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// POST /comandas/{id}/items
#[utoipa::path(
    post,
    path = "/comandas/{id}/items",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added or merged into its line", body = OrderResponse),
        (status = 400, description = "Quantity below 1", body = ErrorBody),
        (status = 404, description = "Order or product not found", body = ErrorBody),
        (status = 409, description = "Order is closed", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let AddItemRequest {
        product_id,
        quantity,
    } = body.into_inner();
    let quantity = i32::try_from(quantity).map_err(|_| DomainError::InvalidQuantity(quantity))?;
    let order = blocking(move || state.orders.add_item(id, product_id, quantity)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /comandas/{id}/items/{item_id}
#[utoipa::path(
    delete,
    path = "/comandas/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("item_id" = Uuid, Path, description = "Line item UUID"),
    ),
    responses(
        (status = 200, description = "Line removed", body = OrderResponse),
        (status = 404, description = "Order or line item not found", body = ErrorBody),
        (status = 409, description = "Order is closed", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (id, item_id) = path.into_inner();
    let order = blocking(move || state.orders.remove_item(id, item_id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /comandas/{id}/discount
///
/// Replaces the current discount. Omitted fields count as zero.
#[utoipa::path(
    patch,
    path = "/comandas/{id}/discount",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = ApplyDiscountRequest,
    responses(
        (status = 200, description = "Discount applied", body = OrderResponse),
        (status = 400, description = "Percent outside 0..=100 or negative amount", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order is closed", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn apply_discount(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ApplyDiscountRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let parse = |value: &Option<DecimalInput>, field: &str| match value {
        Some(v) => v
            .parse(field)
            .map_err(|_| DomainError::InvalidDiscount(format!("{field} is not a decimal"))),
        None => Ok(Default::default()),
    };
    let percent = parse(&body.discount_percent, "discount_percent")?;
    let amount = parse(&body.discount_amount, "discount_amount")?;
    let order = blocking(move || state.orders.apply_discount(id, percent, amount)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /comandas/{id}/payment?payment_method=PIX
#[utoipa::path(
    patch,
    path = "/comandas/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("payment_method" = String, Query, description = "Payment method name, case-insensitive"),
    ),
    responses(
        (status = 200, description = "Payment method recorded", body = OrderResponse),
        (status = 400, description = "Unknown payment method", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order is closed", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn set_payment_method(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PaymentMethodQuery>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let method: PaymentMethod = query.payment_method.parse()?;
    let order = blocking(move || state.orders.set_payment_method(id, method)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /comandas/{id}/checkout
///
/// Records the payment method and closes the order.
#[utoipa::path(
    patch,
    path = "/comandas/{id}/checkout",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order closed", body = OrderResponse),
        (status = 400, description = "Unknown payment method", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order is already closed", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let method: PaymentMethod = body.payment_method.parse()?;
    let order = blocking(move || state.orders.checkout(id, method)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /comandas/{id}/close
///
/// Closes with the recorded payment method, or CASH when none was set.
#[utoipa::path(
    patch,
    path = "/comandas/{id}/close",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order closed", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order is already closed", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn close(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = blocking(move || state.orders.close(id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /comandas/{id}
#[utoipa::path(
    delete,
    path = "/comandas/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 204, description = "Order and its items deleted"),
        (status = 404, description = "Order not found", body = ErrorBody),
    ),
    tag = "comandas"
)]
pub async fn delete_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    blocking(move || state.orders.delete_order(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /comandas/payment-methods
#[utoipa::path(
    get,
    path = "/comandas/payment-methods",
    responses((status = 200, description = "Accepted payment method names", body = Vec<String>)),
    tag = "comandas"
)]
pub async fn payment_methods(state: web::Data<AppState>) -> HttpResponse {
    let names: Vec<&str> = state
        .orders
        .payment_methods()
        .iter()
        .map(|m| m.as_str())
        .collect();
    HttpResponse::Ok().json(names)
}
