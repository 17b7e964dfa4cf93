pub mod customers;
pub mod orders;
pub mod products;

use std::str::FromStr;
use std::sync::Arc;

use actix_web::web;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::application::{CatalogService, CustomerService, OrderService};
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::page::{Page, PageRequest, Sort, DEFAULT_PAGE_SIZE};
use crate::domain::ports::{CustomerRepository, OrderRepository, ProductRepository};
use crate::errors::{AppError, ErrorBody};
use crate::infrastructure::{
    DieselCustomerRepository, DieselOrderRepository, DieselProductRepository, InMemoryStore,
};

/// Services shared by every worker.
pub struct AppState {
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub customers: CustomerService,
}

impl AppState {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self {
            orders: OrderService::new(orders, products.clone(), customers.clone()),
            catalog: CatalogService::new(products),
            customers: CustomerService::new(customers),
        }
    }

    pub fn postgres(pool: DbPool) -> Self {
        Self::new(
            Arc::new(DieselOrderRepository::new(pool.clone())),
            Arc::new(DieselProductRepository::new(pool.clone())),
            Arc::new(DieselCustomerRepository::new(pool)),
        )
    }

    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        )
    }
}

/// Runs a service call on actix's blocking pool. Diesel is synchronous and
/// must never run on the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??)
}

// ── Shared DTOs ──────────────────────────────────────────────────────────────

/// A decimal accepted either as a JSON number or as a string, e.g. `9.99` or
/// `"9.99"`. Strings are parsed exactly. Non-integer JSON numbers pass
/// through `f64` and are re-parsed from its shortest round-trip text, which
/// is exact up to 15 significant digits; send a string beyond that.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalInput {
    pub fn parse(&self, field: &str) -> Result<BigDecimal, DomainError> {
        let raw = match self {
            DecimalInput::Number(n) => n.to_string(),
            DecimalInput::Text(s) => s.trim().to_string(),
        };
        BigDecimal::from_str(&raw)
            .map_err(|_| DomainError::InvalidInput(format!("{field} is not a decimal: '{raw}'")))
    }
}

/// Money as rendered in every view: two decimal places, as a string.
pub fn money(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page. Defaults to 10, maximum 100.
    #[serde(default = "default_size")]
    pub size: i64,
    /// `<field>[,asc|desc]`
    pub sort: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl PageParams {
    /// Builds the page request, falling back to `default_sort` when no
    /// `sort` parameter was given.
    pub fn to_request<F>(&self, default_sort: Sort<F>) -> Result<PageRequest<F>, DomainError>
    where
        F: FromStr<Err = DomainError>,
    {
        let sort = match self.sort.as_deref().map(str::trim) {
            Some(spec) if !spec.is_empty() => Sort::parse(spec)?,
            _ => default_sort,
        };
        Ok(PageRequest::new(self.page, self.size, sort))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let page = page.map(f);
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            size: page.size,
        }
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────────

fn payload_error(message: String) -> actix_web::Error {
    AppError::InvalidPayload(message).into()
}

/// Registers every route plus the extractor error handlers, so malformed
/// bodies, queries and paths get the standard error body.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _| payload_error(err.to_string())),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _| payload_error(err.to_string())))
    .app_data(web::PathConfig::default().error_handler(|err, _| payload_error(err.to_string())))
    .service(orders::comandas_scope())
    .service(orders::carts_scope())
    .service(products::products_scope("/products"))
    .service(products::products_scope("/api/v1/products"))
    .service(customers::clients_scope());
}

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::list_orders,
        orders::get_order,
        orders::create_order,
        orders::add_item,
        orders::remove_item,
        orders::apply_discount,
        orders::set_payment_method,
        orders::checkout,
        orders::close,
        orders::delete_order,
        orders::payment_methods,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::adjust_stock,
        products::delete_product,
        customers::list_customers,
        customers::get_customer,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
    ),
    components(schemas(ErrorBody)),
    tags(
        (name = "comandas", description = "Customer tabs: items, discount, payment and checkout"),
        (name = "products", description = "Product catalog and stock"),
        (name = "clients", description = "Customer records"),
    )
)]
pub struct ApiDoc;
