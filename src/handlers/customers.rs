use actix_web::{web, HttpResponse, Scope};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::customer::{Customer, CustomerDraft};
use crate::domain::page::{CustomerSortField, Sort, SortDirection};
use crate::errors::{AppError, ErrorBody};

use super::{blocking, AppState, PageParams, PageResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<CustomerRequest> for CustomerDraft {
    fn from(r: CustomerRequest) -> Self {
        Self {
            name: r.name,
            email: r.email,
            phone: r.phone,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

pub fn clients_scope() -> Scope {
    web::scope("/clients")
        .route("", web::get().to(list_customers))
        .route("", web::post().to(create_customer))
        .route("/{id}", web::get().to(get_customer))
        .route("/{id}", web::put().to(update_customer))
        .route("/{id}", web::delete().to(delete_customer))
}

#[utoipa::path(
    get,
    path = "/clients",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("size" = Option<i64>, Query, description = "Items per page (default 10, max 100)"),
        ("sort" = Option<String>, Query, description = "id|name|created_at, optionally followed by ,asc or ,desc (default id,asc)"),
    ),
    responses(
        (status = 200, description = "Page of customers", body = PageResponse<CustomerResponse>),
        (status = 400, description = "Unknown sort field or direction", body = ErrorBody),
    ),
    tag = "clients"
)]
pub async fn list_customers(
    state: web::Data<AppState>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let page = query.to_request(Sort::new(CustomerSortField::Id, SortDirection::Asc))?;
    let result = blocking(move || state.customers.list_customers(&page)).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from_page(result, CustomerResponse::from)))
}

#[utoipa::path(
    get,
    path = "/clients/{id}",
    params(("id" = Uuid, Path, description = "Customer UUID")),
    responses(
        (status = 200, description = "Customer found", body = CustomerResponse),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "clients"
)]
pub async fn get_customer(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let customer = blocking(move || state.customers.get_customer(id)).await?;
    Ok(HttpResponse::Ok().json(CustomerResponse::from(customer)))
}

#[utoipa::path(
    post,
    path = "/clients",
    request_body = CustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
    ),
    tag = "clients"
)]
pub async fn create_customer(
    state: web::Data<AppState>,
    body: web::Json<CustomerRequest>,
) -> Result<HttpResponse, AppError> {
    let draft = CustomerDraft::from(body.into_inner());
    let customer = blocking(move || state.customers.create_customer(draft)).await?;
    Ok(HttpResponse::Created().json(CustomerResponse::from(customer)))
}

#[utoipa::path(
    put,
    path = "/clients/{id}",
    params(("id" = Uuid, Path, description = "Customer UUID")),
    request_body = CustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "clients"
)]
pub async fn update_customer(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CustomerRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let draft = CustomerDraft::from(body.into_inner());
    let customer = blocking(move || state.customers.update_customer(id, draft)).await?;
    Ok(HttpResponse::Ok().json(CustomerResponse::from(customer)))
}

/// Orders that referenced the customer keep their name snapshot.
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    params(("id" = Uuid, Path, description = "Customer UUID")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found", body = ErrorBody),
    ),
    tag = "clients"
)]
pub async fn delete_customer(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    blocking(move || state.customers.delete_customer(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}
