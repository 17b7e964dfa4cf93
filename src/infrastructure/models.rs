use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::customer::Customer;
use crate::domain::errors::DomainError;
use crate::domain::order::{Discount, LineItem, Order, OrderParts, OrderStatus};
use crate::domain::payment::PaymentMethod;
use crate::domain::product::Product;
use crate::schema::{customers, order_lines, orders, products};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = customers)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomerRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerRow {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            created_at: c.created_at,
        }
    }
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = products)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductRow {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price.clone(),
            category: p.category.clone(),
            stock_quantity: p.stock_quantity,
            active: p.active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            stock_quantity: row.stock_quantity,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `orders` row. Discount and payment method are flattened into columns;
/// line items live in `order_lines`.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = orders)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub discount_percent: BigDecimal,
    pub discount_amount: BigDecimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl From<&Order> for OrderRow {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id(),
            customer_name: o.customer_name().to_string(),
            customer_id: o.customer_id(),
            status: o.status().as_str().to_string(),
            created_at: o.created_at(),
            closed_at: o.closed_at(),
            discount_percent: o.discount().percent().clone(),
            discount_amount: o.discount().amount().clone(),
            payment_method: o.payment_method().map(|m| m.as_str().to_string()),
        }
    }
}

/// Line rows for `order`, numbered in the order's item order.
pub fn line_rows(order: &Order) -> Vec<OrderLineRow> {
    order
        .items()
        .iter()
        .zip(0..)
        .map(|(line, position)| OrderLineRow {
            id: line.id,
            order_id: order.id(),
            position,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.clone(),
        })
        .collect()
}

impl OrderRow {
    /// Rebuilds the aggregate. `lines` must belong to this row; they are
    /// sorted by `position` here.
    pub fn into_order(self, mut lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
        let id = self.id;
        let corrupt = move |e: DomainError| DomainError::Internal(format!("order {id}: {e}"));
        let status: OrderStatus = self.status.parse().map_err(corrupt)?;
        let payment_method = self
            .payment_method
            .as_deref()
            .map(str::parse::<PaymentMethod>)
            .transpose()
            .map_err(corrupt)?;
        let discount =
            Discount::new(self.discount_percent, self.discount_amount).map_err(corrupt)?;

        lines.sort_by_key(|l| l.position);
        Order::from_parts(OrderParts {
            id: self.id,
            customer_name: self.customer_name,
            customer_id: self.customer_id,
            status,
            created_at: self.created_at,
            closed_at: self.closed_at,
            discount,
            payment_method,
            items: lines
                .into_iter()
                .map(|l| LineItem {
                    id: l.id,
                    product_id: l.product_id,
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        })
    }
}
