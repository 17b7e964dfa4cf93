use std::collections::HashSet;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::page::{OrderSortField, Page, PageRequest};
use crate::domain::ports::{Mutation, OrderRepository};
use crate::schema::{order_lines, orders, products};

use super::models::{line_rows, OrderLineRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_lines(conn: &mut PgConnection, row: &OrderRow) -> Result<Vec<OrderLineRow>, DomainError> {
    Ok(OrderLineRow::belonging_to(row)
        .select(OrderLineRow::as_select())
        .load(conn)?)
}

fn insert_lines(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
    let lines = line_rows(order);
    if !lines.is_empty() {
        diesel::insert_into(order_lines::table)
            .values(&lines)
            .execute(conn)?;
    }
    Ok(())
}

/// Share-locks the catalog rows of products the mutation newly put on the
/// order. A concurrent product delete then either waits for this
/// transaction (and sees the new line) or has already removed the row.
fn lock_added_products(
    conn: &mut PgConnection,
    known: &HashSet<Uuid>,
    order: &Order,
) -> Result<(), DomainError> {
    let added: Vec<Uuid> = order
        .items()
        .iter()
        .map(|line| line.product_id)
        .filter(|id| !known.contains(id))
        .collect();
    if added.is_empty() {
        return Ok(());
    }
    let present: Vec<Uuid> = products::table
        .filter(products::id.eq_any(&added))
        .select(products::id)
        .for_share()
        .load(conn)?;
    match added.into_iter().find(|id| !present.contains(id)) {
        Some(missing) => Err(DomainError::ProductNotFound(missing)),
        None => Ok(()),
    }
}

impl OrderRepository for DieselOrderRepository {
    fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&OrderRow::from(order))
                .execute(conn)?;
            insert_lines(conn, order)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let lines = load_lines(&mut conn, &row)?;
        row.into_order(lines).map(Some)
    }

    fn update(&self, id: Uuid, mutation: Mutation<'_, Order>) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // The row lock serializes concurrent updates of the same order
            // until this transaction commits or rolls back.
            let row = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .get_result(conn)
                .optional()?
                .ok_or(DomainError::OrderNotFound(id))?;
            let lines = load_lines(conn, &row)?;
            let mut order = row.into_order(lines)?;
            let known: HashSet<Uuid> = order.items().iter().map(|l| l.product_id).collect();

            mutation(&mut order)?;
            lock_added_products(conn, &known, &order)?;

            diesel::update(orders::table.find(id))
                .set(&OrderRow::from(&order))
                .execute(conn)?;
            diesel::delete(order_lines::table.filter(order_lines::order_id.eq(id)))
                .execute(conn)?;
            insert_lines(conn, &order)?;
            Ok(order)
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::delete(order_lines::table.filter(order_lines::order_id.eq(id)))
                .execute(conn)?;
            let deleted = diesel::delete(orders::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
    }

    fn list(&self, page: &PageRequest<OrderSortField>) -> Result<Page<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let query = orders::table.select(OrderRow::as_select()).into_boxed();
            let direction = page.sort.direction;
            let query = match page.sort.field {
                OrderSortField::Id => order_by!(query, orders::id, direction),
                OrderSortField::CreatedAt => order_by!(query, orders::created_at, direction),
                OrderSortField::CustomerName => {
                    order_by!(query, orders::customer_name, direction)
                }
                OrderSortField::Status => order_by!(query, orders::status, direction),
            };
            let rows: Vec<OrderRow> = query
                .then_order_by(orders::id.asc())
                .limit(page.size)
                .offset(page.offset())
                .load(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .load::<OrderLineRow>(conn)?
                .grouped_by(&rows);
            let items = rows
                .into_iter()
                .zip(lines)
                .map(|(row, lines)| row.into_order(lines))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page {
                items,
                total,
                page: page.page,
                size: page.size,
            })
        })
    }
}
