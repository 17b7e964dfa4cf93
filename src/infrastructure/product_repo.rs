use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::page::{Page, PageRequest, ProductSortField};
use crate::domain::ports::{Mutation, ProductRepository};
use crate::domain::product::{Product, ProductFilter};
use crate::schema::{order_lines, orders, products};

use super::models::ProductRow;

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
fn like_literal(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn filtered<'a>(filter: &ProductFilter) -> products::BoxedQuery<'a, Pg> {
    let mut query = products::table.into_boxed();
    if let Some(name) = &filter.name {
        let pattern = format!("%{}%", like_literal(name.trim()));
        query = query.filter(products::name.ilike(pattern));
    }
    if let Some(category) = &filter.category {
        // ILIKE without wildcards is a case-insensitive equality.
        query = query.filter(products::category.ilike(like_literal(category.trim())));
    }
    if let Some(min) = &filter.min_price {
        query = query.filter(products::price.ge(min.clone()));
    }
    if let Some(max) = &filter.max_price {
        query = query.filter(products::price.le(max.clone()));
    }
    if let Some(active) = filter.active {
        query = query.filter(products::active.eq(active));
    }
    query
}

impl ProductRepository for DieselProductRepository {
    fn insert(&self, product: &Product) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(products::table)
            .values(&ProductRow::from(product))
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn update(&self, id: Uuid, mutation: Mutation<'_, Product>) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut product: Product = products::table
                .find(id)
                .select(ProductRow::as_select())
                .for_update()
                .get_result(conn)
                .optional()?
                .ok_or(DomainError::ProductNotFound(id))?
                .into();

            mutation(&mut product)?;

            diesel::update(products::table.find(id))
                .set(&ProductRow::from(&product))
                .execute(conn)?;
            Ok(product)
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Waits for order transactions share-locking this product, so a
            // line added concurrently is visible to the check below.
            let found = products::table
                .find(id)
                .select(products::id)
                .for_update()
                .get_result::<Uuid>(conn)
                .optional()?;
            if found.is_none() {
                return Ok(false);
            }
            let in_use: bool = diesel::select(exists(
                order_lines::table
                    .inner_join(orders::table)
                    .filter(order_lines::product_id.eq(id))
                    .filter(orders::status.eq(OrderStatus::Open.as_str())),
            ))
            .get_result(conn)?;
            if in_use {
                return Err(DomainError::ProductInUse(id));
            }
            let deleted = diesel::delete(products::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
    }

    fn list(
        &self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSortField>,
    ) -> Result<Page<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter).count().get_result(conn)?;

            let query = filtered(filter).select(ProductRow::as_select());
            let direction = page.sort.direction;
            let query = match page.sort.field {
                ProductSortField::Id => order_by!(query, products::id, direction),
                ProductSortField::Name => order_by!(query, products::name, direction),
                ProductSortField::Price => order_by!(query, products::price, direction),
                ProductSortField::StockQuantity => {
                    order_by!(query, products::stock_quantity, direction)
                }
                ProductSortField::CreatedAt => {
                    order_by!(query, products::created_at, direction)
                }
            };
            let rows: Vec<ProductRow> = query
                .then_order_by(products::id.asc())
                .limit(page.size)
                .offset(page.offset())
                .load(conn)?;

            Ok(Page {
                items: rows.into_iter().map(Product::from).collect(),
                total,
                page: page.page,
                size: page.size,
            })
        })
    }
}
