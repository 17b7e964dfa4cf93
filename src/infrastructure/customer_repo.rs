use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::customer::Customer;
use crate::domain::errors::DomainError;
use crate::domain::page::{CustomerSortField, Page, PageRequest};
use crate::domain::ports::{CustomerRepository, Mutation};
use crate::schema::{customers, orders};

use super::models::CustomerRow;

pub struct DieselCustomerRepository {
    pool: DbPool,
}

impl DieselCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CustomerRepository for DieselCustomerRepository {
    fn insert(&self, customer: &Customer) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(customers::table)
            .values(&CustomerRow::from(customer))
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = customers::table
            .find(id)
            .select(CustomerRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Customer::from))
    }

    fn update(
        &self,
        id: Uuid,
        mutation: Mutation<'_, Customer>,
    ) -> Result<Customer, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut customer: Customer = customers::table
                .find(id)
                .select(CustomerRow::as_select())
                .for_update()
                .get_result(conn)
                .optional()?
                .ok_or(DomainError::CustomerNotFound(id))?
                .into();

            mutation(&mut customer)?;

            diesel::update(customers::table.find(id))
                .set(&CustomerRow::from(&customer))
                .execute(conn)?;
            Ok(customer)
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Orders keep their name snapshot; only the link goes.
            diesel::update(orders::table.filter(orders::customer_id.eq(id)))
                .set(orders::customer_id.eq(None::<Uuid>))
                .execute(conn)?;
            let deleted = diesel::delete(customers::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
    }

    fn list(
        &self,
        page: &PageRequest<CustomerSortField>,
    ) -> Result<Page<Customer>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = customers::table.count().get_result(conn)?;

            let query = customers::table
                .select(CustomerRow::as_select())
                .into_boxed();
            let direction = page.sort.direction;
            let query = match page.sort.field {
                CustomerSortField::Id => order_by!(query, customers::id, direction),
                CustomerSortField::Name => order_by!(query, customers::name, direction),
                CustomerSortField::CreatedAt => {
                    order_by!(query, customers::created_at, direction)
                }
            };
            let rows: Vec<CustomerRow> = query
                .then_order_by(customers::id.asc())
                .limit(page.size)
                .offset(page.offset())
                .load(conn)?;

            Ok(Page {
                items: rows.into_iter().map(Customer::from).collect(),
                total,
                page: page.page,
                size: page.size,
            })
        })
    }
}
