/// Orders a boxed query by `$column` in the requested direction.
macro_rules! order_by {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            $crate::domain::page::SortDirection::Asc => $query.order($column.asc()),
            $crate::domain::page::SortDirection::Desc => $query.order($column.desc()),
        }
    };
}

pub mod customer_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod product_repo;

#[cfg(test)]
mod test_support;

pub use customer_repo::DieselCustomerRepository;
pub use memory::InMemoryStore;
pub use order_repo::DieselOrderRepository;
pub use product_repo::DieselProductRepository;
