use uuid::Uuid;

use super::customer::Customer;
use super::errors::DomainError;
use super::order::Order;
use super::page::{CustomerSortField, OrderSortField, Page, PageRequest, ProductSortField};
use super::product::{Product, ProductFilter};

/// A mutation run inside a repository's per-entity critical section. If it
/// returns an error nothing is persisted.
pub type Mutation<'a, T> = &'a mut dyn FnMut(&mut T) -> Result<(), DomainError>;

/// Storage for the order aggregate and its line items.
///
/// `update` is the only way to change a stored order: the implementation
/// loads the order, runs the mutation and saves the result as one atomic
/// unit, serialized against any other `update` of the same id.
pub trait OrderRepository: Send + Sync + 'static {
    fn insert(&self, order: &Order) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn update(&self, id: Uuid, mutation: Mutation<'_, Order>) -> Result<Order, DomainError>;
    /// Deletes the order and its line items. Returns `false` if absent.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    fn list(&self, page: &PageRequest<OrderSortField>) -> Result<Page<Order>, DomainError>;
}

pub trait ProductRepository: Send + Sync + 'static {
    fn insert(&self, product: &Product) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn update(&self, id: Uuid, mutation: Mutation<'_, Product>) -> Result<Product, DomainError>;
    /// Fails with [`DomainError::ProductInUse`] while an open order has a
    /// line for the product.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    fn list(
        &self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSortField>,
    ) -> Result<Page<Product>, DomainError>;
}

pub trait CustomerRepository: Send + Sync + 'static {
    fn insert(&self, customer: &Customer) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, DomainError>;
    fn update(&self, id: Uuid, mutation: Mutation<'_, Customer>)
        -> Result<Customer, DomainError>;
    /// Orders linked to the customer keep their name snapshot and lose the link.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    fn list(&self, page: &PageRequest<CustomerSortField>) -> Result<Page<Customer>, DomainError>;
}
