pub mod catalog_service;
pub mod customer_service;
pub mod order_service;

pub use catalog_service::CatalogService;
pub use customer_service::CustomerService;
pub use order_service::OrderService;
