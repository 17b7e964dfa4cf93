pub mod customer;
pub mod errors;
pub mod order;
pub mod page;
pub mod payment;
pub mod ports;
pub mod product;

pub use errors::{DomainError, ErrorKind};
pub use payment::PaymentMethod;
