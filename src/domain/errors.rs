use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`DomainError`], used by the transport layer
/// to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    InsufficientStock,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
    #[error("Customer not found: {0}")]
    CustomerNotFound(Uuid),
    #[error("Line item {item_id} not found on order {order_id}")]
    LineItemNotFound { order_id: Uuid, item_id: Uuid },

    #[error("Order {0} is closed and cannot be modified")]
    OrderClosed(Uuid),

    #[error("Invalid quantity: {0} (must be at least 1)")]
    InvalidQuantity(i64),
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient stock for product {product_id}: available {available}, requested delta {delta}")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        delta: i32,
    },
    #[error("Product {0} is referenced by an open order")]
    ProductInUse(Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::OrderNotFound(_)
            | DomainError::ProductNotFound(_)
            | DomainError::CustomerNotFound(_)
            | DomainError::LineItemNotFound { .. } => ErrorKind::NotFound,
            DomainError::OrderClosed(_) => ErrorKind::InvalidState,
            DomainError::InvalidQuantity(_)
            | DomainError::InvalidDiscount(_)
            | DomainError::InvalidPaymentMethod(_)
            | DomainError::InvalidStatus(_)
            | DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::ProductInUse(_) => ErrorKind::Conflict,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code rendered in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            DomainError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            DomainError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            DomainError::LineItemNotFound { .. } => "LINE_ITEM_NOT_FOUND",
            DomainError::OrderClosed(_) => "ORDER_CLOSED",
            DomainError::InvalidQuantity(_) => "INVALID_QUANTITY",
            DomainError::InvalidDiscount(_) => "INVALID_DISCOUNT",
            DomainError::InvalidPaymentMethod(_) => "INVALID_PAYMENT_METHOD",
            DomainError::InvalidStatus(_) | DomainError::InvalidInput(_) => "BAD_REQUEST",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::ProductInUse(_) => "PRODUCT_IN_USE",
            DomainError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
