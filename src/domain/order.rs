use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::payment::PaymentMethod;
use super::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Closed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(OrderStatus::Open),
            "CLOSED" => Ok(OrderStatus::Closed),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// Percentage and fixed-amount discount applied to an order's subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct Discount {
    percent: BigDecimal,
    amount: BigDecimal,
}

impl Discount {
    /// Validates `0 <= percent <= 100` and `amount >= 0`.
    pub fn new(percent: BigDecimal, amount: BigDecimal) -> Result<Self, DomainError> {
        if percent < BigDecimal::zero() || percent > BigDecimal::from(100) {
            return Err(DomainError::InvalidDiscount(format!(
                "percent must be between 0 and 100, got {percent}"
            )));
        }
        if amount < BigDecimal::zero() {
            return Err(DomainError::InvalidDiscount(format!(
                "amount must not be negative, got {amount}"
            )));
        }
        Ok(Self { percent, amount })
    }

    pub fn none() -> Self {
        Self {
            percent: BigDecimal::zero(),
            amount: BigDecimal::zero(),
        }
    }

    pub fn percent(&self) -> &BigDecimal {
        &self.percent
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    /// `max(0, subtotal * (1 - percent / 100) - amount)`
    pub fn apply_to(&self, subtotal: &BigDecimal) -> BigDecimal {
        let after_percent = subtotal - subtotal * &self.percent / BigDecimal::from(100);
        let total = after_percent - &self.amount;
        if total < BigDecimal::zero() {
            BigDecimal::zero()
        } else {
            total
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Self::none()
    }
}

/// One product/quantity/price entry on an order. The unit price and name
/// are captured when the line is first added and never re-read.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl LineItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// Every field of an [`Order`], used by repositories to rebuild the
/// aggregate from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_id: Option<Uuid>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub discount: Discount,
    pub payment_method: Option<PaymentMethod>,
    pub items: Vec<LineItem>,
}

/// A running tab (comanda / cart).
///
/// Line items are owned by the order and only reachable through it. Every
/// mutator checks that the order is still open before touching state, so a
/// failed call leaves the order exactly as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: Uuid,
    customer_name: String,
    customer_id: Option<Uuid>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    discount: Discount,
    payment_method: Option<PaymentMethod>,
    items: Vec<LineItem>,
}

impl Order {
    /// Opens a new tab. The name is kept as a snapshot even when a customer
    /// record is linked, and the two may diverge later.
    pub fn open(customer_name: &str, customer_id: Option<Uuid>) -> Result<Self, DomainError> {
        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(DomainError::InvalidInput(
                "customer_name is required".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            customer_name: customer_name.to_string(),
            customer_id,
            status: OrderStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
            discount: Discount::none(),
            payment_method: None,
            items: Vec::new(),
        })
    }

    pub fn from_parts(parts: OrderParts) -> Result<Self, DomainError> {
        let closed = parts.status == OrderStatus::Closed;
        if closed != parts.closed_at.is_some() {
            return Err(DomainError::Internal(format!(
                "order {} is {} but closed_at is {:?}",
                parts.id, parts.status, parts.closed_at
            )));
        }
        if let Some(line) = parts.items.iter().find(|l| l.quantity < 1) {
            return Err(DomainError::Internal(format!(
                "line {} on order {} has quantity {}",
                line.id, parts.id, line.quantity
            )));
        }
        Ok(Self {
            id: parts.id,
            customer_name: parts.customer_name,
            customer_id: parts.customer_id,
            status: parts.status,
            created_at: parts.created_at,
            closed_at: parts.closed_at,
            discount: parts.discount,
            payment_method: parts.payment_method,
            items: parts.items,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_id(&self) -> Option<Uuid> {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn discount(&self) -> &Discount {
        &self.discount
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, item_id: Uuid) -> Option<&LineItem> {
        self.items.iter().find(|l| l.id == item_id)
    }

    pub fn item_for_product(&self, product_id: Uuid) -> Option<&LineItem> {
        self.items.iter().find(|l| l.product_id == product_id)
    }

    pub fn subtotal(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, line| acc + line.line_total())
    }

    pub fn total(&self) -> BigDecimal {
        self.discount.apply_to(&self.subtotal())
    }

    /// Unlinks the customer record, keeping the name snapshot. Used when the
    /// customer is deleted; allowed on closed orders too.
    pub fn unlink_customer(&mut self) {
        self.customer_id = None;
    }

    pub fn ensure_open(&self) -> Result<(), DomainError> {
        match self.status {
            OrderStatus::Open => Ok(()),
            OrderStatus::Closed => Err(DomainError::OrderClosed(self.id)),
        }
    }

    /// Adds `quantity` units of `product`. A product already on the order
    /// has its line's quantity increased and keeps its original price.
    /// Returns the id of the affected line.
    pub fn add_item(&mut self, product: &Product, quantity: i32) -> Result<Uuid, DomainError> {
        self.ensure_open()?;
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity.into()));
        }

        if let Some(line) = self.items.iter_mut().find(|l| l.product_id == product.id) {
            let merged = line.quantity.checked_add(quantity).ok_or_else(|| {
                DomainError::InvalidQuantity(i64::from(line.quantity) + i64::from(quantity))
            })?;
            line.quantity = merged;
            return Ok(line.id);
        }

        let line = LineItem {
            id: Uuid::new_v4(),
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price.clone(),
        };
        let id = line.id;
        self.items.push(line);
        Ok(id)
    }

    /// Removes a whole line; partial-quantity removal is not supported.
    pub fn remove_item(&mut self, item_id: Uuid) -> Result<LineItem, DomainError> {
        self.ensure_open()?;
        let index = self
            .items
            .iter()
            .position(|l| l.id == item_id)
            .ok_or(DomainError::LineItemNotFound {
                order_id: self.id,
                item_id,
            })?;
        Ok(self.items.remove(index))
    }

    /// Replaces the current discount; discounts do not accumulate.
    pub fn apply_discount(&mut self, discount: Discount) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.discount = discount;
        Ok(())
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.payment_method = Some(method);
        Ok(())
    }

    /// Records the payment method and closes the order. Closing happens
    /// once; a second call fails with [`DomainError::OrderClosed`].
    pub fn checkout(&mut self, method: PaymentMethod) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.payment_method = Some(method);
        self.status = OrderStatus::Closed;
        self.closed_at = Some(Utc::now());
        Ok(())
    }

    /// Checkout with the already-recorded payment method, or cash if none.
    pub fn close(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.checkout(self.payment_method.unwrap_or(PaymentMethod::Cash))
    }
}
