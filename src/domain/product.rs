use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 120;
const DESCRIPTION_MAX_CHARS: usize = 500;
const CATEGORY_MAX_CHARS: usize = 80;
/// Prices are kept in cents so line totals and subtotals stay consistent.
const PRICE_SCALE: i64 = 2;

/// A catalog entry. Orders reference products by id and snapshot their
/// price and name when a line is added.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
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

/// Editable product fields, as submitted for create and update.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub category: Option<String>,
    pub stock_quantity: i32,
    pub active: bool,
}

impl ProductDraft {
    fn validated(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        let name_len = name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(DomainError::InvalidInput(format!(
                "name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
            )));
        }
        let description = non_blank(self.description);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_CHARS)
        {
            return Err(DomainError::InvalidInput(format!(
                "description must be at most {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
        let category = non_blank(self.category);
        if category
            .as_ref()
            .is_some_and(|c| c.chars().count() > CATEGORY_MAX_CHARS)
        {
            return Err(DomainError::InvalidInput(format!(
                "category must be at most {CATEGORY_MAX_CHARS} characters"
            )));
        }
        if self.price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "price must not be negative, got {}",
                self.price
            )));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::InvalidInput(format!(
                "stock_quantity must not be negative, got {}",
                self.stock_quantity
            )));
        }
        Ok(Self {
            name,
            description,
            category,
            price: self.price.with_scale_round(PRICE_SCALE, RoundingMode::HalfUp),
            ..self
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, DomainError> {
        let draft = draft.validated()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            stock_quantity: draft.stock_quantity,
            active: draft.active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces every editable field. Prices already captured on order
    /// lines are unaffected.
    pub fn update(&mut self, draft: ProductDraft) -> Result<(), DomainError> {
        let draft = draft.validated()?;
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.category = draft.category;
        self.stock_quantity = draft.stock_quantity;
        self.active = draft.active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a signed stock delta, refusing any change that would leave
    /// stock below zero. Returns the new stock level.
    pub fn adjust_stock(&mut self, delta: i32) -> Result<i32, DomainError> {
        let insufficient = || DomainError::InsufficientStock {
            product_id: self.id,
            available: self.stock_quantity,
            delta,
        };
        let projected = self.stock_quantity.checked_add(delta).ok_or_else(|| {
            if delta < 0 {
                insufficient()
            } else {
                DomainError::InvalidInput(format!("stock delta {delta} overflows"))
            }
        })?;
        if projected < 0 {
            return Err(insufficient());
        }
        self.stock_quantity = projected;
        self.updated_at = Utc::now();
        Ok(projected)
    }
}

/// Optional catalog listing filters; `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub active: Option<bool>,
}

impl ProductFilter {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(min), Some(max)) = (&self.min_price, &self.max_price) {
            if min > max {
                return Err(DomainError::InvalidInput(
                    "min_price cannot be greater than max_price".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn matches(&self, product: &Product) -> bool {
        let name_ok = self.name.as_deref().map(str::trim).map_or(true, |n| {
            product.name.to_lowercase().contains(&n.to_lowercase())
        });
        let category_ok = self.category.as_deref().map(str::trim).map_or(true, |c| {
            product
                .category
                .as_deref()
                .is_some_and(|pc| pc.to_lowercase() == c.to_lowercase())
        });
        let min_ok = self.min_price.as_ref().map_or(true, |min| &product.price >= min);
        let max_ok = self.max_price.as_ref().map_or(true, |max| &product.price <= max);
        let active_ok = self.active.map_or(true, |a| product.active == a);
        name_ok && category_ok && min_ok && max_ok && active_ok
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::str::FromStr;

    use super::*;

    pub(crate) fn draft(name: &str, price: &str, stock: i32) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            price: BigDecimal::from_str(price).expect("valid decimal"),
            category: None,
            stock_quantity: stock,
            active: true,
        }
    }

    #[test]
    fn create_trims_and_validates() {
        let mut d = draft("  Coffee  ", "4.50", 10);
        d.category = Some("   ".to_string());
        let product = Product::create(d).unwrap();
        assert_eq!(product.name, "Coffee");
        assert_eq!(product.category, None);
        assert_eq!(product.stock_quantity, 10);
    }

    #[test]
    fn rejects_negative_price_and_stock() {
        assert!(matches!(
            Product::create(draft("Tea", "-0.01", 1)),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            Product::create(draft("Tea", "1.00", -1)),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn price_is_rounded_to_cents() {
        let product = Product::create(draft("Gum", "0.005", 1)).unwrap();
        assert_eq!(product.price, BigDecimal::from_str("0.01").unwrap());
        assert_eq!(product.price.as_bigint_and_exponent().1, 2);

        let product = Product::create(draft("Mint", "1.234", 1)).unwrap();
        assert_eq!(product.price, BigDecimal::from_str("1.23").unwrap());
    }

    #[test]
    fn rejects_too_short_name() {
        assert!(Product::create(draft("X", "1.00", 0)).is_err());
    }

    #[test]
    fn stock_can_be_drained_to_zero_but_not_below() {
        let mut product = Product::create(draft("Bread", "2.00", 5)).unwrap();
        assert_eq!(product.adjust_stock(-5).unwrap(), 0);

        let err = product.adjust_stock(-1).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 0,
                delta: -1,
                ..
            }
        ));
        assert_eq!(product.stock_quantity, 0);
    }

    #[test]
    fn positive_delta_restocks() {
        let mut product = Product::create(draft("Milk", "3.20", 1)).unwrap();
        assert_eq!(product.adjust_stock(9).unwrap(), 10);
    }

    #[test]
    fn filter_rejects_inverted_price_range() {
        let filter = ProductFilter {
            min_price: Some(BigDecimal::from(10)),
            max_price: Some(BigDecimal::from(5)),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn filter_matches_name_substring_and_category() {
        let mut d = draft("Dark Roast Coffee", "12.00", 3);
        d.category = Some("Drinks".to_string());
        let product = Product::create(d).unwrap();

        let filter = ProductFilter {
            name: Some("roast".to_string()),
            category: Some("drinks".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&product));

        let filter = ProductFilter {
            active: Some(false),
            ..Default::default()
        };
        assert!(!filter.matches(&product));
    }

    #[test]
    fn category_filter_folds_non_ascii_case() {
        let mut d = draft("Suco de Laranja", "8.00", 3);
        d.category = Some("Bebidas Açucaradas".to_string());
        let product = Product::create(d).unwrap();

        let filter = ProductFilter {
            category: Some("BEBIDAS AÇUCARADAS".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&product));

        let filter = ProductFilter {
            category: Some("Bebidas".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&product));
    }
}
