use std::str::FromStr;

use super::errors::DomainError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DomainError::InvalidInput(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// A `field,direction` sort spec, e.g. `created_at,desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F> Sort<F> {
    pub fn new(field: F, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

impl<F: FromStr<Err = DomainError>> Sort<F> {
    /// Parses `field[,direction]`; a missing direction means ascending.
    pub fn parse(spec: &str) -> Result<Self, DomainError> {
        let mut parts = spec.splitn(2, ',');
        let field = parts.next().unwrap_or_default().parse()?;
        let direction = match parts.next() {
            Some(d) => d.parse()?,
            None => SortDirection::Asc,
        };
        Ok(Self { field, direction })
    }
}

macro_rules! sort_fields {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::InvalidInput(format!(
                        "cannot sort by '{other}'"
                    ))),
                }
            }
        }
    };
}

sort_fields!(OrderSortField {
    Id => "id",
    CreatedAt => "created_at",
    CustomerName => "customer_name",
    Status => "status",
});

sort_fields!(ProductSortField {
    Id => "id",
    Name => "name",
    Price => "price",
    StockQuantity => "stock_quantity",
    CreatedAt => "created_at",
});

sort_fields!(CustomerSortField {
    Id => "id",
    Name => "name",
    CreatedAt => "created_at",
});

/// One page of a listing. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<F> {
    pub page: i64,
    pub size: i64,
    pub sort: Sort<F>,
}

impl<F> PageRequest<F> {
    /// Clamps `page` to at least 1 and `size` to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: i64, size: i64, sort: Sort<F>) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort,
        }
    }

    /// Rows to skip. Saturates instead of overflowing for absurd page numbers.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}
