use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::page::{Page, PageRequest, ProductSortField};
use crate::domain::ports::ProductRepository;
use crate::domain::product::{Product, ProductDraft, ProductFilter};

pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub fn list_products(
        &self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSortField>,
    ) -> Result<Page<Product>, DomainError> {
        filter.validate()?;
        self.products.list(filter, page)
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        log::debug!("loading product {}", id);
        self.products
            .find_by_id(id)?
            .ok_or(DomainError::ProductNotFound(id))
    }

    pub fn create_product(&self, draft: ProductDraft) -> Result<Product, DomainError> {
        let product = Product::create(draft)?;
        self.products.insert(&product)?;
        log::info!(
            "created product {} '{}' at {}",
            product.id,
            product.name,
            product.price
        );
        Ok(product)
    }

    pub fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<Product, DomainError> {
        let product = self
            .products
            .update(id, &mut |p: &mut Product| p.update(draft.clone()))?;
        log::info!("updated product {}", id);
        Ok(product)
    }

    /// Applies a signed stock delta. Order operations never call this.
    pub fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product, DomainError> {
        let product = self
            .products
            .update(id, &mut |p: &mut Product| p.adjust_stock(delta).map(|_| ()))?;
        log::info!(
            "product {}: stock adjusted by {} to {}",
            id,
            delta,
            product.stock_quantity
        );
        Ok(product)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.products.delete(id)? {
            return Err(DomainError::ProductNotFound(id));
        }
        log::info!("deleted product {}", id);
        Ok(())
    }
}
