use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::domain::customer::Customer;
use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::page::{
    CustomerSortField, OrderSortField, Page, PageRequest, ProductSortField, SortDirection,
};
use crate::domain::ports::{CustomerRepository, Mutation, OrderRepository, ProductRepository};
use crate::domain::product::{Product, ProductFilter};

#[derive(Default)]
struct State {
    orders: HashMap<Uuid, Order>,
    products: HashMap<Uuid, Product>,
    customers: HashMap<Uuid, Customer>,
}

/// In-memory implementation of every repository port.
///
/// All three stores share one mutex, so every write is serialized and a
/// mutation runs against a clone that is only committed when it succeeds.
/// Used by tests and by local runs without `DATABASE_URL`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store lock poisoned".to_string()))
    }
}

fn update_entry<T: Clone>(
    map: &mut HashMap<Uuid, T>,
    id: Uuid,
    mutation: Mutation<'_, T>,
    not_found: DomainError,
) -> Result<T, DomainError> {
    let current = map.get(&id).ok_or(not_found)?;
    let mut draft = current.clone();
    mutation(&mut draft)?;
    map.insert(id, draft.clone());
    Ok(draft)
}

fn paginate<T, F>(
    mut items: Vec<T>,
    page: &PageRequest<F>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Page<T> {
    items.sort_by(|a, b| match page.sort.direction {
        SortDirection::Asc => cmp(a, b),
        SortDirection::Desc => cmp(b, a),
    });
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.size).unwrap_or(0))
        .collect();
    Page {
        items,
        total,
        page: page.page,
        size: page.size,
    }
}

impl OrderRepository for InMemoryStore {
    fn insert(&self, order: &Order) -> Result<(), DomainError> {
        self.lock()?.orders.insert(order.id(), order.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    fn update(&self, id: Uuid, mutation: Mutation<'_, Order>) -> Result<Order, DomainError> {
        let mut state = self.lock()?;
        let State {
            orders, products, ..
        } = &mut *state;
        // A product deleted after the caller read it must not land on a line.
        let mut checked = |order: &mut Order| {
            let known: Vec<Uuid> = order.items().iter().map(|l| l.product_id).collect();
            mutation(&mut *order)?;
            match order
                .items()
                .iter()
                .map(|l| l.product_id)
                .find(|pid| !known.contains(pid) && !products.contains_key(pid))
            {
                Some(missing) => Err(DomainError::ProductNotFound(missing)),
                None => Ok(()),
            }
        };
        update_entry(orders, id, &mut checked, DomainError::OrderNotFound(id))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.lock()?.orders.remove(&id).is_some())
    }

    fn list(&self, page: &PageRequest<OrderSortField>) -> Result<Page<Order>, DomainError> {
        let orders = self.lock()?.orders.values().cloned().collect();
        let field = page.sort.field;
        Ok(paginate(orders, page, |a, b| {
            let primary = match field {
                OrderSortField::Id => Ordering::Equal,
                OrderSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
                OrderSortField::CustomerName => a.customer_name().cmp(b.customer_name()),
                OrderSortField::Status => a.status().as_str().cmp(b.status().as_str()),
            };
            primary.then_with(|| a.id().cmp(&b.id()))
        }))
    }
}

impl ProductRepository for InMemoryStore {
    fn insert(&self, product: &Product) -> Result<(), DomainError> {
        self.lock()?.products.insert(product.id, product.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    fn update(&self, id: Uuid, mutation: Mutation<'_, Product>) -> Result<Product, DomainError> {
        let mut state = self.lock()?;
        update_entry(
            &mut state.products,
            id,
            mutation,
            DomainError::ProductNotFound(id),
        )
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let in_use = state
            .orders
            .values()
            .any(|o| o.is_open() && o.item_for_product(id).is_some());
        if in_use {
            return Err(DomainError::ProductInUse(id));
        }
        Ok(state.products.remove(&id).is_some())
    }

    fn list(
        &self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSortField>,
    ) -> Result<Page<Product>, DomainError> {
        let products = self
            .lock()?
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        let field = page.sort.field;
        Ok(paginate(products, page, |a, b| {
            let primary = match field {
                ProductSortField::Id => Ordering::Equal,
                ProductSortField::Name => a.name.cmp(&b.name),
                ProductSortField::Price => a.price.cmp(&b.price),
                ProductSortField::StockQuantity => a.stock_quantity.cmp(&b.stock_quantity),
                ProductSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        }))
    }
}

impl CustomerRepository for InMemoryStore {
    fn insert(&self, customer: &Customer) -> Result<(), DomainError> {
        self.lock()?.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, DomainError> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    fn update(
        &self,
        id: Uuid,
        mutation: Mutation<'_, Customer>,
    ) -> Result<Customer, DomainError> {
        let mut state = self.lock()?;
        update_entry(
            &mut state.customers,
            id,
            mutation,
            DomainError::CustomerNotFound(id),
        )
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        if state.customers.remove(&id).is_none() {
            return Ok(false);
        }
        state
            .orders
            .values_mut()
            .filter(|o| o.customer_id() == Some(id))
            .for_each(Order::unlink_customer);
        Ok(true)
    }

    fn list(
        &self,
        page: &PageRequest<CustomerSortField>,
    ) -> Result<Page<Customer>, DomainError> {
        let customers = self.lock()?.customers.values().cloned().collect();
        let field = page.sort.field;
        Ok(paginate(customers, page, |a, b| {
            let primary = match field {
                CustomerSortField::Id => Ordering::Equal,
                CustomerSortField::Name => a.name.cmp(&b.name),
                CustomerSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::tests::dec;
    use crate::domain::page::Sort;
    use crate::domain::product::tests::draft;
    use crate::domain::PaymentMethod;

    fn product(store: &InMemoryStore, name: &str) -> Product {
        let product = Product::create(draft(name, "1.00", 5)).unwrap();
        ProductRepository::insert(store, &product).unwrap();
        product
    }

    #[test]
    fn failed_mutation_is_not_committed() {
        let store = InMemoryStore::new();
        let order = Order::open("Maria", None).unwrap();
        OrderRepository::insert(&store, &order).unwrap();
        let p = product(&store, "Coffee");

        let result = OrderRepository::update(&store, order.id(), &mut |o: &mut Order| {
            o.add_item(&p, 2)?;
            Err(DomainError::Internal("boom".to_string()))
        });
        assert!(result.is_err());

        let stored = OrderRepository::find_by_id(&store, order.id()).unwrap().unwrap();
        assert!(stored.items().is_empty());
    }

    #[test]
    fn order_update_refuses_products_missing_from_the_catalog() {
        let store = InMemoryStore::new();
        let order = Order::open("Maria", None).unwrap();
        OrderRepository::insert(&store, &order).unwrap();
        let p = product(&store, "Coffee");
        assert!(ProductRepository::delete(&store, p.id).unwrap());

        let err = OrderRepository::update(&store, order.id(), &mut |o: &mut Order| {
            o.add_item(&p, 1).map(|_| ())
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::ProductNotFound(id) if id == p.id));

        let stored = OrderRepository::find_by_id(&store, order.id()).unwrap().unwrap();
        assert!(stored.items().is_empty());
    }

    #[test]
    fn update_of_missing_order_is_not_found() {
        let store = InMemoryStore::new();
        let missing = Uuid::new_v4();
        let err = OrderRepository::update(&store, missing, &mut |_: &mut Order| Ok(())).unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(id) if id == missing));
    }

    #[test]
    fn product_on_open_order_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let p = product(&store, "Coffee");
        let order = Order::open("Maria", None).unwrap();
        OrderRepository::insert(&store, &order).unwrap();
        OrderRepository::update(&store, order.id(), &mut |o: &mut Order| {
            o.add_item(&p, 1).map(|_| ())
        })
        .unwrap();

        assert!(matches!(
            ProductRepository::delete(&store, p.id),
            Err(DomainError::ProductInUse(_))
        ));

        OrderRepository::update(&store, order.id(), &mut |o: &mut Order| {
            o.checkout(PaymentMethod::Cash)
        })
        .unwrap();
        assert!(ProductRepository::delete(&store, p.id).unwrap());
    }

    #[test]
    fn deleting_customer_unlinks_orders() {
        let store = InMemoryStore::new();
        let customer = Customer::create(crate::domain::customer::CustomerDraft {
            name: "Maria".to_string(),
            email: None,
            phone: None,
        })
        .unwrap();
        CustomerRepository::insert(&store, &customer).unwrap();
        let order = Order::open("Maria S.", Some(customer.id)).unwrap();
        OrderRepository::insert(&store, &order).unwrap();

        assert!(CustomerRepository::delete(&store, customer.id).unwrap());

        let stored = OrderRepository::find_by_id(&store, order.id()).unwrap().unwrap();
        assert_eq!(stored.customer_id(), None);
        assert_eq!(stored.customer_name(), "Maria S.");
    }

    #[test]
    fn product_listing_filters_sorts_and_pages() {
        let store = InMemoryStore::new();
        for (name, price) in [("Apple", "3.00"), ("Banana", "1.00"), ("Cherry", "2.00")] {
            let p = Product::create(draft(name, price, 1)).unwrap();
            ProductRepository::insert(&store, &p).unwrap();
        }

        let page = PageRequest::new(1, 2, Sort::new(ProductSortField::Price, SortDirection::Desc));
        let result = ProductRepository::list(&store, &ProductFilter::default(), &page).unwrap();
        assert_eq!(result.total, 3);
        let names: Vec<_> = result.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Apple", "Cherry"]);

        let filter = ProductFilter {
            max_price: Some(dec("2.00")),
            ..Default::default()
        };
        let page = PageRequest::new(1, 10, Sort::new(ProductSortField::Name, SortDirection::Asc));
        let result = ProductRepository::list(&store, &filter, &page).unwrap();
        let names: Vec<_> = result.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Banana", "Cherry"]);
    }
}
