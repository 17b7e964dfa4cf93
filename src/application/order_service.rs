use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Discount, Order};
use crate::domain::page::{OrderSortField, Page, PageRequest};
use crate::domain::payment::PaymentMethod;
use crate::domain::ports::{CustomerRepository, OrderRepository, ProductRepository};
use crate::domain::product::Product;

/// Runs the tab operations. Each call is one unit of work: the order is
/// loaded, mutated and saved inside [`OrderRepository::update`], so a failed
/// call never leaves a half-applied change behind.
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    customers: Arc<dyn CustomerRepository>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self {
            orders,
            products,
            customers,
        }
    }

    pub fn list_orders(
        &self,
        page: &PageRequest<OrderSortField>,
    ) -> Result<Page<Order>, DomainError> {
        self.orders.list(page)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        log::debug!("loading order {}", id);
        self.orders
            .find_by_id(id)?
            .ok_or(DomainError::OrderNotFound(id))
    }

    pub fn create_order(
        &self,
        customer_name: &str,
        customer_id: Option<Uuid>,
    ) -> Result<Order, DomainError> {
        if let Some(customer_id) = customer_id {
            self.customers
                .find_by_id(customer_id)?
                .ok_or(DomainError::CustomerNotFound(customer_id))?;
        }
        let order = Order::open(customer_name, customer_id)?;
        self.orders.insert(&order)?;
        log::info!(
            "opened order {} for '{}' (customer {:?})",
            order.id(),
            order.customer_name(),
            order.customer_id()
        );
        Ok(order)
    }

    /// Adds a product line, or grows the existing line for that product.
    /// Catalog stock is not touched.
    pub fn add_item(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Order, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity.into()));
        }
        // Fail fast on a missing or closed order before consulting the
        // catalog; the mutation below re-checks under the row lock.
        self.get_order(order_id)?.ensure_open()?;
        let product = self.find_product(product_id)?;

        let order = self.orders.update(order_id, &mut |order: &mut Order| {
            order.add_item(&product, quantity).map(|_| ())
        })?;
        log::info!(
            "order {}: added {} x {} at {}",
            order_id,
            quantity,
            product.id,
            product.price
        );
        Ok(order)
    }

    pub fn remove_item(&self, order_id: Uuid, item_id: Uuid) -> Result<Order, DomainError> {
        let order = self.orders.update(order_id, &mut |order: &mut Order| {
            order.remove_item(item_id).map(|_| ())
        })?;
        log::info!("order {}: removed line {}", order_id, item_id);
        Ok(order)
    }

    pub fn apply_discount(
        &self,
        order_id: Uuid,
        percent: BigDecimal,
        amount: BigDecimal,
    ) -> Result<Order, DomainError> {
        let discount = Discount::new(percent, amount)?;
        let order = self.orders.update(order_id, &mut |order: &mut Order| {
            order.apply_discount(discount.clone())
        })?;
        log::info!(
            "order {}: discount {}% + {} applied, total now {}",
            order_id,
            discount.percent(),
            discount.amount(),
            order.total()
        );
        Ok(order)
    }

    pub fn set_payment_method(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
    ) -> Result<Order, DomainError> {
        let order = self.orders.update(order_id, &mut |order: &mut Order| {
            order.set_payment_method(method)
        })?;
        log::info!("order {}: payment method set to {}", order_id, method);
        Ok(order)
    }

    pub fn checkout(&self, order_id: Uuid, method: PaymentMethod) -> Result<Order, DomainError> {
        let order = self.orders.update(order_id, &mut |order: &mut Order| {
            order.checkout(method)
        })?;
        log::info!(
            "order {} closed with {}, total {}",
            order_id,
            method,
            order.total()
        );
        Ok(order)
    }

    /// Closes with the recorded payment method, defaulting to cash.
    pub fn close(&self, order_id: Uuid) -> Result<Order, DomainError> {
        let order = self
            .orders
            .update(order_id, &mut |order: &mut Order| order.close())?;
        log::info!(
            "order {} closed with {}, total {}",
            order_id,
            order
                .payment_method()
                .map_or("none", PaymentMethod::as_str),
            order.total()
        );
        Ok(order)
    }

    /// Administrative removal; allowed whatever the order's status.
    pub fn delete_order(&self, order_id: Uuid) -> Result<(), DomainError> {
        if !self.orders.delete(order_id)? {
            return Err(DomainError::OrderNotFound(order_id));
        }
        log::info!("deleted order {}", order_id);
        Ok(())
    }

    pub fn payment_methods(&self) -> &'static [PaymentMethod] {
        &PaymentMethod::ALL
    }

    fn find_product(&self, product_id: Uuid) -> Result<Product, DomainError> {
        self.products
            .find_by_id(product_id)?
            .ok_or(DomainError::ProductNotFound(product_id))
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::Zero;

    use super::*;
    use crate::domain::customer::{Customer, CustomerDraft};
    use crate::domain::order::tests::dec;
    use crate::domain::order::OrderStatus;
    use crate::domain::page::{Sort, SortDirection};
    use crate::domain::product::tests::draft;
    use crate::infrastructure::memory::InMemoryStore;

    struct Fixture {
        store: InMemoryStore,
        service: OrderService,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let service = OrderService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        Fixture { store, service }
    }

    impl Fixture {
        fn product(&self, name: &str, price: &str, stock: i32) -> Product {
            let product = Product::create(draft(name, price, stock)).unwrap();
            ProductRepository::insert(&self.store, &product).unwrap();
            product
        }

        fn stored(&self, id: Uuid) -> Order {
            OrderRepository::find_by_id(&self.store, id).unwrap().unwrap()
        }
    }

    #[test]
    fn create_rejects_unknown_customer() {
        let fx = fixture();
        let missing = Uuid::new_v4();
        let err = fx.service.create_order("Maria", Some(missing)).unwrap_err();
        assert!(matches!(err, DomainError::CustomerNotFound(id) if id == missing));
    }

    #[test]
    fn create_links_customer_and_keeps_name_snapshot() {
        let fx = fixture();
        let customer = Customer::create(CustomerDraft {
            name: "Maria Souza".to_string(),
            email: None,
            phone: None,
        })
        .unwrap();
        CustomerRepository::insert(&fx.store, &customer).unwrap();

        let order = fx.service.create_order("Mari", Some(customer.id)).unwrap();
        assert_eq!(order.customer_id(), Some(customer.id));
        assert_eq!(order.customer_name(), "Mari");
        assert_eq!(fx.stored(order.id()), order);
    }

    #[test]
    fn add_item_validates_quantity_first() {
        let fx = fixture();
        let err = fx
            .service
            .add_item(Uuid::new_v4(), Uuid::new_v4(), 0)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(0)));
    }

    #[test]
    fn add_item_reports_missing_order_and_product() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "3.00", 1);
        let missing = Uuid::new_v4();
        assert!(matches!(
            fx.service.add_item(missing, p1.id, 1),
            Err(DomainError::OrderNotFound(id)) if id == missing
        ));

        let order = fx.service.create_order("Maria", None).unwrap();
        assert!(matches!(
            fx.service.add_item(order.id(), missing, 1),
            Err(DomainError::ProductNotFound(id)) if id == missing
        ));
        assert!(fx.stored(order.id()).items().is_empty());
    }

    #[test]
    fn add_item_does_not_touch_stock() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "3.00", 1);
        let order = fx.service.create_order("Maria", None).unwrap();

        let order = fx.service.add_item(order.id(), p1.id, 5).unwrap();
        assert_eq!(order.items()[0].quantity, 5);

        let product = ProductRepository::find_by_id(&fx.store, p1.id)
            .unwrap()
            .unwrap();
        assert_eq!(product.stock_quantity, 1);
    }

    #[test]
    fn later_price_change_does_not_reprice_existing_line() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "3.00", 10);
        let order = fx.service.create_order("Maria", None).unwrap();
        fx.service.add_item(order.id(), p1.id, 1).unwrap();

        ProductRepository::update(&fx.store, p1.id, &mut |p: &mut Product| {
            p.price = dec("9.99");
            Ok(())
        })
        .unwrap();
        let order = fx.service.add_item(order.id(), p1.id, 1).unwrap();

        assert_eq!(order.items()[0].unit_price, dec("3.00"));
        assert_eq!(order.subtotal(), dec("6.00"));
    }

    #[test]
    fn remove_missing_line_leaves_order_unchanged() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "3.00", 10);
        let order = fx.service.create_order("Maria", None).unwrap();
        let order = fx.service.add_item(order.id(), p1.id, 2).unwrap();

        let err = fx
            .service
            .remove_item(order.id(), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, DomainError::LineItemNotFound { .. }));
        assert_eq!(fx.stored(order.id()), order);
    }

    #[test]
    fn remove_item_recomputes_subtotal() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "3.00", 10);
        let p2 = fx.product("Cake", "8.00", 10);
        let order = fx.service.create_order("Maria", None).unwrap();
        fx.service.add_item(order.id(), p1.id, 2).unwrap();
        let order = fx.service.add_item(order.id(), p2.id, 1).unwrap();
        let cake_line = order.item_for_product(p2.id).unwrap().id;

        let order = fx.service.remove_item(order.id(), cake_line).unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.subtotal(), dec("6.00"));
    }

    #[test]
    fn invalid_discount_is_rejected_before_loading() {
        let fx = fixture();
        let err = fx
            .service
            .apply_discount(Uuid::new_v4(), dec("101"), dec("0"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidDiscount(_)));
    }

    #[test]
    fn mutations_on_closed_order_fail_and_persist_nothing() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "3.00", 10);
        let order = fx.service.create_order("Maria", None).unwrap();
        let order = fx.service.add_item(order.id(), p1.id, 1).unwrap();
        let line = order.items()[0].id;
        let closed = fx.service.checkout(order.id(), PaymentMethod::Pix).unwrap();

        let id = order.id();
        let attempts = [
            fx.service.add_item(id, p1.id, 1),
            fx.service.remove_item(id, line),
            fx.service.apply_discount(id, dec("10"), dec("0")),
            fx.service.set_payment_method(id, PaymentMethod::Cash),
            fx.service.checkout(id, PaymentMethod::Cash),
            fx.service.close(id),
        ];
        for attempt in attempts {
            let err = attempt.unwrap_err();
            assert!(matches!(err, DomainError::OrderClosed(_)), "got {err:?}");
        }
        assert_eq!(fx.stored(id), closed);
    }

    #[test]
    fn close_defaults_to_cash_and_only_once() {
        let fx = fixture();
        let order = fx.service.create_order("Maria", None).unwrap();

        let closed = fx.service.close(order.id()).unwrap();
        assert_eq!(closed.payment_method(), Some(PaymentMethod::Cash));
        let closed_at = closed.closed_at().unwrap();

        assert!(fx.service.close(order.id()).is_err());
        assert_eq!(fx.stored(order.id()).closed_at(), Some(closed_at));
    }

    #[test]
    fn delete_removes_closed_orders_too() {
        let fx = fixture();
        let order = fx.service.create_order("Maria", None).unwrap();
        fx.service.close(order.id()).unwrap();

        fx.service.delete_order(order.id()).unwrap();
        assert!(matches!(
            fx.service.get_order(order.id()),
            Err(DomainError::OrderNotFound(_))
        ));
        assert!(matches!(
            fx.service.delete_order(order.id()),
            Err(DomainError::OrderNotFound(_))
        ));
    }

    #[test]
    fn maria_end_to_end() {
        let fx = fixture();
        let p1 = fx.product("P1", "10.00", 100);

        let order = fx.service.create_order("Maria", None).unwrap();
        fx.service.add_item(order.id(), p1.id, 2).unwrap();
        let order = fx.service.add_item(order.id(), p1.id, 3).unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.subtotal(), dec("50.00"));

        let order = fx
            .service
            .apply_discount(order.id(), dec("10"), dec("2"))
            .unwrap();
        assert_eq!(order.total(), dec("43.00"));

        let order = fx.service.checkout(order.id(), PaymentMethod::Cash).unwrap();
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(order.payment_method(), Some(PaymentMethod::Cash));
        assert!(order.closed_at().is_some());

        assert!(matches!(
            fx.service.add_item(order.id(), p1.id, 1),
            Err(DomainError::OrderClosed(_))
        ));
    }

    #[test]
    fn concurrent_adds_to_one_order_are_not_lost() {
        let fx = fixture();
        let p1 = fx.product("Coffee", "1.00", 0);
        let order = fx.service.create_order("Maria", None).unwrap();
        let service = Arc::new(fx.service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let (order_id, product_id) = (order.id(), p1.id);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        service.add_item(order_id, product_id, 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let order = service.get_order(order.id()).unwrap();
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.items()[0].quantity, 200);
        assert_eq!(order.subtotal(), dec("200"));
    }

    #[test]
    fn listing_is_paged_and_sorted() {
        let fx = fixture();
        for name in ["Carla", "Ana", "Bruno"] {
            fx.service.create_order(name, None).unwrap();
        }
        let page = PageRequest::new(
            1,
            2,
            Sort::new(OrderSortField::CustomerName, SortDirection::Asc),
        );
        let result = fx.service.list_orders(&page).unwrap();
        assert_eq!(result.total, 3);
        let names: Vec<_> = result.items.iter().map(|o| o.customer_name()).collect();
        assert_eq!(names, ["Ana", "Bruno"]);
        assert!(result.items.iter().all(|o| o.total() == BigDecimal::zero()));
    }

    #[test]
    fn payment_methods_are_the_fixed_table() {
        let fx = fixture();
        let names: Vec<_> = fx
            .service
            .payment_methods()
            .iter()
            .map(|m| m.as_str())
            .collect();
        assert_eq!(
            names,
            ["CASH", "PIX", "DEBIT_CARD", "CREDIT_CARD", "FOOD_VOUCHER", "TRANSFER"]
        );
    }
}
