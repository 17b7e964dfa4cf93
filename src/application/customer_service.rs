use std::sync::Arc;

use uuid::Uuid;

use crate::domain::customer::{Customer, CustomerDraft};
use crate::domain::errors::DomainError;
use crate::domain::page::{CustomerSortField, Page, PageRequest};
use crate::domain::ports::CustomerRepository;

pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    pub fn list_customers(
        &self,
        page: &PageRequest<CustomerSortField>,
    ) -> Result<Page<Customer>, DomainError> {
        self.customers.list(page)
    }

    pub fn get_customer(&self, id: Uuid) -> Result<Customer, DomainError> {
        log::debug!("loading customer {}", id);
        self.customers
            .find_by_id(id)?
            .ok_or(DomainError::CustomerNotFound(id))
    }

    pub fn create_customer(&self, draft: CustomerDraft) -> Result<Customer, DomainError> {
        let customer = Customer::create(draft)?;
        self.customers.insert(&customer)?;
        log::info!("created customer {} '{}'", customer.id, customer.name);
        Ok(customer)
    }

    pub fn update_customer(&self, id: Uuid, draft: CustomerDraft) -> Result<Customer, DomainError> {
        let customer = self
            .customers
            .update(id, &mut |c: &mut Customer| c.update(draft.clone()))?;
        log::info!("updated customer {}", id);
        Ok(customer)
    }

    /// Linked orders keep their name snapshot and lose the customer link.
    pub fn delete_customer(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.customers.delete(id)? {
            return Err(DomainError::CustomerNotFound(id));
        }
        log::info!("deleted customer {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    fn draft(name: &str, email: Option<&str>) -> CustomerDraft {
        CustomerDraft {
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: None,
        }
    }

    #[test]
    fn create_get_update_delete() {
        let service = CustomerService::new(Arc::new(InMemoryStore::new()));
        let maria = service
            .create_customer(draft("Maria", Some("maria@example.com")))
            .unwrap();
        assert_eq!(service.get_customer(maria.id).unwrap(), maria);

        let updated = service
            .update_customer(maria.id, draft("Maria Souza", None))
            .unwrap();
        assert_eq!(updated.name, "Maria Souza");
        assert_eq!(updated.email, None);

        service.delete_customer(maria.id).unwrap();
        assert!(matches!(
            service.get_customer(maria.id),
            Err(DomainError::CustomerNotFound(_))
        ));
        assert!(matches!(
            service.delete_customer(maria.id),
            Err(DomainError::CustomerNotFound(_))
        ));
    }

    #[test]
    fn bad_email_is_rejected() {
        let service = CustomerService::new(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            service.create_customer(draft("Maria", Some("not-an-address"))),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
