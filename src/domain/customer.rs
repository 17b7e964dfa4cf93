use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CustomerDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerDraft {
    fn validated(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::InvalidInput("name is required".to_string()));
        }
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(DomainError::InvalidInput(format!(
                    "'{email}' is not a valid email address"
                )));
            }
        }
        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(Self { name, email, phone })
    }
}

impl Customer {
    pub fn create(draft: CustomerDraft) -> Result<Self, DomainError> {
        let draft = draft.validated()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            created_at: Utc::now(),
        })
    }

    /// Renaming a customer does not touch the name snapshots on their orders.
    pub fn update(&mut self, draft: CustomerDraft) -> Result<(), DomainError> {
        let draft = draft.validated()?;
        self.name = draft.name;
        self.email = draft.email;
        self.phone = draft.phone;
        Ok(())
    }
}
