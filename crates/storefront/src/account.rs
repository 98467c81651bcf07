//! Signed-in customer profile.
//!
//! There is no password check: signing in records who is shopping so the
//! checkout can prefill their contact details. The profile lives in the
//! `user` namespace.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use vitrine_core::Email;

use crate::storage::{BoundedStorage, Namespace, StorageError};

/// A customer's saved identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub email: Email,
}

impl CustomerProfile {
    /// Build a profile. Without a name, the email's local part is used.
    #[must_use]
    pub fn new(email: Email, name: Option<&str>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(
                || {
                    email
                        .as_str()
                        .split_once('@')
                        .map_or(email.as_str(), |(local, _)| local)
                        .to_string()
                },
                ToString::to_string,
            );
        Self { name, email }
    }

    /// First word of the name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }

    /// Everything after the first word of the name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        let trimmed = self.name.trim();
        trimmed
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest.trim())
    }
}

/// The signed-in customer, if any.
pub struct Account {
    profile: Option<CustomerProfile>,
    storage: BoundedStorage,
}

impl Account {
    /// Restore the profile saved in the `user` namespace.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or decoded.
    #[instrument(skip_all)]
    pub async fn load(storage: BoundedStorage) -> Result<Self, StorageError> {
        let profile = storage.load(Namespace::User).await?;
        Ok(Self { profile, storage })
    }

    /// An account with nobody signed in.
    #[must_use]
    pub const fn signed_out(storage: BoundedStorage) -> Self {
        Self {
            profile: None,
            storage,
        }
    }

    /// The signed-in customer.
    #[must_use]
    pub const fn current(&self) -> Option<&CustomerProfile> {
        self.profile.as_ref()
    }

    /// Record `profile` as the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be saved; the previous
    /// profile stays signed in.
    #[instrument(skip_all, fields(email = %profile.email))]
    pub async fn sign_in(&mut self, profile: CustomerProfile) -> Result<(), StorageError> {
        self.storage.save(Namespace::User, &profile).await?;
        self.profile = Some(profile);
        info!("Customer signed in");
        Ok(())
    }

    /// Forget the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored profile cannot be removed.
    #[instrument(skip_all)]
    pub async fn sign_out(&mut self) -> Result<(), StorageError> {
        self.storage.remove(Namespace::User).await?;
        if self.profile.take().is_some() {
            info!("Customer signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use test_case::test_case;

    use super::*;
    use crate::storage::MemoryStorage;

    fn email() -> Email {
        Email::parse("maria.silva@loja.com.br").unwrap()
    }

    #[test_case(Some("Maria Clara Silva"), "Maria", "Clara Silva" ; "full name")]
    #[test_case(Some("Maria"), "Maria", "" ; "single name")]
    #[test_case(None, "maria.silva", "" ; "from email")]
    #[test_case(Some("   "), "maria.silva", "" ; "blank name")]
    fn test_name_parts(name: Option<&str>, first: &str, last: &str) {
        let profile = CustomerProfile::new(email(), name);
        assert_eq!(profile.first_name(), first);
        assert_eq!(profile.last_name(), last);
    }

    #[tokio::test]
    async fn test_sign_in_and_out_persist() {
        let memory = Arc::new(MemoryStorage::new());
        let storage = BoundedStorage::new(memory.clone(), Duration::from_secs(1));

        let mut account = Account::load(storage.clone()).await.unwrap();
        assert!(account.current().is_none());

        account
            .sign_in(CustomerProfile::new(email(), Some("Maria Silva")))
            .await
            .unwrap();
        let reloaded = Account::load(storage.clone()).await.unwrap();
        assert_eq!(reloaded.current().unwrap().name, "Maria Silva");

        account.sign_out().await.unwrap();
        assert!(account.current().is_none());
        assert!(memory.document(Namespace::User).is_none());
    }
}
