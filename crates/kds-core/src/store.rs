//! Store abstractions for orders and accounts.
//!
//! The notification core treats persistence as an opaque collaborator:
//! "fetch current active orders", "persist a status change", "fetch one
//! order's current snapshot". All backends implement [`OrderStore`]; the
//! in-memory implementations here are the reference used by tests and
//! local development.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::order::{KitchenStatus, Order};

/// Order persistence contract.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Persists a new order.
    ///
    /// Returns `Error::InvalidInput` if an order with the same id exists.
    async fn insert_order(&self, order: Order) -> Result<()>;

    /// Fetches one order's current snapshot.
    ///
    /// Returns `Ok(None)` if the order does not exist.
    async fn get_order(&self, id: &str) -> Result<Option<Order>>;

    /// Lists orders created at or after `since`, newest first.
    async fn list_recent(&self, since: DateTime<Utc>) -> Result<Vec<Order>>;

    /// Persists a kitchen status change into the order's metadata.
    ///
    /// Returns the updated order, or `Ok(None)` if the order does not exist.
    async fn set_kitchen_status(&self, id: &str, status: KitchenStatus)
        -> Result<Option<Order>>;
}

/// Directory of known accounts, consulted when opening a subscription.
#[async_trait]
pub trait AccountDirectory: Send + Sync + 'static {
    /// Returns whether the account id resolves to a known account.
    async fn contains(&self, account_id: &str) -> Result<bool>;
}

/// In-memory order store.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryOrderStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Order>>> {
        self.orders
            .read()
            .map_err(|_| Error::store("order store lock poisoned"))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Order>>> {
        self.orders
            .write()
            .map_err(|_| Error::store("order store lock poisoned"))
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        let mut orders = self.write_lock()?;
        if orders.contains_key(&order.id) {
            return Err(Error::InvalidInput(format!(
                "order already exists: {}",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>> {
        Ok(self.read_lock()?.get(id).cloned())
    }

    async fn list_recent(&self, since: DateTime<Utc>) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .read_lock()?
            .values()
            .filter(|order| order.created_at >= since)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_kitchen_status(
        &self,
        id: &str,
        status: KitchenStatus,
    ) -> Result<Option<Order>> {
        let mut orders = self.write_lock()?;
        let Some(order) = orders.get_mut(id) else {
            return Ok(None);
        };
        order.set_kitchen_status(status);
        Ok(Some(order.clone()))
    }
}

/// In-memory account directory.
#[derive(Debug, Default)]
pub struct MemoryAccountDirectory {
    accounts: RwLock<HashSet<String>>,
}

impl MemoryAccountDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory seeded with the given account ids.
    #[must_use]
    pub fn with_accounts<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(Into::into).collect()),
        }
    }

    /// Adds an account id to the directory.
    pub fn insert(&self, account_id: impl Into<String>) -> Result<()> {
        self.accounts
            .write()
            .map_err(|_| Error::store("account directory lock poisoned"))?
            .insert(account_id.into());
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn contains(&self, account_id: &str) -> Result<bool> {
        Ok(self
            .accounts
            .read()
            .map_err(|_| Error::store("account directory lock poisoned"))?
            .contains(account_id))
    }
}
