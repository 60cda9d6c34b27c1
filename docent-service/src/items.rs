//! In-memory item store.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

/// A named, priced item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
}

/// Items keyed by a monotonically allocated id. Nothing is persisted.
pub struct ItemStore {
    items: DashMap<u64, Item>,
    next_id: AtomicU64,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new item under a fresh id, ignoring any id the caller supplied
    pub fn create(&self, mut item: Item) -> Item {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        item.id = Some(id);
        self.items.insert(id, item.clone());
        info!(item_id = id, name = %item.name, "Item created");
        item
    }

    pub fn get(&self, id: u64) -> ServiceResult<Item> {
        self.items
            .get(&id)
            .map(|item| item.clone())
            .ok_or(ServiceError::ItemNotFound { item_id: id })
    }

    /// All items ordered by id
    pub fn list(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.iter().map(|item| item.clone()).collect();
        items.sort_by_key(|item| item.id);
        items
    }

    /// Replace an existing item, keeping its id
    pub fn update(&self, id: u64, mut item: Item) -> ServiceResult<Item> {
        let mut existing = self
            .items
            .get_mut(&id)
            .ok_or(ServiceError::ItemNotFound { item_id: id })?;
        item.id = Some(id);
        *existing = item.clone();
        Ok(item)
    }

    pub fn delete(&self, id: u64) -> ServiceResult<()> {
        self.items
            .remove(&id)
            .map(|_| info!(item_id = id, "Item deleted"))
            .ok_or(ServiceError::ItemNotFound { item_id: id })
    }
}
