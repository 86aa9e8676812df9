use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use flowgic_core::CompanyId;

/// Key/value rows that can only be addressed through their company.
///
/// Everything here can be rebuilt from the event store, so a poisoned lock
/// degrades to "no rows" instead of an error.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, company_id: CompanyId, key: &K) -> Option<V>;
    fn upsert(&self, company_id: CompanyId, key: K, value: V);
    fn list(&self, company_id: CompanyId) -> Vec<V>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, company_id: CompanyId, key: &K) -> Option<V> {
        S::get(self, company_id, key)
    }

    fn upsert(&self, company_id: CompanyId, key: K, value: V) {
        S::upsert(self, company_id, key, value)
    }

    fn list(&self, company_id: CompanyId) -> Vec<V> {
        S::list(self, company_id)
    }
}

#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    partitions: RwLock<HashMap<CompanyId, HashMap<K, V>>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, company_id: CompanyId, key: &K) -> Option<V> {
        let partitions = self.partitions.read().ok()?;
        partitions.get(&company_id)?.get(key).cloned()
    }

    fn upsert(&self, company_id: CompanyId, key: K, value: V) {
        match self.partitions.write() {
            Ok(mut partitions) => {
                partitions.entry(company_id).or_default().insert(key, value);
            }
            Err(_) => tracing::error!(%company_id, "read model lock poisoned; row dropped"),
        }
    }

    fn list(&self, company_id: CompanyId) -> Vec<V> {
        self.partitions
            .read()
            .ok()
            .and_then(|partitions| {
                partitions
                    .get(&company_id)
                    .map(|rows| rows.values().cloned().collect())
            })
            .unwrap_or_default()
    }
}
