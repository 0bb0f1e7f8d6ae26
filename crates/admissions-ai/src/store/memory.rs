use std::sync::{Arc, Mutex, MutexGuard};

use super::{Entity, Repository, RepositoryError};

/// Insertion-ordered in-memory collection used by tests and the demo service.
#[derive(Clone)]
pub struct MemoryRepository<T> {
    records: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Entity> MemoryRepository<T> {
    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<T>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable(format!("{} store poisoned", T::KIND)))
    }
}

impl<T: Entity> Repository<T> for MemoryRepository<T> {
    fn list(&self, limit: usize) -> Result<Vec<T>, RepositoryError> {
        Ok(self.lock()?.iter().take(limit).cloned().collect())
    }

    fn filter(
        &self,
        predicate: &(dyn Fn(&T) -> bool + Send + Sync),
        limit: usize,
    ) -> Result<Vec<T>, RepositoryError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|record| predicate(record))
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        Ok(self.lock()?.iter().find(|record| record.id() == id).cloned())
    }

    fn create(&self, record: T) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.iter().any(|existing| existing.id() == record.id()) {
            return Err(RepositoryError::Conflict {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: T) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        match guard.iter_mut().find(|existing| existing.id() == record.id()) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(RepositoryError::NotFound {
                kind: T::KIND,
                id: record.id().to_string(),
            }),
        }
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let before = guard.len();
        guard.retain(|record| record.id() != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
