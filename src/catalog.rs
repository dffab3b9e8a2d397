//! Problem statements.

use tracing::info;

use crate::{
    core::store::{DocumentStore, StoreError},
    record::{Problem, ProblemPatch},
    types::ProblemId,
};

/// CRUD over the `problems` collection. Performs no authorization.
pub struct ProblemCatalog<'a> {
    store: &'a mut DocumentStore,
}

impl<'a> ProblemCatalog<'a> {
    /// View over `store`.
    pub fn new(store: &'a mut DocumentStore) -> Self {
        Self { store }
    }

    /// Every problem in insertion order.
    pub fn list(&self) -> &[Problem] {
        self.store.list::<Problem>()
    }

    /// The problem with `id`.
    pub fn get(&self, id: ProblemId) -> Result<&Problem, StoreError> {
        self.store.find::<Problem>(|p| p.id == id)
    }

    /// Stores a new problem under a fresh id and flushes.
    pub fn create(&mut self, title: &str, content: &str) -> Result<ProblemId, StoreError> {
        let id = self.store.insert(Problem {
            id: 0,
            title: title.to_string(),
            content: content.to_string(),
        })?;
        info!(id, "problem created");
        Ok(id)
    }

    /// Applies `patch` and returns the updated problem. An empty patch
    /// returns the record unchanged without a flush.
    pub fn update(&mut self, id: ProblemId, patch: &ProblemPatch) -> Result<Problem, StoreError> {
        if patch.is_empty() {
            return self.get(id).cloned();
        }
        let updated = self.store.mutate::<Problem, _>(
            |p| p.id == id,
            |p| {
                patch.apply_to(p);
                p.clone()
            },
        )?;
        info!(id, "problem updated");
        Ok(updated)
    }

    /// Removes the problem; its id is never reissued.
    pub fn delete(&mut self, id: ProblemId) -> Result<bool, StoreError> {
        let removed = self.store.remove::<Problem>(|p| p.id == id)?;
        if removed {
            info!(id, "problem deleted");
        }
        Ok(removed)
    }
}
