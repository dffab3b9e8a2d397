use serde::{Serialize, de::DeserializeOwned};

use crate::record::{Problem, Submission, User};

use super::store::Database;

/// A record shape stored in one of the database collections.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + 'static {
    /// Collection name used in logs and errors.
    const COLLECTION: &'static str;

    /// Borrows this document's collection from the database.
    fn collection(db: &Database) -> &Collection<Self>;

    /// Mutably borrows this document's collection from the database.
    fn collection_mut(db: &mut Database) -> &mut Collection<Self>;
}

/// A document whose key is allocated by the store's counter.
pub trait Keyed: Document {
    /// Current id.
    fn id(&self) -> u64;

    /// Stamps a freshly allocated id onto the record.
    fn set_id(&mut self, id: u64);
}

/// Ordered records plus the highest id ever issued for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    records: Vec<T>,
    counter: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            counter: 0,
        }
    }
}

impl<T> Collection<T> {
    /// Empty collection with a zero counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection from stored records and counter, taken as is.
    pub fn from_parts(records: Vec<T>, counter: u64) -> Self {
        Self { records, counter }
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Highest id issued so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Issues the next id. The counter only ever grows, so removed ids are
    /// never handed out again.
    pub fn allocate(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Appends a record.
    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.records.iter().find(|r| pred(r))
    }

    /// Mutable access to the first record matching `pred`.
    pub fn find_mut(&mut self, pred: impl Fn(&T) -> bool) -> Option<&mut T> {
        self.records.iter_mut().find(|r| pred(r))
    }

    /// Removes the first match, preserving the order of the rest.
    pub fn remove_first(&mut self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let pos = self.records.iter().position(|r| pred(r))?;
        Some(self.records.remove(pos))
    }
}

impl<T: Keyed> Collection<T> {
    /// Builds a collection whose counter is at least every stored id.
    pub fn from_records(records: Vec<T>, counter: u64) -> Self {
        let max_id = records.iter().map(Keyed::id).max().unwrap_or(0);
        Self::from_parts(records, counter.max(max_id))
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn collection(db: &Database) -> &Collection<Self> {
        &db.users
    }

    fn collection_mut(db: &mut Database) -> &mut Collection<Self> {
        &mut db.users
    }
}

impl Document for Problem {
    const COLLECTION: &'static str = "problems";

    fn collection(db: &Database) -> &Collection<Self> {
        &db.problems
    }

    fn collection_mut(db: &mut Database) -> &mut Collection<Self> {
        &mut db.problems
    }
}

impl Keyed for Problem {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Document for Submission {
    const COLLECTION: &'static str = "submissions";

    fn collection(db: &Database) -> &Collection<Self> {
        &db.submissions
    }

    fn collection_mut(db: &mut Database) -> &mut Collection<Self> {
        &mut db.submissions
    }
}

impl Keyed for Submission {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(id: u64) -> Problem {
        Problem {
            id,
            title: format!("p{id}"),
            content: "c".to_string(),
        }
    }

    #[test]
    fn counter_never_drops_below_stored_ids() {
        let c = Collection::from_records(vec![problem(3), problem(7)], 2);
        assert_eq!(c.counter(), 7);
        let c = Collection::from_records(vec![problem(3)], 10);
        assert_eq!(c.counter(), 10);
    }

    #[test]
    fn remove_first_keeps_order() {
        let mut c = Collection::from_records(vec![problem(1), problem(2), problem(3)], 3);
        assert!(c.remove_first(|p| p.id == 2).is_some());
        let ids: Vec<u64> = c.records().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(c.remove_first(|p| p.id == 2).is_none());
    }
}
