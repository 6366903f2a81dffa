// Storage contract the lab needs from a monkey store.

use std::future::Future;

use super::monkey::{Monkey, MonkeyId, NewMonkey};

/// Result of [`MonkeyRepository::record_birth`]. Only `Recorded` changes
/// the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Birth {
    /// The child was stored and both parents aged.
    Recorded(Monkey),
    /// Another monkey already has the child's name.
    NameTaken,
    /// This parent is gone or its age no longer matches the snapshot.
    StaleParent(MonkeyId),
}

/// Store of monkey records used by the lab.
///
/// Implementations must make `record_birth` atomic: either the child is
/// inserted and both parents are aged, or nothing changes.
pub trait MonkeyRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a monkey by id.
    fn find_by_id(
        &self,
        id: MonkeyId,
    ) -> impl Future<Output = Result<Option<Monkey>, Self::Error>> + Send;

    /// Whether a monkey with this name already exists.
    fn name_taken(&self, name: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Insert `child`, then age each parent by one year.
    ///
    /// Each parent is only aged if its stored age still equals the age in
    /// the given snapshot. A name clash on insert is reported as
    /// [`Birth::NameTaken`], not as an error.
    fn record_birth(
        &self,
        child: &NewMonkey,
        parents: [&Monkey; 2],
    ) -> impl Future<Output = Result<Birth, Self::Error>> + Send;

    /// Delete a monkey. Returns `false` when it did not exist.
    fn remove(&self, id: MonkeyId) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("memory store unavailable")]
    pub(crate) struct Unavailable;

    /// In-memory store for lab tests.
    #[derive(Default)]
    pub(crate) struct MemoryRepository {
        pub monkeys: Mutex<BTreeMap<MonkeyId, Monkey>>,
        pub fail_writes: bool,
        /// Every name lookup reports the name as taken.
        pub all_names_taken: bool,
        /// The next name lookup reports the name as free, then stores a
        /// monkey under it before the caller can insert.
        pub steal_next_name: AtomicBool,
        pub name_checks: AtomicUsize,
    }

    impl MemoryRepository {
        pub fn with(monkeys: Vec<Monkey>) -> Self {
            Self {
                monkeys: Mutex::new(monkeys.into_iter().map(|m| (m.id, m)).collect()),
                ..Default::default()
            }
        }

        pub fn name_checks(&self) -> usize {
            self.name_checks.load(Ordering::SeqCst)
        }

        fn next_id(monkeys: &BTreeMap<MonkeyId, Monkey>) -> MonkeyId {
            MonkeyId(monkeys.keys().next_back().map_or(1, |k| k.0 + 1))
        }

        pub fn get(&self, id: i64) -> Option<Monkey> {
            self.monkeys.lock().unwrap().get(&MonkeyId(id)).cloned()
        }

        pub fn len(&self) -> usize {
            self.monkeys.lock().unwrap().len()
        }
    }

    impl MonkeyRepository for MemoryRepository {
        type Error = Unavailable;

        async fn find_by_id(&self, id: MonkeyId) -> Result<Option<Monkey>, Unavailable> {
            Ok(self.monkeys.lock().unwrap().get(&id).cloned())
        }

        async fn name_taken(&self, name: &str) -> Result<bool, Unavailable> {
            self.name_checks.fetch_add(1, Ordering::SeqCst);
            if self.all_names_taken {
                return Ok(true);
            }
            let mut monkeys = self.monkeys.lock().unwrap();
            let taken = monkeys.values().any(|m| m.name == name);
            if !taken && self.steal_next_name.swap(false, Ordering::SeqCst) {
                let id = Self::next_id(&monkeys);
                let mut squatter = monkeys.values().next().cloned().unwrap();
                squatter.id = id;
                squatter.name = name.to_string();
                monkeys.insert(id, squatter);
            }
            Ok(taken)
        }

        async fn record_birth(
            &self,
            child: &NewMonkey,
            parents: [&Monkey; 2],
        ) -> Result<Birth, Unavailable> {
            if self.fail_writes {
                return Err(Unavailable);
            }
            let mut monkeys = self.monkeys.lock().unwrap();
            if monkeys.values().any(|m| m.name == child.name) {
                return Ok(Birth::NameTaken);
            }
            let stale = parents
                .iter()
                .find(|p| !monkeys.get(&p.id).is_some_and(|stored| stored.age == p.age));
            if let Some(p) = stale {
                return Ok(Birth::StaleParent(p.id));
            }

            let id = Self::next_id(&monkeys);
            let stored = Monkey {
                id,
                name: child.name.clone(),
                age: child.age,
                is_cool: child.is_cool,
                strength: child.strength,
                intelligence: child.intelligence,
                speed: child.speed,
                parent1_id: child.parent1_id,
                parent2_id: child.parent2_id,
                created_at: String::new(),
                updated_at: String::new(),
            };
            monkeys.insert(id, stored.clone());
            for p in parents {
                if let Some(m) = monkeys.get_mut(&p.id) {
                    m.age += 1;
                }
            }
            Ok(Birth::Recorded(stored))
        }

        async fn remove(&self, id: MonkeyId) -> Result<bool, Unavailable> {
            if self.fail_writes {
                return Err(Unavailable);
            }
            Ok(self.monkeys.lock().unwrap().remove(&id).is_some())
        }
    }
}
