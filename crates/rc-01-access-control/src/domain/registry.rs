//! # Access Registry
//!
//! Pure membership logic. Each mutator validates the whole batch first and
//! then applies it, returning the ids whose membership actually changed.

use shared_types::{Address, Role, WorkflowError, WorkflowResult};
use std::collections::HashSet;

/// Owner and authorized-caller sets.
#[derive(Debug, Clone)]
pub struct AccessRegistry {
    owners: HashSet<Address>,
    authorized: HashSet<Address>,
}

impl AccessRegistry {
    /// Creates a registry whose only owner is `bootstrap_owner`.
    #[must_use]
    pub fn new(bootstrap_owner: Address) -> Self {
        let mut owners = HashSet::new();
        owners.insert(bootstrap_owner);
        Self {
            owners,
            authorized: HashSet::new(),
        }
    }

    #[must_use]
    pub fn is_owner(&self, id: &Address) -> bool {
        self.owners.contains(id)
    }

    #[must_use]
    pub fn is_authorized(&self, id: &Address) -> bool {
        self.authorized.contains(id)
    }

    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Owners in ascending byte order.
    #[must_use]
    pub fn owners(&self) -> Vec<Address> {
        sorted(&self.owners)
    }

    /// Authorized callers in ascending byte order.
    #[must_use]
    pub fn authorized_callers(&self) -> Vec<Address> {
        sorted(&self.authorized)
    }

    fn require_owner(&self, caller: &Address) -> WorkflowResult<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(*caller, Role::Owner))
        }
    }

    pub fn add_owners(&mut self, caller: &Address, ids: &[Address]) -> WorkflowResult<Vec<Address>> {
        self.require_owner(caller)?;
        Ok(insert_all(&mut self.owners, ids))
    }

    /// Fails with `InvalidState` if the owner set would become empty.
    pub fn remove_owners(
        &mut self,
        caller: &Address,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.require_owner(caller)?;

        let doomed: HashSet<&Address> = ids.iter().filter(|id| self.owners.contains(id)).collect();
        if doomed.len() >= self.owners.len() {
            return Err(WorkflowError::invalid_state(
                "removing these owners would leave the registry without an owner",
            ));
        }
        Ok(remove_all(&mut self.owners, ids))
    }

    pub fn authorize_callers(
        &mut self,
        caller: &Address,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.require_owner(caller)?;
        Ok(insert_all(&mut self.authorized, ids))
    }

    pub fn unauthorize_callers(
        &mut self,
        caller: &Address,
        ids: &[Address],
    ) -> WorkflowResult<Vec<Address>> {
        self.require_owner(caller)?;
        Ok(remove_all(&mut self.authorized, ids))
    }
}

fn insert_all(set: &mut HashSet<Address>, ids: &[Address]) -> Vec<Address> {
    ids.iter().copied().filter(|id| set.insert(*id)).collect()
}

fn remove_all(set: &mut HashSet<Address>, ids: &[Address]) -> Vec<Address> {
    ids.iter().copied().filter(|id| set.remove(id)).collect()
}

fn sorted(set: &HashSet<Address>) -> Vec<Address> {
    let mut out: Vec<Address> = set.iter().copied().collect();
    out.sort();
    out
}
