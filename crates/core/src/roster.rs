// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The roster: the controller-owned ordered collection of taskspaces.

use crate::event::TaskspaceStatusEntry;
use crate::id::TaskspaceId;
use crate::taskspace::Taskspace;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("taskspace {0} is already in the roster")]
    DuplicateId(TaskspaceId),

    #[error("taskspace {0} is not in the roster")]
    UnknownId(TaskspaceId),
}

/// Ordered sequence of taskspaces plus the active identifier.
///
/// Invariants: identifiers are unique; the active identifier, when
/// present, names a member. Mutations go through the methods here so
/// the invariants hold at every observation point.
#[derive(Debug, Default)]
pub struct Roster {
    hostname: String,
    active: Option<TaskspaceId>,
    taskspaces: Vec<Taskspace>,
}

impl Roster {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            active: None,
            taskspaces: Vec::new(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn len(&self) -> usize {
        self.taskspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taskspaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Taskspace> {
        self.taskspaces.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Taskspace> {
        self.taskspaces.iter_mut()
    }

    pub fn contains(&self, id: TaskspaceId) -> bool {
        self.taskspaces.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: TaskspaceId) -> Option<&Taskspace> {
        self.taskspaces.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TaskspaceId) -> Option<&mut Taskspace> {
        self.taskspaces.iter_mut().find(|t| t.id == id)
    }

    /// Append a taskspace, rejecting duplicate identifiers.
    pub fn insert(&mut self, taskspace: Taskspace) -> Result<(), RosterError> {
        if self.contains(taskspace.id) {
            return Err(RosterError::DuplicateId(taskspace.id));
        }
        self.taskspaces.push(taskspace);
        Ok(())
    }

    /// Remove a taskspace. When it was active, the first survivor (if
    /// any) becomes active so the active-is-a-member invariant holds.
    pub fn remove(&mut self, id: TaskspaceId) -> Option<Taskspace> {
        let pos = self.taskspaces.iter().position(|t| t.id == id)?;
        let removed = self.taskspaces.remove(pos);
        if self.active == Some(id) {
            self.active = self.taskspaces.first().map(|t| t.id);
        }
        Some(removed)
    }

    pub fn active_id(&self) -> Option<TaskspaceId> {
        self.active
    }

    pub fn active(&self) -> Option<&Taskspace> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn set_active(&mut self, id: TaskspaceId) -> Result<(), RosterError> {
        if !self.contains(id) {
            return Err(RosterError::UnknownId(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Roster summary for a `status_response`.
    pub fn status_entries(&self) -> Vec<TaskspaceStatusEntry> {
        self.taskspaces
            .iter()
            .map(|t| TaskspaceStatusEntry {
                name: t.name.clone(),
                status: t.state.label().to_string(),
                uuid: t.id,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "roster_tests.rs"]
mod tests;
