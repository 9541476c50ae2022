//! Registry of live interactors

use std::collections::HashMap;

use super::connection::Interactor;
use super::handle::{InteractorHandle, InteractorId};
use crate::error::Error;

/// Owns every live [`Interactor`]
///
/// Only the dispatcher touches it. Removal returns the interactor's handle so
/// the caller can run routing cleanup; a second removal of the same id
/// returns `None`.
#[derive(Default)]
pub struct InteractorManager {
    interactors: HashMap<InteractorId, Interactor>,
}

impl InteractorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and start an interactor
    pub fn add_interactor(&mut self, mut interactor: Interactor) -> InteractorHandle {
        let handle = interactor.handle().clone();
        tracing::info!(interactor = %handle, "Adding interactor");

        interactor.start();
        self.interactors.insert(handle.id().clone(), interactor);
        handle
    }

    /// Remove and close an interactor whose peer went away
    pub async fn close_interactor(&mut self, id: &InteractorId) -> Option<InteractorHandle> {
        let mut interactor = self.interactors.remove(id)?;
        tracing::info!(interactor = %interactor.handle(), "Closing interactor");

        interactor.close().await;
        Some(interactor.handle().clone())
    }

    /// Remove and close an interactor after an error
    pub async fn fault_interactor(
        &mut self,
        id: &InteractorId,
        error: &Error,
    ) -> Option<InteractorHandle> {
        let mut interactor = self.interactors.remove(id)?;
        tracing::warn!(interactor = %interactor.handle(), error = %error, "Faulting interactor");

        interactor.close().await;
        Some(interactor.handle().clone())
    }

    pub fn get(&self, id: &InteractorId) -> Option<&InteractorHandle> {
        self.interactors.get(id).map(Interactor::handle)
    }

    pub fn contains(&self, id: &InteractorId) -> bool {
        self.interactors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.interactors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactors.is_empty()
    }

    /// Close every interactor
    pub async fn close_all(&mut self) {
        tracing::debug!(count = self.interactors.len(), "Closing all interactors");

        for (_, mut interactor) in self.interactors.drain() {
            interactor.close().await;
        }
    }
}
