//! At-most-one-fetch-per-scope bookkeeping shared by the timer and user-triggered reloads.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::dto::CourtId;

/// Unit of refresh work; two fetches of the same scope never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshScope {
    Notifications,
    Court(CourtId),
}

/// Registry of scopes with a fetch in flight.
///
/// The stored flag records that another caller asked for a fresh load while the current one
/// was running; the owner then loops once more before releasing the scope.
#[derive(Debug, Default, Clone)]
pub struct InFlight {
    scopes: Arc<DashMap<RefreshScope, bool>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `scope`, or return `None` when a fetch is already running.
    pub fn try_begin(&self, scope: RefreshScope) -> Option<InFlightGuard> {
        match self.scopes.entry(scope) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(false);
                Some(InFlightGuard {
                    scopes: self.scopes.clone(),
                    scope,
                    released: false,
                })
            }
        }
    }

    /// Claim `scope`; when busy, ask the running owner for one more pass instead.
    pub fn begin_or_rerun(&self, scope: RefreshScope) -> Option<InFlightGuard> {
        match self.scopes.entry(scope) {
            Entry::Occupied(mut slot) => {
                slot.insert(true);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(false);
                Some(InFlightGuard {
                    scopes: self.scopes.clone(),
                    scope,
                    released: false,
                })
            }
        }
    }

    pub fn is_busy(&self, scope: RefreshScope) -> bool {
        self.scopes.contains_key(&scope)
    }
}

/// Ownership of one scope; dropping it releases the scope.
#[derive(Debug)]
pub struct InFlightGuard {
    scopes: Arc<DashMap<RefreshScope, bool>>,
    scope: RefreshScope,
    released: bool,
}

impl InFlightGuard {
    pub fn scope(&self) -> RefreshScope {
        self.scope
    }

    /// Release the scope unless a rerun was requested meanwhile.
    ///
    /// Returns `true` when the scope was released and `false` when the caller must run again;
    /// the rerun flag is reset in that case so each request costs one extra pass.
    pub fn finish(&mut self) -> bool {
        if self.released {
            return true;
        }
        if self.scopes.remove_if(&self.scope, |_, rerun| !*rerun).is_some() {
            self.released = true;
            return true;
        }
        if let Some(mut rerun) = self.scopes.get_mut(&self.scope) {
            *rerun = false;
        }
        false
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.released {
            self.scopes.remove(&self.scope);
        }
    }
}
