//! Resumption after the consent round trip
//!
//! The provider callback carries only the authorization code; which test
//! the user was running lives in the session store as the pending marker.
//! This controller records the code via the authorization manager, looks
//! the pending operation back up in the catalog, and clears the marker so
//! a stray second callback cannot replay it.

use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::manager::AuthorizationManager;
use crate::operation::{Catalog, TestOperation};

pub struct ResumptionController {
    auth: Arc<AuthorizationManager>,
    catalog: Arc<Catalog>,
}

impl ResumptionController {
    pub fn new(auth: Arc<AuthorizationManager>, catalog: Arc<Catalog>) -> Self {
        Self { auth, catalog }
    }

    /// Accept the callback code and return the operation to re-run.
    ///
    /// The pending marker is consumed exactly once: a callback with no
    /// pending operation (double delivery, hand-typed URL) is an error,
    /// not a silent no-op.
    pub fn on_callback(&self, code: &str) -> Result<TestOperation> {
        let pending = self
            .auth
            .handle_callback(code)
            .ok_or(Error::NoPendingOperation)?;

        let operation = self
            .catalog
            .get(&pending)
            .cloned()
            .ok_or_else(|| Error::UnknownOperation(pending.clone()))?;

        self.auth.clear_pending();
        info!(operation = operation.id, "resuming suspended test after consent");
        Ok(operation)
    }
}
