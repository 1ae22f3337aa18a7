//! Session-level facade
//!
//! Wires one session's authorization manager, runner, and resumption
//! controller over a shared session store, and exposes the two entry
//! points the HTTP layer needs: run a named test, and resume after the
//! provider callback.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::manager::AuthorizationManager;
use crate::operation::Catalog;
use crate::provider::{OAuthProvider, Transport};
use crate::resume::ResumptionController;
use crate::runner::{RunOutcome, TestRunner};
use crate::store::TokenStore;

pub struct TestConsole {
    catalog: Arc<Catalog>,
    runner: TestRunner,
    resumption: ResumptionController,
}

impl TestConsole {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn TokenStore>,
        provider: Arc<dyn OAuthProvider>,
        transport: Arc<dyn Transport>,
        api_base: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        let auth = Arc::new(AuthorizationManager::new(provider, store.clone(), scope));
        let runner = TestRunner::new(auth.clone(), transport, store, api_base);
        let resumption = ResumptionController::new(auth, catalog.clone());
        Self {
            catalog,
            runner,
            resumption,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run the named test; may complete or suspend into a redirect.
    pub async fn run(&self, operation_id: &str) -> Result<RunOutcome> {
        let operation = self
            .catalog
            .get(operation_id)
            .ok_or_else(|| Error::UnknownOperation(operation_id.to_owned()))?;
        self.runner.run(operation).await
    }

    /// Resume the suspended test with the code from the provider callback.
    pub async fn resume_from_callback(&self, code: &str) -> Result<RunOutcome> {
        let operation = self.resumption.on_callback(code)?;
        self.runner.run(&operation).await
    }
}
