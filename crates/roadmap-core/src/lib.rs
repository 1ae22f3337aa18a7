//! Core state machine of the API test console.
//!
//! Everything here is network-free: the OAuth provider, the HTTP
//! transport, and the session store are injected behind traits
//! ([`OAuthProvider`], [`Transport`], [`TokenStore`]), so the
//! reuse/mint/redirect decisions and the suspend/resume flow can be
//! exercised entirely in memory.
//!
//! Flow for a user-scoped test: [`TestRunner::run`] asks
//! [`AuthorizationManager`] for a token; with nothing cached it answers
//! [`RunOutcome::Redirect`] and the operation id is parked in the session
//! store. The provider callback goes through
//! [`ResumptionController::on_callback`], which stores the code and hands
//! back the parked operation for a re-run that now completes the token
//! exchange and the original request.

mod console;
mod error;
mod manager;
mod operation;
mod provider;
mod resume;
mod runner;
mod store;

#[cfg(test)]
mod testutil;

pub use console::TestConsole;
pub use error::{Error, Result};
pub use manager::{AuthorizationManager, TokenOutcome};
pub use operation::{Catalog, HttpMethod, PayloadContext, PayloadFn, TestOperation, TokenScope};
pub use provider::{
    BoxFuture, OAuthProvider, Transport, TransportError, TransportRequest, TransportResponse,
};
pub use resume::ResumptionController;
pub use runner::{RunOutcome, TestResult, TestRunner};
pub use store::{MemoryTokenStore, TokenStore, TokenStoreExt, keys};
