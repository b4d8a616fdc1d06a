// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authgate: client-side session lifecycle management.
//!
//! Holds a session token in memory and persistent storage, auto-creates
//! anonymous sessions, listens for unauthorized completions across the
//! host application's request cache, and debounces refresh-vs-
//! reauthenticate attempts. The remote auth service is an opaque
//! collaborator behind the [`api::AuthApi`] trait; transport lives in
//! the host's connector layer.
//!
//! Typical wiring:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use authgate::api::AuthApi;
//! # fn connector() -> Arc<dyn AuthApi> { unimplemented!() }
//! # async fn wire() {
//! use authgate::controller::{ControllerConfig, SessionController};
//! use authgate::events::OperationFeed;
//! use authgate::storage::FileStorage;
//! use authgate::store::SessionStore;
//!
//! let store = Arc::new(SessionStore::new(Arc::new(FileStorage::in_state_dir())));
//! let feed = OperationFeed::new();
//! let controller =
//!     SessionController::spawn(Arc::clone(&store), connector(), feed.clone(), ControllerConfig::default());
//!
//! // The host's data-fetching layer reports every terminal outcome into
//! // `feed`; the controller answers 401s with a debounced refresh.
//! controller.wait_ready().await;
//! # }
//! ```

pub mod api;
pub mod claims;
pub mod controller;
pub mod events;
pub mod gate;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiError, AuthApi, TokenResponse};
pub use controller::{ControllerConfig, GateStatus, SessionController};
pub use events::{OperationFeed, OperationKind, OperationOutcome};
pub use gate::{AuthForm, FormSelector, PrivateGate};
pub use refresh::{RefreshPolicy, LOGIN_BUFFERING_INTERVAL};
pub use session::{Claims, Session};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{SessionStore, StoreState};
