//! Client-side authentication session for the Xploit-Eye REST backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionManager` owns the bearer token and cached profile and is the only
//! writer of durable session state. The route guard, form flows, dashboard
//! view model and the CLI are consumers that receive the manager by explicit
//! dependency passing; there is no process-global instance.
//!
//! ERROR HANDLING
//! ==============
//! Every backend failure is converted to a value at the manager boundary:
//! `AuthOutcome`/`NetworkError` for mutating calls, `Option` for reads.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod guard;
pub mod session;
pub mod storage;
pub mod types;
pub mod validation;

pub use api::{AuthApi, Endpoint, HttpApi, RawReply};
pub use config::ClientConfig;
pub use error::{NetworkError, StorageError, TransportError};
pub use session::{AuthOutcome, SessionManager};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{SignInRequest, SignUpRequest, UserProfile};
