//! Endpoint invocation subsystem.
//!
//! # Data Flow
//! ```text
//! call arrives at an Endpoint
//!     → dispatch.rs (server role or client role?)
//!
//! server role:
//!     → wrapper.rs counts the request
//!     → params.rs validates required params (400 short-circuit)
//!     → resilience::timeouts runs the handler shielded, against the deadline
//!     → classify.rs labels the outcome, bumps one counter, logs
//!     → OutcomeGuard submits exactly one OutcomeRecord on the way out
//!
//! client role:
//!     → client::request builds the outbound call
//!     → HttpServiceClient sends it
//! ```

pub mod classify;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod params;
pub mod runtime;
pub mod wrapper;

pub use classify::{Classification, OutcomeKind};
pub use descriptor::{EndpointDescriptor, HttpMethod, SuppressedError};
pub use dispatch::{Invocation, Reply};
pub use error::{EndpointError, HandlerError, ServiceException};
pub use handler::{Handler, HandlerResult, HttpService};
pub use runtime::ServiceRuntime;
pub use wrapper::Endpoint;
