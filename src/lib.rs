//! Dual-mode HTTP endpoint library.
//!
//! A service declares each endpoint once, as an [`EndpointDescriptor`]
//! (verb, paths, required params, timeout, suppressed errors) bound to a
//! handler. Inside the service process the endpoint is served through a
//! hardened wrapper; in other processes the same descriptor turns calls into
//! outbound requests.
//!
//! ```text
//!                         ┌───────────────────────────────┐
//!   inbound request ────▶ │ Endpoint (server role)        │
//!                         │  params → shielded handler    │──▶ response
//!                         │  → classify → OutcomeRecord   │
//!                         └───────────────────────────────┘
//!                         ┌───────────────────────────────┐
//!   call arguments  ────▶ │ Endpoint (client role)        │──▶ other service
//!                         │  entity/app_name → transport  │
//!                         └───────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use endpoint::{
    descriptor, Endpoint, EndpointDescriptor, EndpointError, HandlerError, HttpService,
    Invocation, Reply, ServiceException, ServiceRuntime,
};
pub use http::{HttpServer, ServiceRouter};
pub use lifecycle::Shutdown;
