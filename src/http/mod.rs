//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request-ID + trace layers)
//!     → request.rs (tracking ID scoped, body buffered into InboundRequest)
//!     → endpoint wrapper (validation, shielded handler, classification)
//!     → EndpointError translated to a response when the call failed
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{tracking_id, InboundRequest, Params, X_REQUEST_ID};
pub use server::{HttpServer, RouteEntry, ServiceRouter};
