//! Client role: turning endpoint calls into outbound HTTP requests.
//!
//! # Data Flow
//! ```text
//! CallArgs (keyword arguments of the call)
//!     → request.rs (pull out `entity` / `app_name`, keep the rest as params)
//!     → HttpServiceClient::send_http_request (transport collaborator)
//!     → ClientResponse returned to the caller unchanged
//! ```
//!
//! # Design Decisions
//! - No retries or deadlines at this layer; the transport owns them
//! - The current tracking ID is forwarded so logs join across services

pub mod request;
pub mod transport;

pub use request::{make_request, CallArgs};
pub use transport::{ClientError, ClientResponse, HttpServiceClient, ReqwestTransport};
