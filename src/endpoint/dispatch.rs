//! Mode dispatch: the same endpoint either serves an inbound request or
//! becomes an outbound one, depending on which role the caller holds.
//!
//! The receiver and its input travel together in [`Invocation`], so a
//! service can only be paired with a request and a client only with call
//! arguments.

use axum::response::Response;
use std::sync::Arc;

use crate::client::{make_request, CallArgs, ClientResponse, HttpServiceClient};
use crate::endpoint::error::EndpointError;
use crate::endpoint::handler::HttpService;
use crate::endpoint::runtime::ServiceRuntime;
use crate::endpoint::wrapper::Endpoint;
use crate::http::request::InboundRequest;

/// One call of an endpoint, tagged with the caller's role.
pub enum Invocation<S> {
    /// Server role: run the wrapped handler.
    Serve {
        runtime: Arc<ServiceRuntime>,
        service: Arc<S>,
        request: InboundRequest,
    },
    /// Client role: forward the call to another service.
    Request {
        client: Arc<dyn HttpServiceClient>,
        args: CallArgs,
    },
}

/// What an invocation produced, by role.
#[derive(Debug)]
pub enum Reply {
    Served(Response),
    Fetched(ClientResponse),
}

impl Reply {
    pub fn served(self) -> Option<Response> {
        match self {
            Reply::Served(response) => Some(response),
            Reply::Fetched(_) => None,
        }
    }

    pub fn fetched(self) -> Option<ClientResponse> {
        match self {
            Reply::Fetched(response) => Some(response),
            Reply::Served(_) => None,
        }
    }
}

impl<S: HttpService> Endpoint<S> {
    pub async fn dispatch(&self, invocation: Invocation<S>) -> Result<Reply, EndpointError> {
        match invocation {
            Invocation::Serve {
                runtime,
                service,
                request,
            } => self
                .serve(&runtime, service, request)
                .await
                .map(Reply::Served),
            Invocation::Request { client, args } => {
                make_request(client.as_ref(), self.descriptor().method(), args)
                    .await
                    .map(Reply::Fetched)
                    .map_err(EndpointError::from)
            }
        }
    }
}
