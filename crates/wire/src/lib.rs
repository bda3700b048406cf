#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! Wire-level vocabulary shared by the sitewarden client.
//!
//! The crate knows nothing about sockets. It describes where a logical call is
//! routed ([`Namespace`], [`NamespaceLayout`], [`Operation`]), what came back
//! ([`RawResponse`], [`SendFailure`]) and what that means ([`classify`] and
//! [`Classification`]). Higher layers combine these pieces with an HTTP
//! backend and the rate governor.
//!
//! # Examples
//!
//! A response from a site whose agent does not know the current route is
//! reported as an unsupported route, which the negotiator answers by retrying
//! on the legacy namespace.
//!
//! ```
//! use serde_json::json;
//! use wire::{Classification, RawResponse, classify};
//!
//! let response = RawResponse::json(404, &json!({"code": "rest_no_route"}));
//! assert!(classify(Ok(response)).is_route_unsupported());
//!
//! let response = RawResponse::json(200, &json!({"success": true, "data": [1, 2]}));
//! assert_eq!(classify(Ok(response)), Classification::Success(json!([1, 2])));
//! ```

mod classify;
mod namespace;
mod operation;
mod response;

pub use classify::{
    AuthFailure, Classification, RemoteFault, TransportErrorKind, classify,
};
pub use namespace::{
    CLIENT_ID_HEADER, CURRENT_PREFIX, LEGACY_KEY_HEADER, LEGACY_PREFIX, Namespace,
    NamespaceLayout, PRIMARY_KEY_HEADER, REST_PREFIX,
};
pub use operation::{Method, Operation, OperationRequest, TimeoutClass};
pub use response::{FailureKind, RawResponse, SendFailure};
