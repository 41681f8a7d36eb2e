//! HTTP plumbing shared by every API call
//!
//! - [`dispatcher`] -- bearer attachment and refresh-and-retry-once
//! - [`request`]    -- request/response types and error classification

pub mod dispatcher;
pub mod request;
