//! Session credentials, token refresh and account operations
//!
//! # Module Layout
//!
//! - [`credential_store`] -- the session credential and its reactive mirror
//! - [`refresh`]          -- single-flight access token refresh
//! - [`service`]          -- sign-up, sign-in, verification, sign-out
//! - [`storage`]          -- durable key-value backends (file, keyring, memory)

pub mod credential_store;
pub mod refresh;
pub mod service;
pub mod storage;
