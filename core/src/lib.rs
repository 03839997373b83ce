//! Core components shared by the eslog crates.
//!
//! ## Overview
//!
//! - **Context**: a container holding implementations for file reading, HTTP
//!   sending and environment access, so that providers and the appender can be
//!   tested without touching the real machine.
//! - **Traits**: [`ProvideCredential`] loads credentials, [`SignRequest`] signs
//!   a request in place, and [`Authentication`] is the hook the appender calls
//!   right before every outgoing request.
//! - **Errors**: a single [`Error`] type with an [`ErrorKind`].
//!
//! ## Example
//!
//! ```no_run
//! use eslog_core::{Authentication, Context, Result};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct ApiKey(String);
//!
//! #[async_trait]
//! impl Authentication for ApiKey {
//!     async fn add_auth(&self, req: &mut http::request::Parts, _body: &str) -> Result<()> {
//!         let value = format!("ApiKey {}", self.0).parse()?;
//!         req.headers.insert(http::header::AUTHORIZATION, value);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
mod fs;
pub use fs::FileRead;
pub use fs::NoopFileRead;
mod http_send;
pub use http_send::HttpSend;
pub use http_send::NoopHttpSend;
mod env;
pub use env::Env;
pub use env::NoopEnv;
pub use env::OsEnv;
pub use env::StaticEnv;

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{Authentication, ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::SigningContext;
