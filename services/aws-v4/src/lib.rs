//! AWS SigV4 signing for requests sent to AWS managed Elasticsearch domains.
//!
//! [`AwsAuthentication`] implements [`eslog_core::Authentication`]: the
//! appender hands it every outgoing request and it installs `x-amz-date`,
//! `authorization` and, for temporary credentials, `x-amz-security-token`.
//!
//! Region and credentials are resolved through provider chains in the usual
//! AWS order: environment, shared profile files, container metadata and
//! instance metadata.

mod constants;
pub use constants::ES_SERVICE_NAME;

mod credential;
pub use credential::Credential;

mod imds;
pub use imds::ImdsClient;

mod profile;

mod provide_credential;
pub use provide_credential::*;

pub mod provide_region;
pub use provide_region::ProvideRegion;

mod sign_request;
pub use sign_request::HeaderSet;
pub use sign_request::RequestSigner;

mod authentication;
pub use authentication::AwsAuthentication;
