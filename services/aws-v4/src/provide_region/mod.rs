//! Region resolution.
//!
//! Mirrors the credential side: every source implements [`ProvideRegion`]
//! and returns `Ok(None)` when it has nothing to offer, and a
//! [`ProvideRegionChain`] tries them in order.

use async_trait::async_trait;
use eslog_core::{Context, Result};
use std::fmt::Debug;

/// ProvideRegion loads the AWS region requests should be signed for.
#[async_trait]
pub trait ProvideRegion: Debug + Send + Sync + 'static {
    /// Load the region from the current environment.
    async fn provide_region(&self, ctx: &Context) -> Result<Option<String>>;
}

mod chain;
pub use chain::ProvideRegionChain;

mod r#static;
pub use r#static::StaticRegionProvider;

mod env;
pub use env::EnvRegionProvider;

mod profile;
pub use profile::ProfileRegionProvider;

mod imds;
pub use imds::IMDSv2RegionProvider;

mod default;
pub use default::DefaultRegionProvider;
