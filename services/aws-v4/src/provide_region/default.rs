use super::{
    EnvRegionProvider, IMDSv2RegionProvider, ProfileRegionProvider, ProvideRegion,
    ProvideRegionChain,
};
use crate::imds::ImdsClient;
use async_trait::async_trait;
use eslog_core::{Context, Result};

/// DefaultRegionProvider resolves the region via the default chain.
///
/// Resolution order:
///
/// 1. `AWS_REGION`, then `AWS_DEFAULT_REGION`
/// 2. `region` of the active profile in `~/.aws/config`
/// 3. EC2 IMDSv2 `placement/region`
#[derive(Debug)]
pub struct DefaultRegionProvider {
    chain: ProvideRegionChain,
}

impl Default for DefaultRegionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultRegionProvider {
    /// Create a new `DefaultRegionProvider` instance.
    pub fn new() -> Self {
        Self::with_imds_client(ImdsClient::default())
    }

    /// Create the default chain, using `client` for instance metadata.
    pub fn with_imds_client(client: ImdsClient) -> Self {
        let chain = ProvideRegionChain::new()
            .push(EnvRegionProvider::new())
            .push(ProfileRegionProvider::new())
            .push(IMDSv2RegionProvider::new().with_client(client));

        Self { chain }
    }
}

#[async_trait]
impl ProvideRegion for DefaultRegionProvider {
    async fn provide_region(&self, ctx: &Context) -> Result<Option<String>> {
        self.chain.provide_region(ctx).await
    }
}
