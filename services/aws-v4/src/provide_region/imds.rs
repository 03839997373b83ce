use super::ProvideRegion;
use crate::imds::ImdsClient;
use async_trait::async_trait;
use eslog_core::{Context, Result};

/// IMDSv2RegionProvider asks the instance metadata service for the region
/// the current EC2 instance runs in.
#[derive(Debug, Clone, Default)]
pub struct IMDSv2RegionProvider {
    client: ImdsClient,
}

impl IMDSv2RegionProvider {
    /// Create a new IMDSv2RegionProvider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an IMDS client, and its session token, with other providers.
    pub fn with_client(mut self, client: ImdsClient) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ProvideRegion for IMDSv2RegionProvider {
    async fn provide_region(&self, ctx: &Context) -> Result<Option<String>> {
        if ImdsClient::is_disabled(ctx) {
            return Ok(None);
        }

        let region = self
            .client
            .get(ctx, "/latest/meta-data/placement/region")
            .await?;
        Ok(Some(region.trim().to_string()).filter(|v| !v.is_empty()))
    }
}
