use super::ProvideRegion;
use async_trait::async_trait;
use eslog_core::{Context, Result};
use log::{debug, warn};

/// A chain of region providers that will be tried in order.
///
/// The first provider returning a non-empty region wins. Providers that fail
/// are logged and skipped.
#[derive(Debug, Default)]
pub struct ProvideRegionChain {
    providers: Vec<Box<dyn ProvideRegion>>,
}

impl ProvideRegionChain {
    /// Create a new empty region provider chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region provider to the chain.
    pub fn push(mut self, provider: impl ProvideRegion) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

#[async_trait]
impl ProvideRegion for ProvideRegionChain {
    async fn provide_region(&self, ctx: &Context) -> Result<Option<String>> {
        for provider in &self.providers {
            match provider.provide_region(ctx).await {
                Ok(Some(region)) if !region.trim().is_empty() => {
                    debug!("loaded region {region} from provider: {provider:?}");
                    return Ok(Some(region.trim().to_string()));
                }
                Ok(_) => debug!("no region found in provider: {provider:?}"),
                Err(err) => warn!("failed to load region from provider {provider:?}: {err}"),
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eslog_core::Error;

    #[derive(Debug)]
    struct Fixed(&'static str);

    #[async_trait]
    impl ProvideRegion for Fixed {
        async fn provide_region(&self, _: &Context) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl ProvideRegion for Broken {
        async fn provide_region(&self, _: &Context) -> Result<Option<String>> {
            Err(Error::unexpected("metadata unreachable"))
        }
    }

    #[tokio::test]
    async fn test_first_non_empty_region_wins() -> anyhow::Result<()> {
        let ctx = Context::new();
        let chain = ProvideRegionChain::new()
            .push(Broken)
            .push(Fixed("  "))
            .push(Fixed("ap-southeast-2\n"))
            .push(Fixed("us-east-1"));

        assert_eq!(
            chain.provide_region(&ctx).await?.as_deref(),
            Some("ap-southeast-2")
        );
        assert!(ProvideRegionChain::new()
            .provide_region(&ctx)
            .await?
            .is_none());
        Ok(())
    }
}
