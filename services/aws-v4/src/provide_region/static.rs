use super::ProvideRegion;
use async_trait::async_trait;
use eslog_core::{Context, Result};

/// StaticRegionProvider always returns the configured region.
#[derive(Debug, Clone)]
pub struct StaticRegionProvider {
    region: String,
}

impl StaticRegionProvider {
    /// Create a new StaticRegionProvider.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl ProvideRegion for StaticRegionProvider {
    async fn provide_region(&self, _: &Context) -> Result<Option<String>> {
        Ok(Some(self.region.clone()))
    }
}
