use super::ProvideRegion;
use crate::constants::{AWS_DEFAULT_REGION, AWS_REGION};
use async_trait::async_trait;
use eslog_core::{Context, Result};

/// EnvRegionProvider loads the region from `AWS_REGION`, falling back to
/// `AWS_DEFAULT_REGION`.
#[derive(Debug, Default, Clone)]
pub struct EnvRegionProvider;

impl EnvRegionProvider {
    /// Create a new EnvRegionProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideRegion for EnvRegionProvider {
    async fn provide_region(&self, ctx: &Context) -> Result<Option<String>> {
        Ok([AWS_REGION, AWS_DEFAULT_REGION]
            .into_iter()
            .filter_map(|key| ctx.env_var(key))
            .find(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eslog_core::StaticEnv;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test_case(&[(AWS_REGION, "eu-west-1"), (AWS_DEFAULT_REGION, "us-east-1")], Some("eu-west-1") ; "region first")]
    #[test_case(&[(AWS_DEFAULT_REGION, "us-east-1")], Some("us-east-1") ; "default region fallback")]
    #[test_case(&[(AWS_REGION, ""), (AWS_DEFAULT_REGION, "us-east-1")], Some("us-east-1") ; "empty region ignored")]
    #[test_case(&[], None ; "nothing set")]
    #[tokio::test]
    async fn test_env_region(envs: &[(&str, &str)], expected: Option<&str>) {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        });

        let region = EnvRegionProvider::new()
            .provide_region(&ctx)
            .await
            .expect("env provider must not fail");
        assert_eq!(region.as_deref(), expected);
    }
}
