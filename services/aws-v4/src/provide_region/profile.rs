use super::ProvideRegion;
use crate::constants::{AWS_CONFIG_FILE, AWS_PROFILE, DEFAULT_CONFIG_FILE};
use crate::profile::{config_section, load_section};
use async_trait::async_trait;
use eslog_core::{Context, Result};

/// ProfileRegionProvider loads `region` from the active profile of
/// `~/.aws/config` (or `AWS_CONFIG_FILE`).
#[derive(Debug)]
pub struct ProfileRegionProvider {
    profile: String,
    config_file: Option<String>,
}

impl Default for ProfileRegionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileRegionProvider {
    /// Create a new ProfileRegionProvider using the `default` profile.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
        }
    }

    /// Set the profile name to use. `AWS_PROFILE` still takes precedence.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }
}

#[async_trait]
impl ProvideRegion for ProfileRegionProvider {
    async fn provide_region(&self, ctx: &Context) -> Result<Option<String>> {
        let profile = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());
        let path = self
            .config_file
            .clone()
            .or_else(|| ctx.env_var(AWS_CONFIG_FILE))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        Ok(load_section(ctx, &path, &config_section(&profile))
            .await?
            .and_then(|mut props| props.remove("region")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eslog_core::StaticEnv;
    use eslog_file_read_tokio::TokioFileRead;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_profile_region() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join(".aws"))?;
        let mut f = std::fs::File::create(dir.path().join(".aws").join("config"))?;
        writeln!(f, "[default]")?;
        writeln!(f, "region = us-west-2")?;
        writeln!(f, "[profile logs]")?;
        writeln!(f, "region = eu-north-1")?;

        let home: PathBuf = dir.path().to_path_buf();
        let ctx = Context::new().with_file_read(TokioFileRead).with_env(StaticEnv {
            home_dir: Some(home.clone()),
            envs: HashMap::new(),
        });
        assert_eq!(
            ProfileRegionProvider::new()
                .provide_region(&ctx)
                .await?
                .as_deref(),
            Some("us-west-2")
        );

        let ctx = ctx.with_env(StaticEnv {
            home_dir: Some(home),
            envs: HashMap::from([(AWS_PROFILE.to_string(), "logs".to_string())]),
        });
        assert_eq!(
            ProfileRegionProvider::new()
                .provide_region(&ctx)
                .await?
                .as_deref(),
            Some("eu-north-1")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_profile_region_missing() -> anyhow::Result<()> {
        let ctx = Context::new()
            .with_file_read(TokioFileRead)
            .with_env(StaticEnv::default());
        let region = ProfileRegionProvider::new()
            .with_config_file("/not/exist/config")
            .provide_region(&ctx)
            .await?;
        assert!(region.is_none());

        Ok(())
    }
}
