use crate::AppenderConfig;
use eslog_aws_v4::AwsAuthentication;
use eslog_core::{Authentication, Context, Error, Result};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Name of the builtin AWS SigV4 adapter.
pub const AWS_AUTHENTICATION: &str = "aws";

type Constructor =
    Box<dyn Fn(&Context, &AppenderConfig) -> Result<Arc<dyn Authentication>> + Send + Sync>;

/// AuthenticationRegistry maps the `authenticationClass` of a config to a
/// constructor for the adapter.
///
/// The default registry knows [`AWS_AUTHENTICATION`]. More adapters can be
/// registered before the factory runs:
///
/// ```
/// use eslog_elasticsearch::AuthenticationRegistry;
/// use eslog_aws_v4::AwsAuthentication;
/// use eslog_core::Authentication;
/// use std::sync::Arc;
///
/// let registry = AuthenticationRegistry::default().register("aws-eu", |ctx, _| {
///     let auth: Arc<dyn Authentication> =
///         Arc::new(AwsAuthentication::new(ctx.clone()).with_region("eu-west-1"));
///     Ok(auth)
/// });
/// assert!(registry.contains("aws-eu"));
/// ```
pub struct AuthenticationRegistry {
    constructors: HashMap<String, Constructor>,
}

impl Debug for AuthenticationRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = self.constructors.keys().collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("AuthenticationRegistry")
            .field("names", &names)
            .finish()
    }
}

impl Default for AuthenticationRegistry {
    fn default() -> Self {
        Self::empty().register(AWS_AUTHENTICATION, |ctx, cfg| {
            let auth: Arc<dyn Authentication> = Arc::new(
                AwsAuthentication::new(ctx.clone()).with_host_header(cfg.include_host_header),
            );
            Ok(auth)
        })
    }
}

impl AuthenticationRegistry {
    /// Create a registry without any adapter.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor under `name`, replacing any previous one.
    pub fn register<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Context, &AppenderConfig) -> Result<Arc<dyn Authentication>>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }

    /// Whether an adapter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Construct the adapter registered under `name`.
    ///
    /// An unknown name or a failing constructor is a config error.
    pub fn build(
        &self,
        name: &str,
        ctx: &Context,
        cfg: &AppenderConfig,
    ) -> Result<Arc<dyn Authentication>> {
        let constructor = self.constructors.get(name).ok_or_else(|| {
            Error::config_invalid("unknown authentication class")
                .with_context(format!("authenticationClass: {name}"))
        })?;

        constructor(ctx, cfg).map_err(|e| {
            Error::config_invalid("failed to construct authentication")
                .with_context(format!("authenticationClass: {name}"))
                .with_source(e)
        })
    }
}
