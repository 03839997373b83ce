use eslog_core::{Context, Error, Result};
use ini::Ini;
use log::debug;
use std::collections::HashMap;

/// Section name of `profile` inside `~/.aws/config`.
///
/// The config file prefixes every profile but `default` with `profile `,
/// while the credentials file uses the bare name.
pub(crate) fn config_section(profile: &str) -> String {
    match profile {
        "default" => "default".to_string(),
        x => format!("profile {x}"),
    }
}

/// Load one section of an AWS shared ini file.
///
/// Returns `Ok(None)` when the file cannot be located or read, or when the
/// section does not exist. A file that exists but cannot be parsed is an
/// error.
pub(crate) async fn load_section(
    ctx: &Context,
    path: &str,
    section: &str,
) -> Result<Option<HashMap<String, String>>> {
    let Some(expanded_path) = ctx.expand_home_dir(path) else {
        debug!("failed to expand homedir for path: {path}");
        return Ok(None);
    };

    let content = match ctx.file_read_as_string(&expanded_path).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read {expanded_path}: {err}");
            return Ok(None);
        }
    };

    let conf = Ini::load_from_str(&content).map_err(|e| {
        Error::config_invalid("failed to parse aws shared file")
            .with_source(anyhow::Error::new(e))
            .with_context(format!("path: {expanded_path}"))
    })?;

    let Some(props) = conf.section(Some(section)) else {
        debug!("section {section} not found in {expanded_path}");
        return Ok(None);
    };

    Ok(Some(
        props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ))
}
