use anyhow::{Result, bail};
use log::{debug, info};

use crate::common::config::{ExecutionRule, ResolvedConfig};

/// Pick the role of the first rule whose prefix starts `key` and whose role is set.
///
/// A rule without a `prefix` (or with `prefix: ""`) never matches; there is no
/// catch-all rule, so list an explicit prefix for every subtree.
pub fn match_role<'a>(rules: &'a [ExecutionRule], key: &str) -> Option<&'a str> {
    rules.iter().find_map(|rule| {
        let prefix = rule.prefix.as_deref().filter(|p| !p.is_empty())?;
        let role = rule.aws_execution_role.as_deref().filter(|r| !r.is_empty())?;
        key.starts_with(prefix).then_some(role)
    })
}

/// Resolve the execution role for a located config.
pub fn resolve_role(resolved: &ResolvedConfig) -> Result<&str> {
    if resolved.key.is_empty() {
        bail!(
            "Working directory {} must be a subdirectory of the directory holding {}",
            resolved.workdir.display(),
            resolved.path.display()
        );
    }

    match match_role(&resolved.config.execution, &resolved.key) {
        Some(role) => {
            info!("Using execution role '{}' for key '{}'", role, resolved.key);
            Ok(role)
        }
        None => bail!(
            "No execution rule in {} matches key '{}'",
            resolved.path.display(),
            resolved.key
        ),
    }
}

/// Render the generated backend file for a located config.
///
/// Values are embedded between double quotes as-is; a value containing `"`
/// produces an invalid file.
pub fn render(resolved: &ResolvedConfig) -> Result<String> {
    let role = resolve_role(resolved)?;
    let s3 = &resolved.config.s3_backend;
    let key = &resolved.key;

    debug!("Rendering backend for bucket '{}' key '{}'", s3.bucket, key);

    Ok(format!(
        r#"# Generated by tfwrap. DO NOT EDIT. DO NOT COMMIT.
# This file is recreated before every run and removed afterwards.

terraform {{
  backend "s3" {{
    role_arn       = "{role_arn}"
    region         = "{region}"
    bucket         = "{bucket}"
    dynamodb_table = "{dynamodb_table}"
    key            = "{key}"
  }}
}}

locals {{
  generated = {{
    state_key          = "{key}"
    aws_execution_role = "{role}"
    remote_state = {{
      backend = "s3"
      config = {{
        role_arn       = "{role_arn}"
        region         = "{region}"
        bucket         = "{bucket}"
        dynamodb_table = "{dynamodb_table}"
        key            = "{key}"
      }}
    }}
  }}
}}
"#,
        role_arn = s3.role_arn,
        region = s3.region,
        bucket = s3.bucket,
        dynamodb_table = s3.dynamodb_table,
        key = key,
        role = role,
    ))
}
