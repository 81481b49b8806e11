use anyhow::{Context, Result, anyhow};
use log::{debug, error, info};
use serde::Deserialize;
use serde_yaml_ng::{Mapping, Value};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File names tried in every directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["wrapper-config.yml", "wrapper-config.yaml"];

const S3_BACKEND_FIELDS: [&str; 4] = ["role_arn", "region", "bucket", "dynamodb_table"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub s3_backend: S3Backend,
    pub execution: Vec<ExecutionRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Backend {
    pub role_arn: String,
    pub region: String,
    pub bucket: String,
    pub dynamodb_table: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRule {
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub aws_execution_role: Option<String>,
}

/// A config file together with the directory it applies to.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub path: PathBuf,
    pub workdir: PathBuf,
    /// Working directory relative to the config file's directory, `/`-separated.
    pub key: String,
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Candidate config paths from `start` up to the filesystem root.
#[derive(Debug)]
pub struct Candidates {
    dir: Option<PathBuf>,
    name_idx: usize,
}

impl Candidates {
    pub fn new(start: &Path) -> Self {
        Self {
            dir: Some(start.to_path_buf()),
            name_idx: 0,
        }
    }
}

impl Iterator for Candidates {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let candidate = dir.join(CONFIG_FILE_NAMES[self.name_idx]);

        self.name_idx += 1;
        if self.name_idx == CONFIG_FILE_NAMES.len() {
            self.name_idx = 0;
            self.dir = dir.parent().map(Path::to_path_buf);
        }

        Some(candidate)
    }
}

impl Config {
    /// Find and load the nearest config file above `workdir`.
    ///
    /// Returns `Ok(None)` when no candidate exists up to the root. A file that
    /// exists but cannot be read, parsed or validated stops the search with an
    /// error.
    pub fn locate(workdir: &Path) -> Result<Option<ResolvedConfig>> {
        debug!("Searching for config upwards from {}", workdir.display());

        for candidate in Candidates::new(workdir) {
            debug!("  Trying {}", candidate.display());

            let content = match std::fs::read_to_string(&candidate) {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    error!("Failed to read config file '{}': {}", candidate.display(), e);
                    return Err(e).with_context(|| format!("Failed to read {}", candidate.display()));
                }
            };

            info!("Loading configuration from: {}", candidate.display());
            let config = Self::parse(&content)
                .with_context(|| format!("Invalid configuration in {}", candidate.display()))?;

            let key = relative_key(&candidate, workdir);
            debug!("Configuration parsed successfully");
            debug!("  State key: '{}'", key);
            debug!("  Execution rules: {}", config.execution.len());

            return Ok(Some(ResolvedConfig {
                path: candidate,
                workdir: workdir.to_path_buf(),
                key,
                config,
            }));
        }

        info!("No configuration found above {}", workdir.display());
        Ok(None)
    }

    /// Parse and validate a YAML document.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: Value = serde_yaml_ng::from_str(content).context("Failed to parse YAML")?;

        Self::from_value(doc).map_err(|errors| {
            let lines: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
            anyhow!(
                "{} validation error(s):\n{}",
                errors.len(),
                lines.join("\n")
            )
        })
    }

    /// Validate a parsed document, collecting every problem found.
    pub fn from_value(doc: Value) -> std::result::Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let root = match doc {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => return Err(vec![ValidationError::new("document must be a mapping")]),
        };

        let s3_backend = validate_s3_backend(root.get("s3_backend"), &mut errors);
        let execution = validate_execution(root.get("execution"), &mut errors);

        match (s3_backend, execution) {
            (Some(s3_backend), Some(execution)) if errors.is_empty() => Ok(Config {
                s3_backend,
                execution,
            }),
            _ => Err(errors),
        }
    }
}

fn validate_s3_backend(
    value: Option<&Value>,
    errors: &mut Vec<ValidationError>,
) -> Option<S3Backend> {
    let map = match value {
        Some(Value::Mapping(map)) => map,
        Some(Value::Null) | None => {
            errors.push(ValidationError::new("s3_backend is required"));
            for field in S3_BACKEND_FIELDS {
                errors.push(ValidationError::new(format!("s3_backend.{} is required", field)));
            }
            return None;
        }
        Some(_) => {
            errors.push(ValidationError::new("s3_backend must be a mapping"));
            return None;
        }
    };

    let mut field = |name: &str| match map.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => {
            errors.push(ValidationError::new(format!(
                "s3_backend.{} must be a non-empty string",
                name
            )));
            None
        }
    };

    // Check all four before bailing so every missing field is reported
    let role_arn = field("role_arn");
    let region = field("region");
    let bucket = field("bucket");
    let dynamodb_table = field("dynamodb_table");

    Some(S3Backend {
        role_arn: role_arn?,
        region: region?,
        bucket: bucket?,
        dynamodb_table: dynamodb_table?,
    })
}

fn validate_execution(
    value: Option<&Value>,
    errors: &mut Vec<ValidationError>,
) -> Option<Vec<ExecutionRule>> {
    let items = match value {
        Some(Value::Sequence(items)) => items,
        Some(Value::Null) | None => {
            errors.push(ValidationError::new("execution is required"));
            return None;
        }
        Some(_) => {
            errors.push(ValidationError::new("execution must be a list of rules"));
            return None;
        }
    };

    let mut rules = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match serde_yaml_ng::from_value::<ExecutionRule>(item.clone()) {
            Ok(rule) => rules.push(rule),
            Err(e) => errors.push(ValidationError::new(format!("execution[{}]: {}", idx, e))),
        }
    }
    Some(rules)
}

/// Path of `workdir` below the directory holding `config_path`.
///
/// Empty when they are the same directory or `workdir` is not below it.
fn relative_key(config_path: &Path, workdir: &Path) -> String {
    let base = config_path.parent().unwrap_or(Path::new(""));
    workdir
        .strip_prefix(base)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
