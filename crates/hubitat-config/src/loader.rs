//! Tag expansion for configuration files
//!
//! Two tags are understood:
//!
//! - `!include file` replaces the node with the contents of another file,
//!   resolved against the directory of the file that names it. An include
//!   used as a list item whose file holds a list is spliced into the
//!   surrounding list, so automations can be split across files.
//! - `!env_var NAME` replaces the node with an environment variable.
//!
//! Other tags are left in place for the schema to reject.

use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};

const INCLUDE: &str = "include";
const ENV_VAR: &str = "env_var";

/// Reads configuration files and expands their tags
#[derive(Debug, Default)]
pub struct ConfigReader {
    /// Files being expanded, outermost first
    chain: Vec<PathBuf>,
}

impl ConfigReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file and expand every tag in it
    pub fn read(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = path.as_ref();

        if self.chain.iter().any(|p| p == path) {
            let chain = self
                .chain
                .iter()
                .chain(std::iter::once(&path.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ConfigError::IncludeCycle { chain });
        }

        debug!(path = %path.display(), "Reading configuration file");
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        self.chain.push(path.to_path_buf());
        let expanded = self.expand(raw, path);
        self.chain.pop();
        expanded
    }

    fn expand(&mut self, value: Value, file: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.expand_tag(*tagged, file),
            Value::Mapping(map) => map
                .into_iter()
                .map(|(key, value)| -> ConfigResult<(Value, Value)> {
                    Ok((key, self.expand(value, file)?))
                })
                .collect::<ConfigResult<_>>()
                .map(Value::Mapping),
            Value::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let spliced = is_include(&item);
                    match self.expand(item, file)? {
                        Value::Sequence(nested) if spliced => out.extend(nested),
                        other => out.push(other),
                    }
                }
                Ok(Value::Sequence(out))
            }
            scalar => Ok(scalar),
        }
    }

    fn expand_tag(&mut self, tagged: TaggedValue, file: &Path) -> ConfigResult<Value> {
        trace!(tag = %tagged.tag, "Expanding tag");

        if tagged.tag == INCLUDE {
            let target = string_argument(&tagged.value, INCLUDE, file)?;
            let dir = file.parent().unwrap_or_else(|| Path::new("."));
            return self.read(dir.join(target));
        }

        if tagged.tag == ENV_VAR {
            let name = string_argument(&tagged.value, ENV_VAR, file)?;
            return std::env::var(name)
                .map(Value::String)
                .map_err(|_| ConfigError::MissingEnvVar {
                    name: name.to_string(),
                    path: file.to_path_buf(),
                });
        }

        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: tagged.tag,
            value: self.expand(tagged.value, file)?,
        })))
    }
}

fn is_include(value: &Value) -> bool {
    matches!(value, Value::Tagged(tagged) if tagged.tag == INCLUDE)
}

fn string_argument<'a>(value: &'a Value, tag: &'static str, file: &Path) -> ConfigResult<&'a str> {
    value.as_str().ok_or_else(|| ConfigError::BadTag {
        path: file.to_path_buf(),
        tag,
        reason: format!("expected a string, got {value:?}"),
    })
}
