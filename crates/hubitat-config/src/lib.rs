//! YAML configuration loading for the Hubitat rule engine
//!
//! This crate loads the hub configuration file, which holds router settings
//! and declarative automations. Two custom tags are supported:
//!
//! - `!include path` - Include another YAML file; included lists splice
//!   into the surrounding list
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use hubitat_config::load_config;
//!
//! let config = load_config("/etc/hubitat/config.yaml")?;
//! println!("{} automations", config.automations.len());
//! ```

mod error;
mod hub_config;
mod loader;

pub use error::{ConfigError, ConfigResult};
pub use hub_config::{load_config, HubConfig};
pub use loader::ConfigReader;
