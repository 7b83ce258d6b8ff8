//! Connector parameters from the command line, a file and the environment.

use std::path::Path;

use serde_json::Value;

use registry_recon::config::API_KEY_ENV;
use registry_recon::{ConnectorKind, Parameters};

use crate::error::{CliError, CliResult};

/// Split `key=value`. The value is kept as a string; connectors coerce it.
pub fn parse_pair(pair: &str) -> CliResult<(String, Value)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), Value::String(value.to_string())))
        }
        _ => Err(CliError::InvalidParam(pair.to_string())),
    }
}

/// Merge parameters: file first, then `--param` pairs, which win.
pub fn load(file: Option<&Path>, pairs: &[String]) -> CliResult<Parameters> {
    let mut params = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => return Err(CliError::InvalidParamsFile),
            }
        }
        None => Parameters::new(),
    };

    for pair in pairs {
        let (key, value) = parse_pair(pair)?;
        params.insert(key, value);
    }
    Ok(params)
}

/// Fill `apiKey` from the environment for connectors that take one.
pub fn apply_env_defaults(kind: ConnectorKind, params: &mut Parameters) {
    apply_api_key(kind, params, std::env::var(API_KEY_ENV).ok());
}

fn apply_api_key(kind: ConnectorKind, params: &mut Parameters, env_key: Option<String>) {
    let takes_key = kind.details().parameters.iter().any(|p| p.name == "apiKey");
    if !takes_key || params.contains_key("apiKey") {
        return;
    }
    if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
        params.insert("apiKey".to_string(), Value::String(key));
    }
}
