//! Component descriptor parsing.

use serde::Deserialize;

use super::AggregateError;

/// File name of the component descriptor expected at every walked root.
pub const DESCRIPTOR_FILENAME: &str = "docloom.yml";

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    version: Option<serde_yaml::Value>,
    title: Option<String>,
    start_page: Option<String>,
    nav: Option<Vec<String>>,
}

/// Parsed component descriptor for one ingested component version.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub name: String,
    pub version: String,
    pub title: Option<String>,
    pub start_page: Option<String>,
    /// Navigation files in menu order.
    pub nav: Vec<String>,
}

/// Parses a `docloom.yml` descriptor. The version may be any YAML scalar
/// and is coerced to a string; missing name or version is an error.
pub fn parse_descriptor(contents: &[u8], url: &str) -> Result<ComponentDescriptor, AggregateError> {
    let raw: RawDescriptor =
        serde_yaml::from_slice(contents).map_err(|err| AggregateError::BadDescriptor {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

    let name = raw.name.ok_or_else(|| AggregateError::BadDescriptor {
        url: url.to_string(),
        reason: format!("{DESCRIPTOR_FILENAME} is missing a name"),
    })?;
    let version = raw
        .version
        .and_then(coerce_scalar)
        .ok_or_else(|| AggregateError::BadDescriptor {
            url: url.to_string(),
            reason: format!("{DESCRIPTOR_FILENAME} is missing a version"),
        })?;

    Ok(ComponentDescriptor {
        name,
        version,
        title: raw.title,
        start_page: raw.start_page,
        nav: raw.nav.unwrap_or_default(),
    })
}

fn coerce_scalar(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(value) => Some(value),
        serde_yaml::Value::Number(value) => Some(value.to_string()),
        serde_yaml::Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}
