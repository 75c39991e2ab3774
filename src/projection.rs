//! Translates a raw inspection record into the core's [`Instance`] entity.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ConnectionError;
use crate::node::model::InspectionRecord;

/// Environment keys the core injects on create and hides from the
/// projected `environment` map. Same list used in both directions.
pub const RESERVED_ENV_KEYS: [&str; 4] = ["HOME", "PATH", "SLUG_URL", "PORT"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub id: String,
    pub app: String,
    pub slug_uri: Option<String>,
    pub node: String,
    pub port: u16,
    pub environment: HashMap<String, String>,
    pub slots: u32,
}

/// Project a raw inspection record, scoped to `node`, into an [`Instance`].
///
/// Fails with [`ConnectionError::MalformedRecord`] if the 8080/tcp port
/// binding is missing or its host port isn't numeric.
pub fn project(node: &str, record: &InspectionRecord) -> Result<Instance, ConnectionError> {
    let app = record
        .name
        .strip_prefix('/')
        .unwrap_or(&record.name)
        .split('_')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut slug_uri = None;
    let mut environment = HashMap::new();
    for entry in &record.config.env {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        if key == "SLUG_URL" {
            slug_uri = Some(value.to_string());
        }
        if !RESERVED_ENV_KEYS.contains(&key) {
            environment.insert(key.to_string(), value.to_string());
        }
    }

    let bindings = record
        .network_settings
        .ports
        .get("8080/tcp")
        .and_then(|opt| opt.as_ref())
        .and_then(|bindings| bindings.first());

    let port: u16 = match bindings {
        Some(binding) => binding.host_port.parse().map_err(|_| ConnectionError::MalformedRecord {
            node: node.to_string(),
            reason: format!("non-numeric host port {:?} for container {}", binding.host_port, record.id),
        })?,
        None => {
            return Err(ConnectionError::MalformedRecord {
                node: node.to_string(),
                reason: format!("missing 8080/tcp port binding for container {}", record.id),
            })
        }
    };

    Ok(Instance {
        id: record.id.clone(),
        app,
        slug_uri,
        node: node.to_string(),
        port,
        environment,
        slots: record.config.cpu_shares,
    })
}
