//! Wire shapes for the Docker-compatible HTTP API (v1.12).
//!
//! These are consumed-only shapes: we deserialize what we need and ignore
//! the rest. Field names match the daemon's JSON exactly (PascalCase).

use serde::Deserialize;

/// One entry from `GET /containers/json?all=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Ports")]
    pub ports: Vec<RawPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPort {
    #[serde(rename = "PrivatePort")]
    pub private_port: u16,
}

/// Full inspection record from `GET /containers/{id}/json`.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectionRecord {
    #[serde(rename = "Id")]
    pub id: String,
    /// Leading `/` container name, e.g. `/paye_216`.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Config")]
    pub config: ContainerConfig,
    #[serde(rename = "NetworkSettings")]
    pub network_settings: NetworkSettings,
    #[serde(rename = "State")]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Env", default)]
    pub env: Vec<String>,
    #[serde(rename = "CpuShares", default)]
    pub cpu_shares: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSettings {
    #[serde(rename = "Ports", default)]
    pub ports: std::collections::HashMap<String, Option<Vec<HostPortBinding>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostPortBinding {
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "FinishedAt")]
    pub finished_at: String,
}

/// `"Up "` prefix used to distinguish running containers from everything
/// else. Trailing space is load-bearing — `"Upgraded"` is not a running
/// container's status.
pub const RUNNING_PREFIX: &str = "Up ";

/// The container port every managed runner exposes.
pub const RUNNER_PRIVATE_PORT: u16 = 8080;

/// Docker's zero-value timestamp, emitted when a container has never
/// recorded a real finish time.
pub const SENTINEL_FINISHED_AT: &str = "0001-01-01T00:00:00Z";

/// First whitespace-delimited token of a daemon status string, e.g.
/// `"Exited (0) 2 days ago"` -> `"Exited"`. Empty input yields empty output.
pub fn first_token(status: &str) -> String {
    status.split_whitespace().next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_token_splits_on_whitespace() {
        assert_eq!(first_token("Up 40 minutes"), "Up");
        assert_eq!(first_token("Exited (0) 2 days ago"), "Exited");
        assert_eq!(first_token(""), "");
    }

    #[test]
    fn deserializes_inspection_record() {
        let raw = r#"{
            "Id": "656ca7c307d178",
            "Name": "/paye_216",
            "Config": {"Env": ["HOME=/", "SLUG_URL=https://x/y.tgz"], "CpuShares": 2},
            "NetworkSettings": {"Ports": {"8080/tcp": [{"HostPort": "9317"}]}},
            "State": {"FinishedAt": "0001-01-01T00:00:00Z"}
        }"#;
        let rec: InspectionRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.id, "656ca7c307d178");
        assert_eq!(rec.config.cpu_shares, 2);
        assert_eq!(rec.state.finished_at, SENTINEL_FINISHED_AT);
    }
}
