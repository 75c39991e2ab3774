//! Per-host transport to one Docker-compatible daemon.
//!
//! [`NodeClient`] wraps a [`Transport`] trait object so tests can swap in an
//! in-memory fake (see `tests` below and `src/testutil.rs`) without a real
//! daemon or network, while production code uses [`HttpTransport`] over
//! `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::Serialize;
use url::Url;

use crate::error::{NodeClientError, NodeResult};
use crate::node::model::{InspectionRecord, RawContainerSummary};

pub const API_VERSION: &str = "v1.12";

/// Everything a [`NodeClient`] needs to create a runner container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub command: String,
    pub env: Vec<(String, String)>,
    pub hostname: Option<String>,
    pub name: String,
    pub cpu_shares: u32,
    pub mem_limit_bytes: u64,
}

#[derive(Debug, Serialize)]
struct CreateContainerBody {
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Cmd")]
    cmd: Vec<String>,
    #[serde(rename = "Env")]
    env: Vec<String>,
    #[serde(rename = "Hostname", skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    #[serde(rename = "ExposedPorts")]
    exposed_ports: serde_json::Value,
    #[serde(rename = "HostConfig")]
    host_config: HostConfigBody,
}

#[derive(Debug, Serialize)]
struct HostConfigBody {
    #[serde(rename = "CpuShares")]
    cpu_shares: u32,
    #[serde(rename = "Memory")]
    memory: u64,
    #[serde(rename = "PortBindings")]
    port_bindings: serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
struct CreateContainerResponse {
    #[serde(rename = "Id")]
    id: String,
}

/// One daemon's raw API surface, abstracted so tests can substitute a fake.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn ping(&self) -> NodeResult<()>;
    async fn list_containers(&self) -> NodeResult<Vec<RawContainerSummary>>;
    async fn inspect(&self, id: &str) -> NodeResult<InspectionRecord>;
    async fn create(&self, spec: &ContainerSpec) -> NodeResult<String>;
    async fn start(&self, id: &str) -> NodeResult<()>;
    async fn stop(&self, id: &str) -> NodeResult<()>;
    async fn kill(&self, id: &str) -> NodeResult<()>;
    async fn remove(&self, id: &str, force: bool) -> NodeResult<()>;
    /// Full log blob (non-stream mode).
    async fn logs_blob(&self, id: &str) -> NodeResult<Bytes>;
    /// Raw byte stream for follow mode; may be multiplexed-framed or plain.
    async fn logs_stream(&self, id: &str) -> NodeResult<BoxStream<'static, NodeResult<Bytes>>>;
}

/// `reqwest`-backed [`Transport`] for a remote Docker-compatible daemon.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    auth: Option<(String, String)>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: Url, verify_tls: bool, timeout: Duration) -> NodeResult<Self> {
        let auth = if !base_url.username().is_empty() {
            Some((
                base_url.username().to_string(),
                base_url.password().unwrap_or("").to_string(),
            ))
        } else {
            None
        };

        let mut scheme_url = base_url.clone();
        scheme_url.set_username("").ok();
        scheme_url.set_password(None).ok();

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: scheme_url,
            auth,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            API_VERSION,
            path
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, self.url(path));
        if let Some((user, pass)) = &self.auth {
            req = req.basic_auth(user, Some(pass));
        }
        req
    }

    async fn check_status(resp: reqwest::Response) -> NodeResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let status_code = status.as_u16();
        let message = resp.text().await.unwrap_or_default();
        if status_code == 404 {
            return Err(NodeClientError::NotFound(message));
        }
        Err(NodeClientError::Api {
            status: status_code,
            message,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn ping(&self) -> NodeResult<()> {
        let resp = self.request(reqwest::Method::GET, "/_ping").send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn list_containers(&self) -> NodeResult<Vec<RawContainerSummary>> {
        let resp = self
            .request(reqwest::Method::GET, "/containers/json?all=1")
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn inspect(&self, id: &str) -> NodeResult<InspectionRecord> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/containers/{id}/json"))
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn create(&self, spec: &ContainerSpec) -> NodeResult<String> {
        let body = CreateContainerBody {
            image: spec.image.clone(),
            cmd: spec
                .command
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            env: spec
                .env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect(),
            hostname: spec.hostname.clone(),
            exposed_ports: serde_json::json!({ "8080/tcp": {} }),
            host_config: HostConfigBody {
                cpu_shares: spec.cpu_shares,
                memory: spec.mem_limit_bytes,
                port_bindings: serde_json::json!({ "8080/tcp": [{ "HostPort": "" }] }),
            },
        };
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/containers/create?name={}", spec.name),
            )
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let parsed: CreateContainerResponse = resp.json().await?;
        Ok(parsed.id)
    }

    async fn start(&self, id: &str) -> NodeResult<()> {
        let body = serde_json::json!({ "PortBindings": { "8080/tcp": [{ "HostPort": "" }] } });
        let resp = self
            .request(reqwest::Method::POST, &format!("/containers/{id}/start"))
            .json(&body)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> NodeResult<()> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/containers/{id}/stop"))
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn kill(&self, id: &str) -> NodeResult<()> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/containers/{id}/kill"))
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> NodeResult<()> {
        let resp = self
            .request(
                reqwest::Method::DELETE,
                &format!("/containers/{id}?force={force}"),
            )
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn logs_blob(&self, id: &str) -> NodeResult<Bytes> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/containers/{id}/logs?stdout=1&stderr=1"),
            )
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.bytes().await?)
    }

    async fn logs_stream(&self, id: &str) -> NodeResult<BoxStream<'static, NodeResult<Bytes>>> {
        use futures_util::StreamExt;

        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/containers/{id}/logs?stdout=1&stderr=1&follow=1"),
            )
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(NodeClientError::from));
        Ok(Box::pin(stream))
    }
}

/// A configured daemon's client: transport plus its node identity. Cheap to
/// clone (the transport is reference-counted).
#[derive(Clone)]
pub struct NodeClient {
    pub id: String,
    transport: std::sync::Arc<dyn Transport>,
}

impl NodeClient {
    pub fn new(id: String, transport: std::sync::Arc<dyn Transport>) -> Self {
        Self { id, transport }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_container_body_splits_command_into_argv() {
        let spec = ContainerSpec {
            image: "runner/image".into(),
            command: "runner command".into(),
            env: vec![("PORT".into(), "8080".into())],
            hostname: None,
            name: "paye_abc".into(),
            cpu_shares: 2,
            mem_limit_bytes: 268_435_456,
        };
        let body = CreateContainerBody {
            image: spec.image.clone(),
            cmd: spec.command.split_whitespace().map(str::to_string).collect(),
            env: spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect(),
            hostname: spec.hostname.clone(),
            exposed_ports: serde_json::json!({ "8080/tcp": {} }),
            host_config: HostConfigBody {
                cpu_shares: spec.cpu_shares,
                memory: spec.mem_limit_bytes,
                port_bindings: serde_json::json!({ "8080/tcp": [{ "HostPort": "" }] }),
            },
        };
        assert_eq!(body.cmd, vec!["runner", "command"]);
        assert_eq!(body.env, vec!["PORT=8080"]);
    }
}
