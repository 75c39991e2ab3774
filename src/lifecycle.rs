//! Start (with admission) and Stop (with best-effort remove) operations.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::fleet;
use crate::inventory;
use crate::node::client::ContainerSpec;
use crate::projection::{self, Instance};

/// Env keys the core injects on create, overriding any caller-supplied
/// value. Narrower than `RESERVED_ENV_KEYS`: `HOME`/`PATH` are masked from
/// the *projected* instance (see `projection::RESERVED_ENV_KEYS`) but are
/// not stripped from the container actually created.
const CREATE_OVERRIDE_KEYS: [&str; 2] = ["PORT", "SLUG_URL"];

/// Start a new runner instance on `node`.
///
/// `allocated_port` is accepted for signature parity with the upstream
/// contract but unused: the daemon always chooses the host port (see
/// [`crate::node::client::Transport::start`]).
#[allow(clippy::too_many_arguments)]
pub async fn start_instance(
    conn: &Connection,
    app: &str,
    slug_uri: &str,
    node: &str,
    _allocated_port: Option<u16>,
    environment: Option<HashMap<String, String>>,
    slots: Option<u32>,
    hostname: Option<String>,
) -> Result<Instance, ConnectionError> {
    let handle = conn
        .node_handle(node)
        .ok_or_else(|| ConnectionError::NoSuchNode(node.to_string()))?;

    let slots = slots.unwrap_or(conn.config().default_slots_per_instance);

    let mut env: Vec<(String, String)> = environment
        .unwrap_or_default()
        .into_iter()
        .filter(|(k, _)| !CREATE_OVERRIDE_KEYS.contains(&k.as_str()))
        .collect();
    env.push(("PORT".to_string(), "8080".to_string()));
    env.push(("SLUG_URL".to_string(), slug_uri.to_string()));

    let current_instances = inventory::get_node_instances(&handle.client, conn.cache(), conn.config().docker_gc_grace_period())
        .await
        .map_err(|e| match e {
            ConnectionError::Unreachable { node, source } => ConnectionError::Unreachable { node, source },
            other => other,
        })?;
    let used: u32 = current_instances.iter().map(|i| i.slots).sum();
    if used + slots > handle.total_slots {
        return Err(ConnectionError::NodeOutOfCapacity {
            node: node.to_string(),
            used,
            requested: slots,
            total: handle.total_slots,
        });
    }

    let name = format!("{app}_{}", Uuid::new_v4());
    let spec = ContainerSpec {
        image: conn.config().slug_runner_image.clone(),
        command: conn.config().slug_runner_command.clone(),
        env,
        hostname,
        name,
        cpu_shares: slots,
        mem_limit_bytes: conn.config().slot_memory_mb as u64 * slots as u64 * 1_048_576,
    };

    let container_id = handle
        .client
        .transport()
        .create(&spec)
        .await
        .map_err(|source| ConnectionError::Unreachable { node: node.to_string(), source })?;
    debug!(node, app, container_id = %container_id, "created container");

    handle
        .client
        .transport()
        .start(&container_id)
        .await
        .map_err(|source| ConnectionError::Unreachable { node: node.to_string(), source })?;
    debug!(node, container_id = %container_id, "started container");

    let record = handle
        .client
        .transport()
        .inspect(&container_id)
        .await
        .map_err(|source| ConnectionError::Unreachable { node: node.to_string(), source })?;

    info!(node, app, container_id = %container_id, "instance started");
    projection::project(node, &record)
}

/// Stop an instance by id, locating its node via a full fleet listing.
///
/// Returns `false` if the id isn't found on any node (not an error). Remove
/// failures after a successful stop are logged and swallowed; the call
/// still reports success.
pub async fn stop_instance(conn: &Connection, instance_id: &str) -> bool {
    let instances = fleet::get_instances(conn, None).await;
    let Some(instance) = instances.into_iter().find(|i| i.id == instance_id) else {
        return false;
    };

    let Some(handle) = conn.node_handle(&instance.node) else {
        return false;
    };

    if let Err(e) = handle.client.transport().stop(instance_id).await {
        warn!(node = %instance.node, container = %instance_id, error = %e, "stop failed");
        return false;
    }
    debug!(node = %instance.node, container = %instance_id, "stopped container");

    if let Err(e) = handle.client.transport().remove(instance_id, true).await {
        warn!(node = %instance.node, container = %instance_id, error = %e, "failed to remove container after stop");
    } else {
        debug!(node = %instance.node, container = %instance_id, "removed container");
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_caller_env_is_overridden_not_appended_twice() {
        let mut caller_env = HashMap::new();
        caller_env.insert("PORT".to_string(), "9999".to_string());
        caller_env.insert("JAVA_OPTS".to_string(), "-Xmx256m".to_string());

        let mut env: Vec<(String, String)> = caller_env
            .into_iter()
            .filter(|(k, _)| !CREATE_OVERRIDE_KEYS.contains(&k.as_str()))
            .collect();
        env.push(("PORT".to_string(), "8080".to_string()));
        env.push(("SLUG_URL".to_string(), "https://x/y.tgz".to_string()));

        let port_entries: Vec<_> = env.iter().filter(|(k, _)| k == "PORT").collect();
        assert_eq!(port_entries.len(), 1);
        assert_eq!(port_entries[0].1, "8080");
    }

    #[test]
    fn caller_supplied_home_and_path_survive_create() {
        let mut caller_env = HashMap::new();
        caller_env.insert("HOME".to_string(), "/home/runner".to_string());
        caller_env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());

        let env: Vec<(String, String)> = caller_env
            .into_iter()
            .filter(|(k, _)| !CREATE_OVERRIDE_KEYS.contains(&k.as_str()))
            .collect();

        assert!(env.iter().any(|(k, v)| k == "HOME" && v == "/home/runner"));
        assert!(env.iter().any(|(k, v)| k == "PATH" && v == "/usr/bin:/bin"));
    }
}
