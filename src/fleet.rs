//! Concurrent fan-out of inventory/node-status across the fleet.
//!
//! Bounded to a fixed worker count (spec default 8): one `tokio::spawn` per
//! included node, gated by a `Semaphore` so only that many run concurrently
//! regardless of fleet size. A per-node failure degrades the aggregate
//! result rather than failing the whole call.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::error;

use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::inventory;
use crate::projection::Instance;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SlotUsage {
    pub total: u32,
    pub used: u32,
    pub free: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum NodeState {
    Healthy,
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NodeStatus {
    pub id: String,
    pub slots: SlotUsage,
    pub state: NodeState,
}

/// List instances across the fleet, or a single node when `node_filter` is
/// set. Concatenation order across nodes is unspecified (completion order);
/// within a node, projection order is preserved.
pub async fn get_instances(conn: &Connection, node_filter: Option<&str>) -> Vec<Instance> {
    let node_ids: Vec<String> = conn
        .node_ids()
        .into_iter()
        .filter(|id| node_filter.map(|f| f == id.as_str()).unwrap_or(true))
        .collect();

    let semaphore = Arc::new(Semaphore::new(conn.config().fleet_workers.max(1)));
    let mut tasks = Vec::with_capacity(node_ids.len());

    for node_id in node_ids {
        let permit = semaphore.clone();
        let handle = conn.node_handle(&node_id).expect("node_id came from conn.node_ids()");
        let cache = conn.cache().clone();
        let gc_grace_period = conn.config().docker_gc_grace_period();
        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            let result = inventory::get_node_instances(&handle.client, cache.as_ref(), gc_grace_period).await;
            (node_id, result)
        }));
    }

    let mut instances = Vec::new();
    for task in tasks {
        match task.await {
            Ok((_node_id, Ok(node_instances))) => instances.extend(node_instances),
            Ok((node_id, Err(e))) => error!(node = %node_id, error = %e, "get_instances failed on node"),
            Err(join_err) => error!(error = %join_err, "node inventory task panicked"),
        }
    }
    instances
}

/// Status of one configured node: liveness, and slot usage derived from a
/// fresh inventory. Never raises for transport failure; reports it in
/// `state` instead.
pub async fn get_node(conn: &Connection, name: &str) -> Result<NodeStatus, ConnectionError> {
    let handle = conn
        .node_handle(name)
        .ok_or_else(|| ConnectionError::NoSuchNode(name.to_string()))?;

    match handle.client.transport().ping().await {
        Ok(()) => {
            let instances = get_instances(conn, Some(name)).await;
            let used: u32 = instances.iter().map(|i| i.slots).sum();
            Ok(NodeStatus {
                id: name.to_string(),
                slots: SlotUsage {
                    total: handle.total_slots,
                    used,
                    free: handle.total_slots.saturating_sub(used),
                },
                state: NodeState::Healthy,
            })
        }
        Err(e) => Ok(NodeStatus {
            id: name.to_string(),
            slots: SlotUsage { total: 0, used: 0, free: 0 },
            state: NodeState::Unreachable(e.to_string()),
        }),
    }
}

/// Status of every configured node, fanned out with the same bounded pool.
pub async fn get_nodes(conn: &Connection) -> Vec<NodeStatus> {
    let node_ids = conn.node_ids();
    let semaphore = Arc::new(Semaphore::new(conn.config().fleet_workers.max(1)));
    let mut tasks = Vec::with_capacity(node_ids.len());

    for node_id in node_ids {
        let permit = semaphore.clone();
        // Connection is cheaply cloned (Arc-backed internals); see connection.rs.
        let conn = conn.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            get_node(&conn, &node_id).await
        }));
    }

    let mut statuses = Vec::new();
    for task in tasks {
        match task.await {
            Ok(Ok(status)) => statuses.push(status),
            Ok(Err(e)) => error!(error = %e, "get_nodes: get_node returned an error"),
            Err(join_err) => error!(error = %join_err, "node status task panicked"),
        }
    }
    statuses
}
