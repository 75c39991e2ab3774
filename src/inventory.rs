//! Per-node listing, GC state machine and sentinel-time repair.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::cache::{CacheKey, InspectionCache};
use crate::error::ConnectionError;
use crate::node::client::NodeClient;
use crate::node::model::{first_token, InspectionRecord, RUNNER_PRIVATE_PORT, RUNNING_PREFIX, SENTINEL_FINISHED_AT};
use crate::projection::{self, Instance};

/// Parse a daemon `FinishedAt` timestamp the way the source does: trim the
/// trailing `Z` and any sub-second fraction, then read the remainder as a
/// naive UTC `YYYY-MM-DDTHH:MM:SS` timestamp.
fn parse_finished_at(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim_end_matches('Z');
    let without_fraction = trimmed.split('.').next().unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(without_fraction, "%Y-%m-%dT%H:%M:%S").ok()
}

async fn cached_inspect(
    client: &NodeClient,
    cache: &InspectionCache,
    id: &str,
    coarse: &str,
) -> Result<Arc<InspectionRecord>, ConnectionError> {
    let key = CacheKey::new(&client.id, id, coarse);
    if let Some(hit) = cache.get(&key).await {
        return Ok(hit);
    }
    debug!(node = %client.id, container = %id, "cache miss, inspecting");
    let record = client
        .transport()
        .inspect(id)
        .await
        .map_err(|source| ConnectionError::Unreachable { node: client.id.clone(), source })?;
    let record = Arc::new(record);
    cache.insert(key, record.clone()).await;
    Ok(record)
}

/// List this node's "app" instances, running the GC state machine inline
/// for every non-`Up` container.
pub async fn get_node_instances(
    client: &NodeClient,
    cache: &InspectionCache,
    gc_grace_period: chrono::Duration,
) -> Result<Vec<Instance>, ConnectionError> {
    let containers = client
        .transport()
        .list_containers()
        .await
        .map_err(|source| ConnectionError::Unreachable { node: client.id.clone(), source })?;

    debug!(node = %client.id, count = containers.len(), "listed containers");

    let mut instances = Vec::new();
    for container in containers {
        let coarse = first_token(&container.status);

        if !container.status.starts_with(RUNNING_PREFIX) {
            let record = match cached_inspect(client, cache, &container.id, &coarse).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(node = %client.id, container = %container.id, error = %e, "failed to inspect exited container, skipping");
                    continue;
                }
            };
            let finished_at = &record.state.finished_at;

            if finished_at == SENTINEL_FINISHED_AT {
                warn!(
                    node = %client.id,
                    container = %container.id,
                    "container has zero exit time, attempting start+kill repair"
                );
                if let Err(e) = client.transport().start(&container.id).await {
                    warn!(node = %client.id, container = %container.id, error = %e, "repair start failed");
                }
                if let Err(e) = client.transport().kill(&container.id).await {
                    warn!(node = %client.id, container = %container.id, error = %e, "repair kill failed");
                }
                continue;
            }

            let Some(finished) = parse_finished_at(finished_at) else {
                warn!(node = %client.id, container = %container.id, raw = %finished_at, "unparseable FinishedAt, skipping GC for this container");
                continue;
            };
            let age = Utc::now().naive_utc() - finished;
            if age > gc_grace_period {
                warn!(node = %client.id, container = %container.id, finished_at = %finished_at, "recycling exited container past grace period");
                if let Err(e) = client.transport().remove(&container.id, false).await {
                    warn!(node = %client.id, container = %container.id, error = %e, "remove failed during GC");
                }
            }
            continue;
        }

        if container.ports.len() != 1 || container.ports[0].private_port != RUNNER_PRIVATE_PORT {
            continue;
        }

        let record = match cached_inspect(client, cache, &container.id, &coarse).await {
            Ok(r) => r,
            Err(e) => {
                warn!(node = %client.id, container = %container.id, error = %e, "failed to inspect running container, skipping");
                continue;
            }
        };

        match projection::project(&client.id, &record) {
            Ok(instance) => instances.push(instance),
            Err(e) => warn!(node = %client.id, error = %e, "skipping malformed record"),
        }
    }

    Ok(instances)
}
