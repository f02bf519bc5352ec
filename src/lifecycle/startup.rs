//! Startup and reload orchestration.
//!
//! # Responsibilities
//! - Build leaf proxies and groups from configuration
//! - Start a scheduler for every group with `interval > 0`
//! - Apply reloaded membership to running groups
//! - Close every health check exactly once on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Reload only changes membership; other group settings need a restart

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::adapter::http::AdapterError;
use crate::adapter::{AnyProxy, HttpProxy, ProxyGroup, ProxyRegistry};
use crate::config::{GroupEntry, HealthConfig, ProxyEntry};
use crate::health::HealthCheck;

/// Errors while building proxies and groups.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("proxy {name}: {source}")]
    Proxy {
        name: String,
        #[source]
        source: AdapterError,
    },

    #[error("group {group}: unknown member {member}")]
    UnknownMember { group: String, member: String },
}

/// Running proxies, groups and their scheduler tasks.
pub struct Runtime {
    registry: Arc<ProxyRegistry>,
    groups: Vec<Arc<ProxyGroup>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Build every proxy and group. Schedulers are not started yet.
    pub fn build(config: &HealthConfig) -> Result<Self, StartupError> {
        let mut proxies = build_leaves(&config.proxies)?;
        let mut groups = Vec::with_capacity(config.groups.len());

        for entry in &config.groups {
            let members = resolve_members(&proxies, entry)?;
            let health = HealthCheck::new(
                members,
                entry.url.clone(),
                entry.interval,
                entry.lazy,
                &entry.expected_status,
            )
            .with_label(entry.name.clone())
            .with_options(config.health_check.options());

            let group = Arc::new(ProxyGroup::new(entry.name.clone(), entry.kind, Arc::new(health)));
            proxies.insert(entry.name.clone(), group.clone() as AnyProxy);
            groups.push(group);
        }

        tracing::info!(
            proxies = config.proxies.len(),
            groups = groups.len(),
            "Proxies and groups built"
        );

        Ok(Self {
            registry: Arc::new(ProxyRegistry::new(proxies)),
            groups,
            tasks: Vec::new(),
        })
    }

    /// Spawn the scheduler of every automatic group.
    pub fn start(&mut self) {
        for group in &self.groups {
            if let Some(handle) = group.health_check().spawn() {
                self.tasks.push(handle);
            }
        }
        tracing::info!(schedulers = self.tasks.len(), "Health checks started");
    }

    pub fn registry(&self) -> Arc<ProxyRegistry> {
        self.registry.clone()
    }

    pub fn groups(&self) -> &[Arc<ProxyGroup>] {
        &self.groups
    }

    /// Rebuild leaf proxies and hand the new members to running groups.
    ///
    /// On error nothing is changed.
    pub fn reload(&self, config: &HealthConfig) -> Result<(), StartupError> {
        let mut proxies = build_leaves(&config.proxies)?;
        let running: HashMap<&str, &Arc<ProxyGroup>> =
            self.groups.iter().map(|g| (g.health_check().label(), g)).collect();

        let mut updates = Vec::new();
        for entry in &config.groups {
            let Some(group) = running.get(entry.name.as_str()) else {
                tracing::warn!(group = %entry.name, "New group ignored until restart");
                continue;
            };
            let members = resolve_members(&proxies, entry)?;
            proxies.insert(entry.name.clone(), (*group).clone() as AnyProxy);
            updates.push((*group, members));
        }

        for group in &self.groups {
            let name = group.health_check().label();
            if !config.groups.iter().any(|g| g.name == name) {
                tracing::warn!(group = %name, "Group removed from config keeps running until restart");
                proxies.insert(name.to_string(), group.clone() as AnyProxy);
            }
        }

        for (group, members) in updates {
            tracing::info!(
                group = %group.health_check().label(),
                members = members.len(),
                "Group membership replaced"
            );
            group.set_members(members);
        }
        self.registry.replace(proxies);
        Ok(())
    }

    /// Close every health check and wait for the scheduler loops to exit.
    pub async fn shutdown(self) {
        for group in &self.groups {
            group.health_check().close();
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Health check task ended abnormally");
            }
        }
        tracing::info!("Health checks stopped");
    }
}

fn build_leaves(entries: &[ProxyEntry]) -> Result<HashMap<String, AnyProxy>, StartupError> {
    let mut proxies = HashMap::with_capacity(entries.len());
    for entry in entries {
        let proxy = HttpProxy::from_config(entry).map_err(|source| StartupError::Proxy {
            name: entry.name.clone(),
            source,
        })?;
        proxies.insert(entry.name.clone(), Arc::new(proxy) as AnyProxy);
    }
    Ok(proxies)
}

fn resolve_members(
    proxies: &HashMap<String, AnyProxy>,
    entry: &GroupEntry,
) -> Result<Vec<AnyProxy>, StartupError> {
    entry
        .proxies
        .iter()
        .map(|name| {
            proxies
                .get(name)
                .cloned()
                .ok_or_else(|| StartupError::UnknownMember {
                    group: entry.name.clone(),
                    member: name.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Group;
    use crate::config::loader::parse_config;

    const CONFIG: &str = r#"
[[proxies]]
name = "a"
type = "http"
server = "127.0.0.1"
port = 3128

[[proxies]]
name = "b"
type = "direct"

[[groups]]
name = "auto"
type = "url-test"
proxies = ["a", "b"]
interval = 300

[[groups]]
name = "manual"
type = "select"
proxies = ["auto", "a"]
"#;

    #[tokio::test]
    async fn test_build_registers_groups_and_leaves() {
        let config = parse_config(CONFIG).unwrap();
        let mut runtime = Runtime::build(&config).unwrap();
        let registry = runtime.registry();

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.groups().len(), 2);
        let manual = registry.get("manual").unwrap();
        let members: Vec<String> = manual
            .as_group()
            .unwrap()
            .members()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(members, ["auto", "a"]);

        // Only "auto" has an interval.
        runtime.start();
        assert_eq!(runtime.tasks.len(), 1);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_reload_replaces_membership() {
        let config = parse_config(CONFIG).unwrap();
        let runtime = Runtime::build(&config).unwrap();
        let auto_before = runtime.registry().get("auto").unwrap();

        let reloaded = parse_config(
            r#"
[[proxies]]
name = "c"
type = "direct"

[[groups]]
name = "auto"
type = "url-test"
proxies = ["c"]

[[groups]]
name = "extra"
type = "select"
proxies = ["c"]
"#,
        )
        .unwrap();
        runtime.reload(&reloaded).unwrap();

        let registry = runtime.registry();
        let auto = registry.get("auto").unwrap();
        assert!(Arc::ptr_eq(&auto, &auto_before), "group identity survives reload");
        assert_eq!(auto.as_group().unwrap().now().as_deref(), Some("c"));
        assert!(registry.get("a").is_none());
        assert!(registry.get("extra").is_none());
        // removed group keeps running
        assert!(registry.get("manual").is_some());
    }
}
