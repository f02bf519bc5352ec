//! Proxy groups.
//!
//! A group presents a set of member proxies as one selectable proxy. Its
//! membership lives in the group's `HealthCheck`, so reloads that replace the
//! members go through `HealthCheck::set_proxies`.

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

use super::{AnyProxy, DelayReport, Group, ProbeError, Proxy, ProxyInfo};
use crate::health::batch::{self, Deadline};
use crate::health::check::HealthCheck;
use crate::health::ranges::StatusRanges;

/// How a group picks its current member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    /// First member, selection handled elsewhere.
    Select,
    /// Alive member with the lowest delay.
    UrlTest,
    /// First alive member.
    Fallback,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Select => "select",
            GroupKind::UrlTest => "url-test",
            GroupKind::Fallback => "fallback",
        }
    }
}

/// A named group of proxies with its own health check.
pub struct ProxyGroup {
    name: String,
    kind: GroupKind,
    health: Arc<HealthCheck>,
}

impl ProxyGroup {
    pub fn new(name: impl Into<String>, kind: GroupKind, health: Arc<HealthCheck>) -> Self {
        Self {
            name: name.into(),
            kind,
            health,
        }
    }

    pub fn group_kind(&self) -> GroupKind {
        self.kind
    }

    pub fn health_check(&self) -> &Arc<HealthCheck> {
        &self.health
    }

    /// Replace the members (e.g. on config reload).
    pub fn set_members(&self, members: Vec<AnyProxy>) {
        self.health.set_proxies(members);
    }

    fn current(&self) -> Option<AnyProxy> {
        let members = self.health.proxies();
        let first = members.first().cloned();
        match self.kind {
            GroupKind::Select => first,
            GroupKind::Fallback => members.iter().find(|p| p.alive()).cloned().or(first),
            GroupKind::UrlTest => members
                .iter()
                .filter(|p| p.alive())
                .min_by_key(|p| p.last_delay())
                .cloned()
                .or(first),
        }
    }
}

impl Proxy for ProxyGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.kind.as_str()
    }

    fn url_test<'a>(
        &'a self,
        url: &'a str,
        expected: &'a StatusRanges,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<u16, ProbeError>> {
        async move {
            match self.current() {
                Some(member) => member.url_test(url, expected, deadline).await,
                None => Err(ProbeError::NoMembers),
            }
        }
        .boxed()
    }

    fn alive(&self) -> bool {
        self.current().map(|p| p.alive()).unwrap_or(false)
    }

    fn last_delay(&self) -> u16 {
        self.current()
            .map(|p| p.last_delay())
            .unwrap_or(super::UNKNOWN_DELAY)
    }

    fn as_group(&self) -> Option<&dyn Group> {
        Some(self)
    }

    fn info(&self) -> ProxyInfo {
        let current = self.current();
        ProxyInfo {
            name: self.name.clone(),
            kind: self.kind.as_str().to_string(),
            alive: current.as_ref().map(|p| p.alive()).unwrap_or(false),
            delay: current
                .as_ref()
                .map(|p| p.last_delay())
                .unwrap_or(super::UNKNOWN_DELAY),
            now: current.map(|p| p.name().to_string()),
            all: Some(
                self.health
                    .proxies()
                    .iter()
                    .map(|p| p.name().to_string())
                    .collect(),
            ),
        }
    }
}

impl Group for ProxyGroup {
    fn members(&self) -> Vec<AnyProxy> {
        self.health.proxies().as_ref().clone()
    }

    fn now(&self) -> Option<String> {
        self.current().map(|p| p.name().to_string())
    }

    fn select(&self) -> Option<AnyProxy> {
        self.health.touch();
        self.current()
    }

    fn delay_test<'a>(
        &'a self,
        url: &'a str,
        expected: &'a StatusRanges,
        deadline: Instant,
    ) -> BoxFuture<'a, Result<DelayReport, ProbeError>> {
        async move {
            let members = self.health.proxies();
            if members.is_empty() {
                return Err(ProbeError::NoMembers);
            }

            let outcomes = batch::probe_all(
                &members,
                url,
                expected,
                Deadline::At(deadline),
                self.health.options().concurrency,
            )
            .await;

            // The deadline is the caller's: any member still pending at it fails the round.
            if outcomes
                .iter()
                .any(|o| matches!(o.result, Err(ProbeError::Timeout)))
            {
                return Err(ProbeError::Timeout);
            }

            let mut report = DelayReport::default();
            for outcome in outcomes {
                match outcome.result {
                    Ok(delay) => {
                        report.delays.insert(outcome.name, delay);
                    }
                    Err(e) => {
                        report.errors.insert(outcome.name, e.to_string());
                    }
                }
            }

            if report.is_all_failed() {
                return Err(ProbeError::AllFailed);
            }
            Ok(report)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockProxy;
    use std::time::Duration;

    fn group(kind: GroupKind, members: &[Arc<MockProxy>]) -> ProxyGroup {
        let members: Vec<AnyProxy> = members.iter().map(|p| p.clone() as AnyProxy).collect();
        let health = HealthCheck::new(members, "http://example.com", 0, true, "");
        ProxyGroup::new("auto", kind, Arc::new(health))
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_test_prefers_fastest_alive() {
        let members = vec![
            Arc::new(MockProxy::new("slow", 300, 204)),
            Arc::new(MockProxy::new("fast", 50, 204)),
            Arc::new(MockProxy::new("broken", 10, 500)),
        ];
        let g = group(GroupKind::UrlTest, &members);
        g.health_check().check().await;

        // "broken" passes too: empty expected set accepts any status.
        assert_eq!(g.now().as_deref(), Some("broken"));

        let g = ProxyGroup::new(
            "strict",
            GroupKind::UrlTest,
            Arc::new(HealthCheck::new(
                members.iter().map(|p| p.clone() as AnyProxy).collect(),
                "http://example.com",
                0,
                true,
                "200-299",
            )),
        );
        g.health_check().check().await;
        assert_eq!(g.now().as_deref(), Some("fast"));
        assert_eq!(g.last_delay(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_skips_dead_members() {
        let members = vec![
            Arc::new(MockProxy::hanging("primary")),
            Arc::new(MockProxy::new("backup", 20, 204)),
        ];
        let g = group(GroupKind::Fallback, &members);
        assert_eq!(g.now().as_deref(), Some("primary"));

        g.health_check().check().await;
        assert_eq!(g.now().as_deref(), Some("backup"));
        assert!(g.alive());
    }

    #[test]
    fn test_select_touches_health_check() {
        let members = vec![Arc::new(MockProxy::new("only", 10, 204))];
        let g = group(GroupKind::Select, &members);
        assert_eq!(g.health_check().last_touch(), 0);

        let picked = g.select().unwrap();
        assert_eq!(picked.name(), "only");
        assert!(g.health_check().last_touch() > 0);
    }

    #[test]
    fn test_group_info() {
        let members = vec![
            Arc::new(MockProxy::new("a", 10, 204)),
            Arc::new(MockProxy::new("b", 10, 204)),
        ];
        let g = group(GroupKind::Select, &members);
        let info = g.info();
        assert_eq!(info.kind, "select");
        assert_eq!(info.now.as_deref(), Some("a"));
        assert_eq!(info.all, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(g.as_group().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_test_reports_each_member() {
        let members = vec![
            Arc::new(MockProxy::new("a", 40, 204)),
            Arc::new(MockProxy::new("b", 10, 404)),
        ];
        let g = group(GroupKind::UrlTest, &members);
        let expected = StatusRanges::parse("204").unwrap();

        let report = g
            .delay_test("http://example.com", &expected, Instant::now() + Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(report.delays.get("a"), Some(&40));
        assert_eq!(report.errors.get("b").map(String::as_str), Some("unexpected status code 404"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_test_all_failed() {
        let members = vec![
            Arc::new(MockProxy::new("a", 10, 500)),
            Arc::new(MockProxy::new("b", 10, 404)),
        ];
        let g = group(GroupKind::UrlTest, &members);

        let result = g
            .delay_test(
                "http://example.com",
                &StatusRanges::parse("204").unwrap(),
                Instant::now() + Duration::from_millis(100),
            )
            .await;
        assert_eq!(result, Err(ProbeError::AllFailed));

        let empty = group(GroupKind::UrlTest, &[]);
        let result = empty
            .delay_test("http://example.com", &StatusRanges::empty(), Instant::now())
            .await;
        assert_eq!(result, Err(ProbeError::NoMembers));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_test_pending_member_fails_whole_round() {
        let members = vec![
            Arc::new(MockProxy::new("fast", 10, 204)),
            Arc::new(MockProxy::hanging("stuck")),
        ];
        let g = group(GroupKind::UrlTest, &members);

        let result = g
            .delay_test(
                "http://example.com",
                &StatusRanges::empty(),
                Instant::now() + Duration::from_millis(100),
            )
            .await;
        assert_eq!(result, Err(ProbeError::Timeout));
    }
}
