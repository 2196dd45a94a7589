use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::PlanLimits;

/// Default lifetime of a cached plan lookup
pub const DEFAULT_PLAN_CACHE_TTL: Duration = Duration::from_secs(60);

/// Source of an organization's plan entitlements
#[async_trait]
pub trait PlanLimitsProvider: Send + Sync {
    async fn plan_limits(&self, organization_id: &str) -> Result<PlanLimits>;
}

/// Fixed plans held in memory, with a fallback for unknown organizations
#[derive(Debug, Clone, Default)]
pub struct StaticPlanLimits {
    plans: HashMap<String, PlanLimits>,
    fallback: PlanLimits,
}

impl StaticPlanLimits {
    pub fn new(fallback: PlanLimits) -> Self {
        Self { plans: HashMap::new(), fallback }
    }

    pub fn with_plan(mut self, organization_id: impl Into<String>, limits: PlanLimits) -> Self {
        self.plans.insert(organization_id.into(), limits);
        self
    }
}

#[async_trait]
impl PlanLimitsProvider for StaticPlanLimits {
    async fn plan_limits(&self, organization_id: &str) -> Result<PlanLimits> {
        Ok(self.plans.get(organization_id).cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

struct CachedPlan {
    limits: PlanLimits,
    fetched_at: Instant,
}

/// Read-through TTL cache in front of another provider
pub struct CachedPlanLimits {
    inner: Arc<dyn PlanLimitsProvider>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedPlan>>,
}

impl CachedPlanLimits {
    pub fn new(inner: Arc<dyn PlanLimitsProvider>, ttl: Duration) -> Self {
        Self { inner, ttl, cache: RwLock::new(HashMap::new()) }
    }

    fn cached(&self, organization_id: &str) -> Option<PlanLimits> {
        let cache = self.cache.read().ok()?;
        cache
            .get(organization_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.limits.clone())
    }

    /// Forget every cached plan
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

#[async_trait]
impl PlanLimitsProvider for CachedPlanLimits {
    async fn plan_limits(&self, organization_id: &str) -> Result<PlanLimits> {
        if let Some(limits) = self.cached(organization_id) {
            return Ok(limits);
        }

        debug!("Plan cache miss for organization {}", organization_id);
        let limits = self.inner.plan_limits(organization_id).await?;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                organization_id.to_string(),
                CachedPlan { limits: limits.clone(), fetched_at: Instant::now() },
            );
        }

        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::types::Channel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlanLimitsProvider for CountingProvider {
        async fn plan_limits(&self, _organization_id: &str) -> Result<PlanLimits> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PlanLimits::new([Channel::Email, Channel::Slack]))
        }
    }

    #[tokio::test]
    async fn test_static_plans_fall_back() {
        let plans = StaticPlanLimits::default()
            .with_plan("pro-org", PlanLimits::new(Channel::ALL));

        assert!(plans.plan_limits("pro-org").await.unwrap().allows(Channel::Webhook));
        assert_eq!(plans.plan_limits("free-org").await.unwrap(), PlanLimits::default());
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_lookups() {
        let inner = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let cached = CachedPlanLimits::new(inner.clone(), Duration::from_secs(60));

        cached.plan_limits("org").await.unwrap();
        cached.plan_limits("org").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        cached.plan_limits("other-org").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        cached.invalidate();
        cached.plan_limits("org").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let inner = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let cached = CachedPlanLimits::new(inner.clone(), Duration::ZERO);

        cached.plan_limits("org").await.unwrap();
        cached.plan_limits("org").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
