//! Person to team resolution.

use std::sync::Arc;

use async_trait::async_trait;
use sla_types::NO_TEAM;
use tracing::{debug, warn};

use crate::cache::CoalescingCache;
use crate::error::{EnrichError, Result};
use crate::gate::RateGate;

/// Remote provider of a person's team memberships.
#[async_trait]
pub trait TeamSource: Send + Sync {
    /// `escaped_name` is already safe to embed in a quoted query filter.
    async fn fetch_teams(&self, escaped_name: &str) -> Result<Vec<String>>;
}

/// Escape backslashes and double quotes for a quoted filter value.
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Cached, rate-limited lookup of "Team A, Team B" for a display name.
///
/// Every answer, including "-" for a person with no team, is cached for
/// the life of the process. Failed lookups return "-" and are retried on
/// the next call.
pub struct PersonTeamResolver {
    source: Arc<dyn TeamSource>,
    gate: Arc<dyn RateGate>,
    entries: CoalescingCache<String, String>,
}

impl PersonTeamResolver {
    pub fn new(source: Arc<dyn TeamSource>, gate: Arc<dyn RateGate>) -> Self {
        Self {
            source,
            gate,
            entries: CoalescingCache::new(),
        }
    }

    pub async fn resolve(&self, person: &str) -> String {
        let person = person.trim();
        let result = self
            .entries
            .get_or_try_fill(&person.to_string(), || async {
                if person.is_empty() {
                    return Ok(NO_TEAM.to_string());
                }
                self.gate.acquire().await;
                let teams = self.source.fetch_teams(&escape_filter_value(person)).await?;
                debug!(person = %person, teams = teams.len(), "Resolved person teams");
                Ok::<_, EnrichError>(join_teams(&teams))
            })
            .await;

        match result {
            Ok(teams) => teams,
            Err(e) => {
                warn!(person = %person, error = %e, "Team lookup failed");
                NO_TEAM.to_string()
            }
        }
    }

    pub async fn clear(&self) {
        self.entries.clear().await;
    }

    pub async fn len(&self) -> usize {
        self.entries.len().await
    }
}

fn join_teams(teams: &[String]) -> String {
    let names: Vec<&str> = teams
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if names.is_empty() {
        NO_TEAM.to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::NoopGate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockTeams {
        teams: HashMap<String, Vec<String>>,
        fail: AtomicBool,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TeamSource for MockTeams {
        async fn fetch_teams(&self, escaped_name: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(escaped_name.to_string());
            if self.fail.load(Ordering::SeqCst) {
                return Err(EnrichError::Parse("unexpected end of input".to_string()));
            }
            Ok(self.teams.get(escaped_name).cloned().unwrap_or_default())
        }
    }

    fn resolver(source: Arc<MockTeams>) -> PersonTeamResolver {
        PersonTeamResolver::new(source, Arc::new(NoopGate))
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("Jane Doe"), "Jane Doe");
        assert_eq!(escape_filter_value(r#"Jane "JD" Doe"#), r#"Jane \"JD\" Doe"#);
        assert_eq!(escape_filter_value(r"A\B"), r"A\\B");
    }

    #[tokio::test]
    async fn test_empty_name_short_circuits() {
        let source = Arc::new(MockTeams::default());
        let resolver = resolver(source.clone());

        assert_eq!(resolver.resolve("").await, "-");
        assert_eq!(resolver.resolve("   ").await, "-");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.len().await, 1);
    }

    #[tokio::test]
    async fn test_teams_joined_and_cached() {
        let mut source = MockTeams::default();
        source.teams.insert(
            "Jane Doe".to_string(),
            vec!["Service Desk".to_string(), "Network".to_string()],
        );
        let source = Arc::new(source);
        let resolver = resolver(source.clone());

        assert_eq!(resolver.resolve("Jane Doe").await, "Service Desk, Network");
        assert_eq!(resolver.resolve("Jane Doe").await, "Service Desk, Network");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_team_is_cached() {
        let source = Arc::new(MockTeams::default());
        let resolver = resolver(source.clone());

        assert_eq!(resolver.resolve("Nobody").await, "-");
        assert_eq!(resolver.resolve("Nobody").await, "-");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let source = Arc::new(MockTeams::default());
        source.fail.store(true, Ordering::SeqCst);
        let resolver = resolver(source.clone());

        assert_eq!(resolver.resolve("Jane Doe").await, "-");
        assert_eq!(resolver.len().await, 0);

        source.fail.store(false, Ordering::SeqCst);
        resolver.resolve("Jane Doe").await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_is_escaped() {
        let source = Arc::new(MockTeams::default());
        let resolver = resolver(source.clone());

        resolver.resolve(r#"O"Brien"#).await;
        assert_eq!(source.queries.lock().unwrap().as_slice(), [r#"O\"Brien"#]);
    }
}
