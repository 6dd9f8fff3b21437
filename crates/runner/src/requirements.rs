//! Named environmental requirements gating task execution.
//!
//! A fixed table maps requirement names to predicates. Unknown names are
//! always unmet, and a predicate that fails internally reports unmet
//! rather than aborting the run. Tests swap predicates in via
//! [`RequirementSet::register`] instead of monkey-patching.

use std::{collections::BTreeMap, net::SocketAddr, time::Duration};

use {async_trait::async_trait, tokio::net::TcpStream, tracing::debug};

use crate::{power, types::RERUN_ONFAIL};

/// A single boolean precondition on the host environment.
#[async_trait]
pub trait Requirement: Send + Sync {
    /// True when the environment satisfies this requirement.
    /// Implementations must swallow internal failures and report false.
    async fn satisfied(&self) -> bool;
}

/// Registry of named requirements, fixed for the lifetime of a run.
pub struct RequirementSet {
    entries: BTreeMap<String, Box<dyn Requirement>>,
}

impl RequirementSet {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in table: `internet`, `ac_power`, `battery`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut set = Self::empty();
        set.register("internet", Internet::default());
        set.register("ac_power", AcPower);
        set.register("battery", Battery);
        set
    }

    pub fn register(&mut self, name: impl Into<String>, requirement: impl Requirement + 'static) {
        self.entries.insert(name.into(), Box::new(requirement));
    }

    /// Evaluate every declared requirement, returning the unmet names in
    /// declaration order. The `rerun_onfail` control flag is not a
    /// requirement and is skipped outright.
    pub async fn unmet(&self, names: &[String]) -> Vec<String> {
        let mut unmet = Vec::new();
        for name in names {
            if name == RERUN_ONFAIL {
                continue;
            }
            let ok = match self.entries.get(name) {
                Some(requirement) => requirement.satisfied().await,
                None => {
                    debug!(name, "unknown requirement");
                    false
                }
            };
            if !ok {
                unmet.push(name.clone());
            }
        }
        unmet
    }
}

/// TCP reachability probe against well-known public resolvers. Literal
/// addresses on two different ports: the probe must not itself depend on
/// DNS or any single service being up.
pub struct Internet {
    targets: Vec<SocketAddr>,
    timeout: Duration,
}

impl Default for Internet {
    fn default() -> Self {
        Self {
            targets: vec![
                SocketAddr::from(([1, 1, 1, 1], 443)),
                SocketAddr::from(([8, 8, 8, 8], 53)),
            ],
            timeout: Duration::from_secs(2),
        }
    }
}

#[async_trait]
impl Requirement for Internet {
    async fn satisfied(&self) -> bool {
        for addr in &self.targets {
            match tokio::time::timeout(self.timeout, TcpStream::connect(*addr)).await {
                Ok(Ok(_)) => return true,
                Ok(Err(error)) => debug!(%addr, %error, "internet probe failed"),
                Err(_) => debug!(%addr, "internet probe timed out"),
            }
        }
        false
    }
}

/// On external/mains power. An inconclusive probe counts as unmet.
struct AcPower;

#[async_trait]
impl Requirement for AcPower {
    async fn satisfied(&self) -> bool {
        power::ac_online().await == Some(true)
    }
}

/// Explicitly on battery power. Also unmet when the probe is
/// inconclusive, so on a host without power reporting neither `ac_power`
/// nor `battery` can ever pass.
struct Battery;

#[async_trait]
impl Requirement for Battery {
    async fn satisfied(&self) -> bool {
        power::ac_online().await == Some(false)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    #[async_trait]
    impl Requirement for Fixed {
        async fn satisfied(&self) -> bool {
            self.0
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unknown_requirement_is_unmet() {
        let set = RequirementSet::empty();
        assert_eq!(set.unmet(&names(&["no_such_thing"])).await, names(&["no_such_thing"]));
    }

    #[tokio::test]
    async fn test_rerun_onfail_is_never_evaluated() {
        let set = RequirementSet::empty();
        assert!(set.unmet(&names(&[RERUN_ONFAIL])).await.is_empty());
    }

    #[tokio::test]
    async fn test_met_and_unmet_mix_preserves_order() {
        let mut set = RequirementSet::empty();
        set.register("up", Fixed(true));
        set.register("down", Fixed(false));
        let unmet = set.unmet(&names(&["down", "up", "also_missing"])).await;
        assert_eq!(unmet, names(&["down", "also_missing"]));
    }

    #[tokio::test]
    async fn test_empty_requirement_list_is_met() {
        let set = RequirementSet::empty();
        assert!(set.unmet(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_internet_probe_against_local_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let probe = Internet {
            targets: vec![addr],
            timeout: Duration::from_millis(500),
        };
        assert!(probe.satisfied().await);
    }

    #[tokio::test]
    async fn test_internet_probe_connection_refused() {
        // Bind then drop to get a port that is almost certainly closed.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let probe = Internet {
            targets: vec![addr],
            timeout: Duration::from_millis(500),
        };
        assert!(!probe.satisfied().await);
    }
}
