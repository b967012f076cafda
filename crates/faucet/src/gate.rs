//! Per-requester admission with cooldowns.
//!
//! Each requester is Idle (no entry), Cooling (entry whose `next_eligible_time`
//! is in the future) or Eligible (entry that has expired but was not yet
//! observed). Expired entries are only dropped when the same requester asks
//! again; nothing sweeps the map in the background.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Stable identifier of whoever issued the request on the chat platform.
pub type RequesterId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub address: String,
    pub next_eligible_time: DateTime<Utc>,
}

/// Proof that a request was admitted; needed to release the entry again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub requester: RequesterId,
    pub next_eligible_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admitted(Admission),
    Cooldown { remaining: Duration },
}

#[derive(Debug)]
pub struct RequestGate {
    entries: DashMap<RequesterId, RateLimitEntry>,
    cooldown: Duration,
}

impl RequestGate {
    pub fn new(cooldown: Duration) -> Self {
        Self { entries: DashMap::new(), cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Admits or rejects in one step while holding the shard lock of `requester`.
    pub fn try_admit(&self, requester: &str, address: &str, now: DateTime<Utc>) -> GateDecision {
        let next_eligible_time = now + self.cooldown;
        let fresh = RateLimitEntry { address: address.to_string(), next_eligible_time };

        match self.entries.entry(requester.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().next_eligible_time;
                if current > now {
                    return GateDecision::Cooldown { remaining: current - now };
                }
                debug!(requester, "cooldown expired, replacing entry");
                occupied.insert(fresh);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }

        GateDecision::Admitted(Admission { requester: requester.to_string(), next_eligible_time })
    }

    /// Returns the requester to Idle, unless a newer admission replaced the entry.
    pub fn release(&self, admission: &Admission) -> bool {
        self.entries
            .remove_if(&admission.requester, |_, entry| {
                entry.next_eligible_time == admission.next_eligible_time
            })
            .is_some()
    }

    pub fn entry(&self, requester: &str) -> Option<RateLimitEntry> {
        self.entries.get(requester).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Releases its admission on drop unless [`AdmissionGuard::commit`] was called,
/// so a failed, cancelled or panicking dispatch leaves the requester Idle.
#[derive(Debug)]
pub struct AdmissionGuard {
    gate: Arc<RequestGate>,
    admission: Option<Admission>,
}

impl AdmissionGuard {
    pub fn new(gate: Arc<RequestGate>, admission: Admission) -> Self {
        Self { gate, admission: Some(admission) }
    }

    /// Keeps the entry until its cooldown expires.
    pub fn commit(mut self) {
        self.admission = None;
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        if let Some(admission) = self.admission.take() {
            if self.gate.release(&admission) {
                debug!(requester = %admission.requester, "released gate entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn admitted(decision: GateDecision) -> Admission {
        match decision {
            GateDecision::Admitted(admission) => admission,
            other => panic!("expected admission, got {other:?}"),
        }
    }

    #[test]
    fn test_idle_requester_is_admitted() {
        let gate = RequestGate::new(Duration::seconds(3600));
        let admission = admitted(gate.try_admit("u1", "cosmos1x", at(0)));
        assert_eq!(admission.next_eligible_time, at(3600));
        assert_eq!(gate.entry("u1").unwrap().address, "cosmos1x");
    }

    #[test]
    fn test_cooling_requester_is_rejected_without_mutation() {
        let gate = RequestGate::new(Duration::seconds(3600));
        admitted(gate.try_admit("u1", "cosmos1x", at(0)));

        let decision = gate.try_admit("u1", "cosmos1y", at(10));
        assert_eq!(decision, GateDecision::Cooldown { remaining: Duration::seconds(3590) });
        let entry = gate.entry("u1").unwrap();
        assert_eq!(entry.address, "cosmos1x");
        assert_eq!(entry.next_eligible_time, at(3600));
    }

    #[test]
    fn test_expired_entry_is_replaced_lazily() {
        let gate = RequestGate::new(Duration::seconds(60));
        admitted(gate.try_admit("u1", "cosmos1x", at(0)));
        assert_eq!(gate.len(), 1);

        let admission = admitted(gate.try_admit("u1", "cosmos1y", at(60)));
        assert_eq!(admission.next_eligible_time, at(120));
        assert_eq!(gate.entry("u1").unwrap().address, "cosmos1y");
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn test_requesters_are_independent() {
        let gate = RequestGate::new(Duration::seconds(60));
        admitted(gate.try_admit("u1", "cosmos1x", at(0)));
        admitted(gate.try_admit("u2", "cosmos1x", at(1)));
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn test_release_only_removes_matching_admission() {
        let gate = RequestGate::new(Duration::seconds(60));
        let stale = admitted(gate.try_admit("u1", "cosmos1x", at(0)));
        let current = admitted(gate.try_admit("u1", "cosmos1x", at(61)));

        assert!(!gate.release(&stale));
        assert!(gate.entry("u1").is_some());
        assert!(gate.release(&current));
        assert!(gate.is_empty());
    }

    #[test]
    fn test_guard_releases_unless_committed() {
        let gate = Arc::new(RequestGate::new(Duration::seconds(60)));

        let admission = admitted(gate.try_admit("u1", "cosmos1x", at(0)));
        drop(AdmissionGuard::new(gate.clone(), admission));
        assert!(gate.entry("u1").is_none());

        let admission = admitted(gate.try_admit("u1", "cosmos1x", at(1)));
        AdmissionGuard::new(gate.clone(), admission).commit();
        assert!(gate.entry("u1").is_some());
    }

    #[test]
    fn test_concurrent_admission_admits_once() {
        let gate = Arc::new(RequestGate::new(Duration::seconds(3600)));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || {
                    matches!(gate.try_admit("u1", "cosmos1x", at(0)), GateDecision::Admitted(_))
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|was_admitted| *was_admitted)
            .count();
        assert_eq!(admitted, 1);
    }
}
