//! Replica-based cluster classification.

use pulsarwatch_core::{ClusterStatus, ReplicaCounts, Tier, Verdict};

/// Classify the cluster from desired and ready instance counts.
///
/// Per tier, offline is `desired - ready`. A deployed tier with no ready
/// instance, or a zookeeper ensemble without a majority, takes the whole
/// cluster down. Any other shortfall is a degradation. Tiers with zero
/// desired replicas are not deployed and never affect the status.
pub fn evaluate_replicas(desired: &ReplicaCounts, ready: &ReplicaCounts) -> (String, Verdict) {
    let mut verdict = Verdict {
        status: ClusterStatus::Ok,
        ..Verdict::default()
    };
    let mut problems = Vec::new();

    for tier in Tier::ALL {
        let want = desired.get(tier);
        let have = ready.get(tier);
        let offline = want.saturating_sub(have);
        verdict.set_offline(tier, offline);

        if want == 0 {
            continue;
        }

        let status = if have == 0 {
            problems.push(format!("{tier} has no ready instances ({want} desired)"));
            ClusterStatus::TotalDown
        } else if tier == Tier::Zookeeper && have <= want / 2 {
            problems.push(format!("zookeeper lost quorum ({have}/{want} ready)"));
            ClusterStatus::TotalDown
        } else if offline > 0 {
            problems.push(format!("{tier} has {offline} of {want} instances offline"));
            ClusterStatus::Degraded
        } else {
            ClusterStatus::Ok
        };
        verdict.status = verdict.status.max(status);
    }

    let description = if problems.is_empty() {
        "cluster is healthy".to_string()
    } else {
        problems.join("; ")
    };
    (description, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(zookeeper: u32, bookkeeper: u32, broker: u32, proxy: u32) -> ReplicaCounts {
        ReplicaCounts {
            zookeeper,
            bookkeeper,
            broker,
            proxy,
        }
    }

    #[test]
    fn all_ready_is_ok() {
        let (desc, verdict) = evaluate_replicas(&counts(3, 3, 3, 2), &counts(3, 3, 3, 2));
        assert_eq!(verdict.status, ClusterStatus::Ok);
        assert_eq!(desc, "cluster is healthy");
        assert_eq!(verdict.broker_offline, 0);
    }

    #[test]
    fn partial_outage_is_degraded() {
        let (desc, verdict) = evaluate_replicas(&counts(3, 4, 3, 2), &counts(3, 3, 2, 2));
        assert_eq!(verdict.status, ClusterStatus::Degraded);
        assert_eq!(verdict.bookkeeper_offline, 1);
        assert_eq!(verdict.broker_offline, 1);
        assert!(desc.contains("bookkeeper has 1 of 4 instances offline"));
        assert!(desc.contains("broker has 1 of 3 instances offline"));
    }

    #[test]
    fn tier_without_ready_instances_is_total_down() {
        let (desc, verdict) = evaluate_replicas(&counts(3, 3, 3, 2), &counts(3, 3, 3, 0));
        assert_eq!(verdict.status, ClusterStatus::TotalDown);
        assert_eq!(verdict.proxy_offline, 2);
        assert!(desc.contains("proxy has no ready instances"));
    }

    #[test]
    fn zookeeper_without_quorum_is_total_down() {
        let (_, verdict) = evaluate_replicas(&counts(3, 3, 3, 2), &counts(1, 3, 3, 2));
        assert_eq!(verdict.status, ClusterStatus::TotalDown);
        assert_eq!(verdict.zookeeper_offline, 2);

        let (_, verdict) = evaluate_replicas(&counts(3, 3, 3, 2), &counts(2, 3, 3, 2));
        assert_eq!(verdict.status, ClusterStatus::Degraded);
    }

    #[test]
    fn worst_tier_wins() {
        let (_, verdict) = evaluate_replicas(&counts(3, 3, 3, 2), &counts(3, 2, 0, 2));
        assert_eq!(verdict.status, ClusterStatus::TotalDown);
        assert_eq!(verdict.bookkeeper_offline, 1);
        assert_eq!(verdict.broker_offline, 3);
    }

    #[test]
    fn undeployed_tiers_are_ignored() {
        let (_, verdict) = evaluate_replicas(&counts(3, 3, 3, 0), &counts(3, 3, 3, 0));
        assert_eq!(verdict.status, ClusterStatus::Ok);
    }

    #[test]
    fn extra_ready_instances_do_not_underflow() {
        let (_, verdict) = evaluate_replicas(&counts(3, 3, 3, 2), &counts(3, 3, 5, 2));
        assert_eq!(verdict.status, ClusterStatus::Ok);
        assert_eq!(verdict.broker_offline, 0);
    }
}
