use super::executor::CheckOutcome;
use super::regions::RegionResult;
use super::types::MonitorStatus;

/// Anything that contributes to an overall site status
pub trait StatusSample {
    /// Whether the check got a protocol-level response
    fn succeeded(&self) -> bool;

    fn status(&self) -> MonitorStatus;
}

impl StatusSample for RegionResult {
    fn succeeded(&self) -> bool {
        self.check.success
    }

    fn status(&self) -> MonitorStatus {
        self.status
    }
}

impl StatusSample for CheckOutcome {
    fn succeeded(&self) -> bool {
        self.result.success
    }

    fn status(&self) -> MonitorStatus {
        self.status
    }
}

impl StatusSample for (bool, MonitorStatus) {
    fn succeeded(&self) -> bool {
        self.0
    }

    fn status(&self) -> MonitorStatus {
        self.1
    }
}

/// Reduce per-region or per-dimension results to one site status.
///
/// The branches are evaluated in order. The majority rule compares against
/// half of the successful results, not of the requested ones.
pub fn aggregate<T: StatusSample>(results: &[T]) -> MonitorStatus {
    let total_successful = results.iter().filter(|r| r.succeeded()).count();
    let offline_count = results.iter().filter(|r| r.status() == MonitorStatus::Offline).count();
    let degraded_count = results.iter().filter(|r| r.status() == MonitorStatus::Degraded).count();

    if total_successful == 0 {
        return MonitorStatus::Offline;
    }

    if offline_count == total_successful {
        return MonitorStatus::Offline;
    }

    if offline_count > total_successful / 2 {
        return MonitorStatus::Offline;
    }

    if degraded_count > 0 || offline_count > 0 {
        return MonitorStatus::Degraded;
    }

    MonitorStatus::Online
}

#[cfg(test)]
mod tests {
    use super::*;
    use MonitorStatus::*;

    #[test]
    fn test_no_results_is_offline() {
        let results: Vec<(bool, MonitorStatus)> = Vec::new();
        assert_eq!(aggregate(&results), Offline);
    }

    #[test]
    fn test_nothing_succeeded_is_offline() {
        assert_eq!(aggregate(&[(false, Offline), (false, Offline)]), Offline);
    }

    #[test]
    fn test_single_offline_among_three_is_degraded() {
        assert_eq!(aggregate(&[(true, Online), (true, Online), (true, Offline)]), Degraded);
    }

    #[test]
    fn test_all_online() {
        assert_eq!(aggregate(&[(true, Online), (true, Online)]), Online);
    }

    #[test]
    fn test_degraded_region_degrades_site() {
        assert_eq!(aggregate(&[(true, Online), (true, Degraded), (true, Online)]), Degraded);
    }

    #[test]
    fn test_offline_equal_to_successful_is_offline() {
        // Both regions answered, both with 5xx
        assert_eq!(aggregate(&[(true, Offline), (true, Offline)]), Offline);
    }

    #[test]
    fn test_majority_uses_successful_count() {
        // 4 successful, 3 offline: 3 > 4 / 2
        let results = [
            (true, Online),
            (true, Offline),
            (true, Offline),
            (false, Offline),
            (true, Online),
        ];
        assert_eq!(aggregate(&results), Offline);

        // 2 successful, 1 offline: 1 > 2 / 2 is false
        assert_eq!(aggregate(&[(true, Online), (true, Online), (false, Offline)]), Degraded);
    }

    #[test]
    fn test_integer_truncated_half() {
        // 3 successful, 2 offline: 2 > 1
        assert_eq!(aggregate(&[(true, Offline), (true, Offline), (true, Online)]), Offline);
    }
}
