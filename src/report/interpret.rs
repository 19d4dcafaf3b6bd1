//! Label → risk category and gauge position.

use crate::domain::Profile;

/// Returned for labels outside a profile's table.
pub const UNKNOWN_RISK_LEVEL: &str = "Unknown Risk Level";

/// Fixed label table for one profile, ordered from least to most risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskTable {
    entries: &'static [(i64, &'static str)],
}

const DIRECT_TABLE: RiskTable = RiskTable {
    entries: &[(1, "Low Risk"), (2, "Medium Risk"), (3, "High Risk")],
};

const EXPANDED_TABLE: RiskTable = RiskTable {
    entries: &[
        (0, "Very Low Risk of Default"),
        (1, "Low Risk of Default"),
        (2, "Moderate Risk of Default"),
        (3, "High Risk of Default"),
    ],
};

impl RiskTable {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Direct => DIRECT_TABLE,
            Profile::Expanded => EXPANDED_TABLE,
        }
    }

    pub fn contains(&self, label: i64) -> bool {
        self.entries.iter().any(|(l, _)| *l == label)
    }

    /// Category text for `label`. Total: unknown labels map to [`UNKNOWN_RISK_LEVEL`].
    pub fn category(&self, label: i64) -> &'static str {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
            .unwrap_or(UNKNOWN_RISK_LEVEL)
    }

    /// Gauge position in `0..=100`.
    ///
    /// The k-th of n known labels sits at `k * 100 / (n - 1)`. Any other label
    /// takes the position of the highest known label below it (0 if none), which
    /// keeps the mapping monotonic over all integers.
    pub fn severity(&self, label: i64) -> u8 {
        let n = self.entries.len();
        if n <= 1 {
            return 0;
        }
        let Some(k) = self.entries.iter().rposition(|(l, _)| *l <= label) else {
            return 0;
        };
        (k * 100 / (n - 1)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_categories() {
        let t = RiskTable::for_profile(Profile::Direct);
        assert_eq!(t.category(1), "Low Risk");
        assert_eq!(t.category(2), "Medium Risk");
        assert_eq!(t.category(3), "High Risk");
        assert_eq!(t.category(0), UNKNOWN_RISK_LEVEL);
        assert_eq!(t.category(4), UNKNOWN_RISK_LEVEL);
    }

    #[test]
    fn interpreter_is_total() {
        for profile in Profile::ALL {
            let t = RiskTable::for_profile(profile);
            for label in [i64::MIN, -7, -1, 0, 1, 2, 3, 4, 99, i64::MAX] {
                let c = t.category(label);
                assert_eq!(t.contains(label), c != UNKNOWN_RISK_LEVEL);
            }
        }
    }

    #[test]
    fn severity_breakpoints() {
        let direct = RiskTable::for_profile(Profile::Direct);
        assert_eq!([1, 2, 3].map(|l| direct.severity(l)), [0, 50, 100]);

        let expanded = RiskTable::for_profile(Profile::Expanded);
        assert_eq!([0, 1, 2, 3].map(|l| expanded.severity(l)), [0, 33, 66, 100]);
    }

    #[test]
    fn severity_is_monotonic_and_bounded() {
        for profile in Profile::ALL {
            let t = RiskTable::for_profile(profile);
            let mut prev = 0u8;
            for label in -20..20 {
                let s = t.severity(label);
                assert!(s <= 100);
                assert!(s >= prev, "{profile:?}: severity dropped at label {label}");
                prev = s;
            }
            assert_eq!(t.severity(i64::MIN), 0);
            assert_eq!(t.severity(i64::MAX), 100);
        }
    }
}
