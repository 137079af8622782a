use serde::{Deserialize, Serialize};

use crate::model::entity::EntityRecord;
use crate::model::validation::ValidationResult;

/// Compliance counters for one scope: the whole aggregate, or one federation.
///
/// Counters only ever grow. Role-specific security and SIRTFI counters
/// count a dual-role entity once in each role bucket, so
/// `sps_has_security + idps_has_security` may exceed `total_has_security`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsAccumulator {
    pub total_entities: u64,
    pub total_sps: u64,
    pub total_idps: u64,

    pub sps_has_privacy: u64,
    pub sps_missing_privacy: u64,

    pub total_has_security: u64,
    pub total_missing_security: u64,
    pub sps_has_security: u64,
    pub sps_missing_security: u64,
    pub idps_has_security: u64,
    pub idps_missing_security: u64,

    pub total_has_sirtfi: u64,
    pub total_missing_sirtfi: u64,
    pub sps_has_sirtfi: u64,
    pub sps_missing_sirtfi: u64,
    pub idps_has_sirtfi: u64,
    pub idps_missing_sirtfi: u64,

    pub sps_has_both: u64,
    pub sps_missing_both: u64,

    pub urls_checked: u64,
    pub urls_accessible: u64,
    pub urls_broken: u64,
}

impl StatsAccumulator {
    pub fn record(&mut self, entity: &EntityRecord) {
        let roles = entity.roles;
        self.total_entities += 1;
        if roles.sp {
            self.total_sps += 1;
        }
        if roles.idp {
            self.total_idps += 1;
        }

        if roles.sp {
            if entity.has_privacy {
                self.sps_has_privacy += 1;
            } else {
                self.sps_missing_privacy += 1;
            }
        }

        if entity.has_security {
            self.total_has_security += 1;
            if roles.sp {
                self.sps_has_security += 1;
            }
            if roles.idp {
                self.idps_has_security += 1;
            }
        } else {
            self.total_missing_security += 1;
            if roles.sp {
                self.sps_missing_security += 1;
            }
            if roles.idp {
                self.idps_missing_security += 1;
            }
        }

        if entity.has_sirtfi {
            self.total_has_sirtfi += 1;
            if roles.sp {
                self.sps_has_sirtfi += 1;
            }
            if roles.idp {
                self.idps_has_sirtfi += 1;
            }
        } else {
            self.total_missing_sirtfi += 1;
            if roles.sp {
                self.sps_missing_sirtfi += 1;
            }
            if roles.idp {
                self.idps_missing_sirtfi += 1;
            }
        }

        if roles.sp {
            match (entity.has_privacy, entity.has_security) {
                (true, true) => self.sps_has_both += 1,
                (false, false) => self.sps_missing_both += 1,
                _ => {}
            }
        }
    }

    pub fn record_validation(&mut self, result: &ValidationResult) {
        self.urls_checked += 1;
        if result.accessible {
            self.urls_accessible += 1;
        } else {
            self.urls_broken += 1;
        }
    }

    /// SPs with exactly one of privacy statement and security contact.
    pub fn sps_partial_compliance(&self) -> u64 {
        self.total_sps
            .saturating_sub(self.sps_has_both)
            .saturating_sub(self.sps_missing_both)
    }

    pub fn sp_privacy_coverage(&self) -> f64 {
        percent(self.sps_has_privacy, self.total_sps)
    }

    pub fn security_coverage(&self) -> f64 {
        percent(self.total_has_security, self.total_entities)
    }

    pub fn sirtfi_coverage(&self) -> f64 {
        percent(self.total_has_sirtfi, self.total_entities)
    }
}

/// Percentage of `part` in `whole`, 0.0 for an empty whole.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::Roles;

    fn entity(sp: bool, idp: bool, privacy: bool, security: bool, sirtfi: bool) -> EntityRecord {
        EntityRecord {
            entity_id: "https://e.example.org".to_string(),
            roles: Roles { sp, idp },
            has_privacy: privacy,
            privacy_url: privacy.then(|| "https://e.example.org/privacy".to_string()),
            has_security: security,
            has_sirtfi: sirtfi,
            ..Default::default()
        }
    }

    #[test]
    fn privacy_is_only_counted_for_sps() {
        let mut stats = StatsAccumulator::default();
        stats.record(&entity(false, true, true, false, false));
        assert_eq!(stats.sps_has_privacy, 0);
        assert_eq!(stats.sps_missing_privacy, 0);
        assert_eq!(stats.total_idps, 1);
    }

    #[test]
    fn dual_role_entity_is_counted_in_both_role_buckets() {
        let mut stats = StatsAccumulator::default();
        stats.record(&entity(true, true, false, true, true));
        assert_eq!(stats.total_entities, 1);
        assert_eq!(stats.total_sps, 1);
        assert_eq!(stats.total_idps, 1);
        assert_eq!(stats.total_has_security, 1);
        assert_eq!(stats.sps_has_security, 1);
        assert_eq!(stats.idps_has_security, 1);
        assert_eq!(stats.sps_has_sirtfi, 1);
        assert_eq!(stats.idps_has_sirtfi, 1);
    }

    #[test]
    fn roleless_entity_only_touches_totals() {
        let mut stats = StatsAccumulator::default();
        stats.record(&entity(false, false, true, false, false));
        assert_eq!(stats.total_entities, 1);
        assert_eq!(stats.total_missing_security, 1);
        assert_eq!(stats.total_missing_sirtfi, 1);
        assert_eq!(stats.sps_missing_security + stats.idps_missing_security, 0);
    }

    #[test]
    fn combined_compliance_and_partial() {
        let mut stats = StatsAccumulator::default();
        stats.record(&entity(true, false, true, true, false));
        stats.record(&entity(true, false, false, false, false));
        stats.record(&entity(true, false, true, false, false));
        stats.record(&entity(true, false, false, true, false));
        assert_eq!(stats.sps_has_both, 1);
        assert_eq!(stats.sps_missing_both, 1);
        assert_eq!(stats.sps_partial_compliance(), 2);
        assert_eq!(stats.sps_has_privacy + stats.sps_missing_privacy, stats.total_sps);
    }

    #[test]
    fn percent_of_empty_whole_is_zero() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
