//! Derived per-domain verdicts.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// How two vantages' outcomes for one domain relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLabel {
    /// Both vantages reached the domain
    BothSuccess,
    /// Local side saw a block page, remote side succeeded
    IndiaBlockpageRemoteOk,
    /// Local side failed without a block page, remote side succeeded
    IndiaBlockedRemoteOk,
    /// Local side succeeded, remote side failed
    RemoteBlockedIndiaOk,
    /// Neither vantage reached the domain
    BothBad,
    /// Local side succeeded, remote side saw a block page
    RemoteBlockpageIndiaOk,
    /// No rule matched
    Other,
    /// No comparison was available for the domain
    #[default]
    Unknown,
}

impl DiffLabel {
    /// Every label, in declaration order
    pub const ALL: [Self; 8] = [
        Self::BothSuccess,
        Self::IndiaBlockpageRemoteOk,
        Self::IndiaBlockedRemoteOk,
        Self::RemoteBlockedIndiaOk,
        Self::BothBad,
        Self::RemoteBlockpageIndiaOk,
        Self::Other,
        Self::Unknown,
    ];

    /// Stable label used in stores and reports
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BothSuccess => "both_success",
            Self::IndiaBlockpageRemoteOk => "india_blockpage_remote_ok",
            Self::IndiaBlockedRemoteOk => "india_blocked_remote_ok",
            Self::RemoteBlockedIndiaOk => "remote_blocked_india_ok",
            Self::BothBad => "both_bad",
            Self::RemoteBlockpageIndiaOk => "remote_blockpage_india_ok",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Labels where the local vantage looks interfered with while the remote is fine
    #[must_use]
    pub const fn is_local_suspicious(&self) -> bool {
        matches!(self, Self::IndiaBlockedRemoteOk | Self::IndiaBlockpageRemoteOk)
    }
}

impl std::fmt::Display for DiffLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == needle)
            .ok_or_else(|| CoreError::unknown("diff label", s))
    }
}

/// Final per-domain censorship verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CensorshipClass {
    /// Adult/torrent content with strong blocking evidence
    PolicyBlocked,
    /// Known banned app with partial feed failures
    AppBanPartial,
    /// Civil-society site with any interference signal
    RightsOrgSuspect,
    /// Government site failing locally while the feed is clean
    InfraFlaky,
    /// Nothing noteworthy
    #[default]
    Normal,
}

impl CensorshipClass {
    /// Every class, in rule order
    pub const ALL: [Self; 5] = [
        Self::PolicyBlocked,
        Self::AppBanPartial,
        Self::RightsOrgSuspect,
        Self::InfraFlaky,
        Self::Normal,
    ];

    /// Stable label used in stores and reports
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyBlocked => "policy_blocked",
            Self::AppBanPartial => "app_ban_partial",
            Self::RightsOrgSuspect => "rights_org_suspect",
            Self::InfraFlaky => "infra_flaky",
            Self::Normal => "normal",
        }
    }
}

impl std::fmt::Display for CensorshipClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CensorshipClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| CoreError::unknown("censorship class", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_labels_parse_their_own_labels() {
        for label in DiffLabel::ALL {
            assert_eq!(label.as_str().parse::<DiffLabel>(), Ok(label));
        }
    }

    #[test]
    fn default_diff_label_is_unknown() {
        assert_eq!(DiffLabel::default(), DiffLabel::Unknown);
    }

    #[test]
    fn suspicious_labels() {
        assert!(DiffLabel::IndiaBlockedRemoteOk.is_local_suspicious());
        assert!(DiffLabel::IndiaBlockpageRemoteOk.is_local_suspicious());
        assert!(!DiffLabel::RemoteBlockedIndiaOk.is_local_suspicious());
    }

    #[test]
    fn censorship_classes_parse_their_own_labels() {
        for class in CensorshipClass::ALL {
            assert_eq!(class.as_str().parse::<CensorshipClass>(), Ok(class));
        }
        assert!("blocked".parse::<CensorshipClass>().is_err());
    }
}
