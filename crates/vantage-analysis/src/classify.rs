//! Per-domain censorship classification.
//!
//! [`CENSORSHIP_RULES`] is evaluated in order and the first rule whose
//! predicate holds decides the class; a domain no rule claims is
//! [`CensorshipClass::Normal`]. The result depends only on the five inputs
//! carried by [`CensorshipInput`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use vantage_core::{CensorshipClass, DiffLabel, DomainSummary, EnrichedSummary, HttpOutcome, VantageComparison};

use crate::tally::Tally;

/// Category bucket for adult, social and streaming sites
pub const SOCIAL_STREAMING: &str = "Social & Streaming";

/// Category bucket for rights groups and NGOs
pub const CIVIL_SOCIETY: &str = "Civil Society & NGOs";

/// Prefix shared by all government categories
pub const GOVERNMENT_PREFIX: &str = "Government";

/// Subcategory keywords that mark content commonly blocked by policy
pub const POLICY_KEYWORDS: [&str; 3] = ["adult", "porn", "torrent"];

/// Apps known to be banned nationally
pub const BANNED_APPS: [&str; 4] = ["tiktok.com", "telegram.org", "snapchat.com", "xvideos.com"];

/// Evidence the classifier sees for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CensorshipInput<'a> {
    /// Domain name
    pub domain: &'a str,
    /// Category bucket
    pub category: &'a str,
    /// Free-text subcategory
    pub subcategory: &'a str,
    /// Most frequent local outcome
    pub local_outcome: Option<HttpOutcome>,
    /// External feed failure rate in `0.0..=1.0`
    pub failure_rate: f64,
    /// Cross-vantage label, `unknown` without a comparison
    pub diff: DiffLabel,
    /// Any local row ever showed a block page
    pub blockpage_seen: bool,
}

/// An ordered classification rule.
#[derive(Clone, Copy)]
pub struct CensorshipRule {
    /// Class assigned when the predicate holds
    pub class: CensorshipClass,
    /// Predicate over the evidence
    pub applies: fn(&CensorshipInput<'_>) -> bool,
}

/// Rules in evaluation order.
pub const CENSORSHIP_RULES: [CensorshipRule; 4] = [
    CensorshipRule {
        class: CensorshipClass::PolicyBlocked,
        applies: policy_blocked,
    },
    CensorshipRule {
        class: CensorshipClass::AppBanPartial,
        applies: app_ban_partial,
    },
    CensorshipRule {
        class: CensorshipClass::RightsOrgSuspect,
        applies: rights_org_suspect,
    },
    CensorshipRule {
        class: CensorshipClass::InfraFlaky,
        applies: infra_flaky,
    },
];

fn policy_blocked(input: &CensorshipInput<'_>) -> bool {
    let subcategory = input.subcategory.to_lowercase();
    input.category == SOCIAL_STREAMING
        && POLICY_KEYWORDS.iter().any(|k| subcategory.contains(k))
        && (input.failure_rate >= 0.9
            || input.local_outcome.is_some_and(|o| o.is_blockpage())
            || input.blockpage_seen
            || input.diff == DiffLabel::IndiaBlockpageRemoteOk)
}

fn app_ban_partial(input: &CensorshipInput<'_>) -> bool {
    BANNED_APPS.contains(&input.domain) && (0.2..0.9).contains(&input.failure_rate)
}

fn rights_org_suspect(input: &CensorshipInput<'_>) -> bool {
    input.category == CIVIL_SOCIETY
        && (input.failure_rate > 0.0 || input.diff.is_local_suspicious() || input.blockpage_seen)
}

fn infra_flaky(input: &CensorshipInput<'_>) -> bool {
    input.category.starts_with(GOVERNMENT_PREFIX)
        && matches!(
            input.local_outcome,
            Some(HttpOutcome::Timeout | HttpOutcome::ConnectionError)
        )
        && input.failure_rate == 0.0
}

/// First matching rule's class, [`CensorshipClass::Normal`] otherwise
#[must_use]
pub fn classify_domain(input: &CensorshipInput<'_>) -> CensorshipClass {
    CENSORSHIP_RULES
        .iter()
        .find(|rule| (rule.applies)(input))
        .map_or(CensorshipClass::Normal, |rule| rule.class)
}

/// Attach diff labels and censorship classes to every summary row.
///
/// Domains missing from `comparisons` (or all of them, when there is no
/// comparison) get [`DiffLabel::Unknown`].
#[must_use]
pub fn enrich(
    summaries: Vec<DomainSummary>,
    comparisons: Option<&[VantageComparison]>,
    blockpage_seen: &BTreeSet<String>,
) -> Vec<EnrichedSummary> {
    let mut diffs: BTreeMap<&str, DiffLabel> = BTreeMap::new();
    for c in comparisons.unwrap_or_default() {
        diffs.entry(c.domain.as_str()).or_insert(c.vantage_diff_flag);
    }

    summaries
        .into_iter()
        .map(|summary| {
            let diff = diffs.get(summary.domain.as_str()).copied().unwrap_or_default();
            let class = classify_domain(&CensorshipInput {
                domain: &summary.domain,
                category: &summary.category,
                subcategory: &summary.subcategory,
                local_outcome: summary.local_http_outcome,
                failure_rate: summary.feed_failure_rate,
                diff,
                blockpage_seen: blockpage_seen.contains(&summary.domain),
            });
            debug!(domain = %summary.domain, %diff, %class, "classified");
            EnrichedSummary::from_summary(summary, diff, class)
        })
        .collect()
}

/// Count of each class, most frequent first
#[must_use]
pub fn class_counts(enriched: &[EnrichedSummary]) -> Vec<(CensorshipClass, usize)> {
    enriched
        .iter()
        .map(|e| e.censorship_class)
        .collect::<Tally<_>>()
        .ranked()
}
