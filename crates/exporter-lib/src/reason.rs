//! Wait-reason classification
//!
//! TeamCity wait reasons are free text and frequently embed build-specific
//! detail (agent names, resource names, counts). Classification reduces them
//! to a key that stays stable across builds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Substituted for builds reporting no wait reason at all
pub const DEFAULT_REASON: &str = "There are no compatible or available agents for this build";

/// Key produced in closed mode for reasons outside the named set
pub const OTHER_REASON: &str = "other";

/// A single normalization step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonRule {
    /// Keep the text before the first `:`
    StripAfterColon,
    /// Keep the text before the first `,`
    StripAfterComma,
    /// Remove quoted spans, quotes included, while two quotes remain
    StripQuotedSpans,
}

impl ReasonRule {
    pub fn apply(self, reason: &str) -> String {
        match self {
            ReasonRule::StripAfterColon => before(reason, ':').to_string(),
            ReasonRule::StripAfterComma => before(reason, ',').to_string(),
            ReasonRule::StripQuotedSpans => strip_quoted_spans(reason),
        }
    }
}

/// Current rule list, applied in order
pub const REASON_RULES_V3: [ReasonRule; 3] = [
    ReasonRule::StripAfterColon,
    ReasonRule::StripAfterComma,
    ReasonRule::StripQuotedSpans,
];

fn before(reason: &str, separator: char) -> &str {
    reason.split(separator).next().unwrap_or_default()
}

fn strip_quoted_spans(reason: &str) -> String {
    let mut reason = reason.to_string();
    while let Some(open) = reason.find('"') {
        let Some(len) = reason[open + 1..].find('"') else {
            break;
        };
        let close = open + 1 + len;
        reason.replace_range(open..=close, "");
    }
    reason
}

/// Apply [`REASON_RULES_V3`] to a raw reason, substituting `default_reason`
/// when it is empty
pub fn normalize(raw: &str, default_reason: &str) -> String {
    let reason = if raw.is_empty() { default_reason } else { raw };
    REASON_RULES_V3
        .iter()
        .fold(reason.to_string(), |acc, rule| rule.apply(&acc))
}

/// Named reasons recognised in closed mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitReason {
    NoCompatibleAgents,
    NoIdleAgents,
    Dependencies,
    SharedResource,
    Other,
}

impl WaitReason {
    const NAMED: [(WaitReason, &'static str); 4] = [
        (
            WaitReason::NoCompatibleAgents,
            "There are no compatible or available agents",
        ),
        (
            WaitReason::NoIdleAgents,
            "There are no idle compatible agents",
        ),
        (
            WaitReason::Dependencies,
            "Build dependencies have not been built yet",
        ),
        (
            WaitReason::SharedResource,
            "Build is waiting for the following resource",
        ),
    ];

    /// Match an already normalized reason against the named prefixes
    pub fn from_normalized(reason: &str) -> Self {
        Self::NAMED
            .iter()
            .find(|(_, prefix)| reason.starts_with(prefix))
            .map(|(named, _)| *named)
            .unwrap_or(WaitReason::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitReason::NoCompatibleAgents => "no_compatible_agents",
            WaitReason::NoIdleAgents => "no_idle_agents",
            WaitReason::Dependencies => "dependencies",
            WaitReason::SharedResource => "shared_resource",
            WaitReason::Other => OTHER_REASON,
        }
    }
}

/// Label cardinality policy for wait reasons
///
/// Parsed case-insensitively, both from strings and when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ReasonMode {
    /// Normalized free text, one label value per distinct reason prefix
    #[default]
    Prefix,
    /// Four named reasons plus `other`
    Closed,
}

impl FromStr for ReasonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prefix" => Ok(ReasonMode::Prefix),
            "closed" => Ok(ReasonMode::Closed),
            other => Err(format!(
                "unknown reason mode '{}', expected 'prefix' or 'closed'",
                other
            )),
        }
    }
}

impl TryFrom<String> for ReasonMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ReasonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonMode::Prefix => f.write_str("prefix"),
            ReasonMode::Closed => f.write_str("closed"),
        }
    }
}

/// Turns raw wait reasons into label values
#[derive(Debug, Clone)]
pub struct ReasonClassifier {
    mode: ReasonMode,
    default_reason: String,
}

impl Default for ReasonClassifier {
    fn default() -> Self {
        Self::new(ReasonMode::default(), DEFAULT_REASON)
    }
}

impl ReasonClassifier {
    pub fn new(mode: ReasonMode, default_reason: impl Into<String>) -> Self {
        Self {
            mode,
            default_reason: default_reason.into(),
        }
    }

    pub fn mode(&self) -> ReasonMode {
        self.mode
    }

    pub fn default_reason(&self) -> &str {
        &self.default_reason
    }

    /// Classification key for a raw wait reason
    pub fn classify(&self, raw: &str) -> String {
        let normalized = normalize(raw, &self.default_reason);
        match self.mode {
            ReasonMode::Prefix => normalized,
            ReasonMode::Closed => WaitReason::from_normalized(&normalized).as_str().to_string(),
        }
    }
}
