use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker prepended to every failed generation so the UI can show it inline.
pub const WARNING_MARKER: &str = "⚠️ AI Error: ";

/// One row of the churn dashboard export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerRecord {
    #[serde(rename = "Partner_ID")]
    pub partner_id: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Partner_Tier")]
    pub partner_tier: String,
    pub risk_tier: RiskTier,
    pub churn_probability: f64, // [0.0, 1.0]
    #[serde(rename = "Top_Risk_Drivers")]
    pub top_risk_drivers: String,
    #[serde(rename = "Recommended_Action")]
    pub recommended_action: String,
}

impl PartnerRecord {
    /// Churn probability as a one-decimal percentage, e.g. `0.734` -> `73.4%`.
    pub fn churn_pct(&self) -> String {
        format_pct(self.churn_probability, 1)
    }
}

pub fn format_pct(p: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, p * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::High => "HIGH",
            RiskTier::Medium => "MEDIUM",
            RiskTier::Low => "LOW",
        }
    }
}

impl TryFrom<String> for RiskTier {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::str::FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(RiskTier::High),
            "MEDIUM" => Ok(RiskTier::Medium),
            "LOW" => Ok(RiskTier::Low),
            other => Err(format!("unknown risk tier {:?} (expected HIGH, MEDIUM or LOW)", other)),
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which outreach artifact to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Email,
    Call,
    Incentive,
}

impl StrategyKind {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Email => "Email Draft",
            StrategyKind::Call => "Call Script",
            StrategyKind::Incentive => "Incentive Offer",
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(StrategyKind::Email),
            "call" => Ok(StrategyKind::Call),
            "incentive" => Ok(StrategyKind::Incentive),
            other => Err(format!("unknown strategy {:?} (expected email, call or incentive)", other)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A selected partner plus the artifact the user asked for. Lives for one action.
#[derive(Debug, Clone, Copy)]
pub struct StrategyRequest<'a> {
    pub record: &'a PartnerRecord,
    pub strategy: StrategyKind,
}

/// What came back from the generation service. Shown once, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedText {
    Text(String),
    Error(String),
}

impl GeneratedText {
    pub fn is_error(&self) -> bool {
        matches!(self, GeneratedText::Error(_))
    }
}

impl fmt::Display for GeneratedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedText::Text(t) => f.write_str(t),
            GeneratedText::Error(e) => write!(f, "{}{}", WARNING_MARKER, e),
        }
    }
}
