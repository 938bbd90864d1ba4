use serde::Serialize;
use tabled::Tabled;

use crate::models::{format_pct, PartnerRecord, RiskTier};

/* Metric cards */
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryMetrics {
    pub total_partners: usize,
    pub high_risk_partners: usize,
    pub avg_churn_probability: f64,
    pub revenue_at_risk: f64, // simulated: high_risk_partners * revenue_per_partner
}

/* Heatmap */
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeatCell {
    pub region: String,
    pub partner_tier: String,
    pub mean_churn: f64,
    pub partners: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeatGrid {
    pub regions: Vec<String>, // x axis, sorted
    pub tiers: Vec<String>,   // y axis, sorted
    pub cells: Vec<HeatCell>,
}

impl HeatGrid {
    pub fn cell(&self, region: &str, tier: &str) -> Option<&HeatCell> {
        self.cells.iter().find(|c| c.region == region && c.partner_tier == tier)
    }

    /// Row-major z matrix (tiers x regions); `None` where no partner exists.
    pub fn z_matrix(&self) -> Vec<Vec<Option<f64>>> {
        self.tiers
            .iter()
            .map(|t| self.regions.iter().map(|r| self.cell(r, t).map(|c| c.mean_churn)).collect())
            .collect()
    }
}

/* Triage table */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Churn,
    PartnerId,
    Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub tiers: Vec<RiskTier>, // empty = every tier
    pub region: Option<String>,
    pub partner_tier: Option<String>,
    pub sort: SortKey,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl TableQuery {
    /// HIGH and MEDIUM partners, riskiest first.
    pub fn triage() -> Self {
        Self {
            tiers: vec![RiskTier::High, RiskTier::Medium],
            region: None,
            partner_tier: None,
            sort: SortKey::Churn,
            descending: true,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct TriageRow {
    #[tabled(rename = "Partner")]
    pub partner_id: String,
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Tier")]
    pub partner_tier: String,
    #[tabled(rename = "Risk")]
    pub risk_tier: RiskTier,
    #[tabled(rename = "Risk Probability", display_with = "display_probability")]
    pub churn_probability: f64,
    #[tabled(rename = "Primary Risk Factors")]
    pub top_risk_drivers: String,
    #[tabled(rename = "Recommendation")]
    pub recommended_action: String,
}

fn display_probability(p: &f64) -> String {
    format!("{:.2} ({})", p, format_pct(*p, 0))
}

impl From<&PartnerRecord> for TriageRow {
    fn from(r: &PartnerRecord) -> Self {
        Self {
            partner_id: r.partner_id.clone(),
            region: r.region.clone(),
            partner_tier: r.partner_tier.clone(),
            risk_tier: r.risk_tier,
            churn_probability: r.churn_probability,
            top_risk_drivers: r.top_risk_drivers.clone(),
            recommended_action: r.recommended_action.clone(),
        }
    }
}
