use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::PartnerRecord;
use crate::models::RiskTier;
use crate::out_models::{HeatCell, HeatGrid, SortKey, SummaryMetrics, TableQuery};

/// Placeholder dollars-at-risk per HIGH partner; not a validated model.
pub const DEFAULT_REVENUE_PER_PARTNER: f64 = 5200.0;

/// Revenue multiplier from the command line: finite and not negative.
pub fn parse_revenue(s: &str) -> Result<f64, String> {
    let v: f64 = s.trim().parse().map_err(|e| format!("{:?} is not a number: {}", s, e))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("{:?} must be a finite, non-negative amount", s));
    }
    Ok(v)
}

pub fn summary_metrics(records: &[PartnerRecord], revenue_per_partner: f64) -> SummaryMetrics {
    let total = records.len();
    let high = records.iter().filter(|r| r.risk_tier == RiskTier::High).count();
    let avg = if total == 0 {
        0.0
    } else {
        records.iter().map(|r| r.churn_probability).sum::<f64>() / total as f64
    };
    SummaryMetrics {
        total_partners: total,
        high_risk_partners: high,
        avg_churn_probability: avg,
        revenue_at_risk: high as f64 * revenue_per_partner,
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Filter then stable-sort; ties keep file order.
pub fn query_table<'a>(records: &'a [PartnerRecord], q: &TableQuery) -> Vec<&'a PartnerRecord> {
    let mut rows: Vec<&PartnerRecord> = records
        .iter()
        .filter(|r| q.tiers.is_empty() || q.tiers.contains(&r.risk_tier))
        .filter(|r| q.region.as_deref().map_or(true, |want| eq_ignore_case(&r.region, want)))
        .filter(|r| q.partner_tier.as_deref().map_or(true, |want| eq_ignore_case(&r.partner_tier, want)))
        .collect();

    rows.sort_by(|a, b| {
        let ord = match q.sort {
            SortKey::Churn => a
                .churn_probability
                .partial_cmp(&b.churn_probability)
                .unwrap_or(Ordering::Equal),
            SortKey::PartnerId => a.partner_id.cmp(&b.partner_id),
            SortKey::Region => a.region.cmp(&b.region),
        };
        if q.descending { ord.reverse() } else { ord }
    });

    if let Some(n) = q.limit {
        rows.truncate(n);
    }
    rows
}

/// Mean churn per (region, partner tier).
pub fn heatmap(records: &[PartnerRecord]) -> HeatGrid {
    let mut groups: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
    for r in records {
        let e = groups.entry((r.region.as_str(), r.partner_tier.as_str())).or_insert((0.0, 0));
        e.0 += r.churn_probability;
        e.1 += 1;
    }

    let cells: Vec<HeatCell> = groups
        .into_iter()
        .map(|((region, tier), (sum, n))| HeatCell {
            region: region.to_string(),
            partner_tier: tier.to_string(),
            mean_churn: sum / n as f64,
            partners: n,
        })
        .collect();

    let regions = cells.iter().map(|c| c.region.clone()).sorted().dedup().collect();
    let tiers = cells.iter().map(|c| c.partner_tier.clone()).sorted().dedup().collect();

    HeatGrid { regions, tiers, cells }
}
