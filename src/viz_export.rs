// src/viz_export.rs
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::{fs, path::Path};

use crate::models::PartnerRecord;
use crate::out_models::{HeatGrid, SummaryMetrics, TriageRow};
use crate::render::render_dashboard_html;

pub const VIZ_FILES: [&str; 3] = ["viz.summary.json", "viz.triage.json", "viz.heatmap.json"];

/* -------------------------------------------------------------------------- */
/* Entry point                                                                */
/* -------------------------------------------------------------------------- */

/// Write the dashboard page plus chart-ready JSONs into `out/<date>/`.
pub fn write_all_viz(
    out_dir_for_date: &Path, // e.g., out/2026-10-19
    date: &str,
    generated_at: &str,
    source: &str,
    metrics: &SummaryMetrics,
    triage: &[&PartnerRecord],
    grid: &HeatGrid,
) -> Result<()> {
    fs::create_dir_all(out_dir_for_date).with_context(|| format!("create {:?}", out_dir_for_date))?;

    // 1) Metric cards
    write_json(out_dir_for_date.join("viz.summary.json"), metrics)?;

    // 2) Triage board
    let rows: Vec<TriageRow> = triage.iter().map(|r| TriageRow::from(*r)).collect();
    write_json(out_dir_for_date.join("viz.triage.json"), &json!({ "rows": rows }))?;

    // 3) Heatmap (cells + dense matrix for plotting libraries)
    write_json(
        out_dir_for_date.join("viz.heatmap.json"),
        &json!({
            "x": grid.regions,
            "y": grid.tiers,
            "z": grid.z_matrix(),
            "cells": grid.cells,
        }),
    )?;

    // 4) Page
    let html = render_dashboard_html(generated_at, source, metrics, triage, grid);
    fs::write(out_dir_for_date.join("dashboard.html"), html)
        .with_context(|| format!("write dashboard.html into {:?}", out_dir_for_date))?;

    // 5) Per-day index
    let idx = json!({
        "date": date,
        "generated_at": generated_at,
        "version": 1,
        "counts": {
            "partners": metrics.total_partners,
            "triage": triage.len(),
            "heat_cells": grid.cells.len(),
        },
        "files": VIZ_FILES,
        "page": "dashboard.html",
    });
    write_json(out_dir_for_date.join("viz.index.json"), &idx)?;

    Ok(())
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_vec_pretty(value)?).with_context(|| format!("write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskTier;
    use crate::stats::{heatmap, summary_metrics, DEFAULT_REVENUE_PER_PARTNER};

    #[test]
    fn writes_every_file() {
        let records = vec![PartnerRecord {
            partner_id: "P-1".into(),
            region: "EMEA".into(),
            partner_tier: "Gold".into(),
            risk_tier: RiskTier::High,
            churn_probability: 0.8,
            top_risk_drivers: "Low usage".into(),
            recommended_action: "QBR".into(),
        }];
        let metrics = summary_metrics(&records, DEFAULT_REVENUE_PER_PARTNER);
        let grid = heatmap(&records);
        let triage: Vec<&PartnerRecord> = records.iter().collect();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("2026-10-19");
        write_all_viz(&out, "2026-10-19", "2026-10-19T08:00:00Z", "data.csv", &metrics, &triage, &grid).unwrap();

        for f in VIZ_FILES.iter().chain(["viz.index.json", "dashboard.html"].iter()) {
            assert!(out.join(f).exists(), "missing {}", f);
        }

        let idx: serde_json::Value = serde_json::from_slice(&fs::read(out.join("viz.index.json")).unwrap()).unwrap();
        assert_eq!(idx["counts"]["partners"], 1);

        let heat: serde_json::Value = serde_json::from_slice(&fs::read(out.join("viz.heatmap.json")).unwrap()).unwrap();
        assert_eq!(heat["x"][0], "EMEA");
        assert_eq!(heat["z"][0][0], 0.8);
    }
}
