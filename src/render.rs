// src/render.rs
use serde_json::json;
use tabled::{settings::Style, Table};

use crate::models::{format_pct, GeneratedText, PartnerRecord, StrategyKind};
use crate::out_models::{HeatGrid, SummaryMetrics, TriageRow};

/// `10400.0` -> `$10,400`
pub fn format_money(amount: f64) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if whole < 0 {
        format!("-${}", out)
    } else {
        format!("${}", out)
    }
}

pub fn render_summary(m: &SummaryMetrics) -> String {
    let mut out = String::new();
    out.push_str("Partner Guard - Early Warning & Intervention\n\n");
    out.push_str(&format!("Active Partners:       {}\n", m.total_partners));
    out.push_str(&format!("High Priority Alerts:  {}\n", m.high_risk_partners));
    out.push_str(&format!("Avg Churn Risk:        {}\n", format_pct(m.avg_churn_probability, 1)));
    out.push_str(&format!("Rev. at Risk (sim.):   {}\n", format_money(m.revenue_at_risk)));
    out
}

pub fn render_table(rows: &[&PartnerRecord]) -> String {
    if rows.is_empty() {
        return "No partners match the current filters.\n".to_string();
    }
    let mut table = Table::new(rows.iter().map(|r| TriageRow::from(*r)));
    table.with(Style::rounded());
    format!("{}\n", table)
}

pub fn render_partner_ids(ids: &[&str]) -> String {
    let mut out = String::new();
    for id in ids {
        out.push_str(&format!("- {}\n", id));
    }
    out
}

pub fn render_partner(r: &PartnerRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("Analysis for {}\n", r.partner_id));
    out.push_str(&format!("- Region: {}\n", r.region));
    out.push_str(&format!("- Tier: {}\n", r.partner_tier));
    out.push_str(&format!("- Risk tier: {}\n", r.risk_tier));
    out.push_str(&format!("- Churn Probability: {}\n", r.churn_pct()));
    out.push_str(&format!("\nTop Risk Factors: {}\n", r.top_risk_drivers));
    out.push_str(&format!("Recommended Action: {}\n", r.recommended_action));
    out
}

pub fn render_heatmap_text(grid: &HeatGrid) -> String {
    if grid.cells.is_empty() {
        return "No data for heatmap.\n".to_string();
    }
    let first_w = grid.tiers.iter().map(|t| t.chars().count()).max().unwrap_or(0).max(4);
    let col_ws: Vec<usize> = grid.regions.iter().map(|r| r.chars().count().max(5)).collect();

    let mut out = String::new();
    out.push_str("Risk Concentration (mean churn probability)\n");
    out.push_str(&format!("{:<w$}", "Tier", w = first_w));
    for (r, w) in grid.regions.iter().zip(&col_ws) {
        out.push_str(&format!("  {:>w$}", r, w = *w));
    }
    out.push('\n');

    for (tier, row) in grid.tiers.iter().zip(grid.z_matrix()) {
        out.push_str(&format!("{:<w$}", tier, w = first_w));
        for (z, w) in row.iter().zip(&col_ws) {
            let cell = z.map(|v| format_pct(v, 0)).unwrap_or_else(|| "-".to_string());
            out.push_str(&format!("  {:>w$}", cell, w = *w));
        }
        out.push('\n');
    }
    out
}

pub fn render_generated(partner_id: &str, strategy: StrategyKind, text: &GeneratedText) -> String {
    let rule = "-".repeat(60);
    format!("{} for {}\n{}\n{}\n{}\n", strategy.label(), partner_id, rule, text.to_string().trim(), rule)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// JSON that cannot close the surrounding `<script>` element.
fn script_safe_json(value: &serde_json::Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn triage_rows_html(rows: &[&PartnerRecord]) -> String {
    let mut html = String::new();
    for r in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"risk-{}\">{}</td><td><progress max=\"1\" value=\"{:.4}\"></progress> {:.2}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&r.partner_id),
            escape_html(&r.region),
            escape_html(&r.partner_tier),
            r.risk_tier.as_str().to_lowercase(),
            r.risk_tier,
            r.churn_probability,
            r.churn_probability,
            escape_html(&r.top_risk_drivers),
            escape_html(&r.recommended_action),
        ));
    }
    html
}

/// Self-contained dashboard page; the heatmap is drawn with Plotly from a CDN.
pub fn render_dashboard_html(
    generated_at: &str,
    source: &str,
    metrics: &SummaryMetrics,
    triage: &[&PartnerRecord],
    grid: &HeatGrid,
) -> String {
    let z = grid.z_matrix();
    let text: Vec<Vec<String>> = z
        .iter()
        .map(|row| row.iter().map(|v| v.map(|p| format_pct(p, 0)).unwrap_or_default()).collect())
        .collect();
    let trace = json!([{
        "type": "heatmap",
        "x": grid.regions,
        "y": grid.tiers,
        "z": z,
        "text": text,
        "texttemplate": "%{text}",
        "colorscale": "Reds",
        "zmin": 0.0,
        "zmax": 1.0,
    }]);

    format!(r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Partner Guard</title>
<script src="https://cdn.plot.ly/plotly-2.35.0.min.js"></script>
<style>
body{{font-family:system-ui,-apple-system,sans-serif;max-width:1400px;margin:0 auto;padding:20px;background:#fafafa}}
h1{{color:#1a1a2e}}h2{{color:#16213e;border-bottom:1px solid #ddd;padding-bottom:5px}}
.cards{{display:flex;gap:16px}}
.metric-card{{flex:1;background:#f9f9f9;border-radius:10px;padding:20px;box-shadow:2px 2px 10px rgba(0,0,0,0.05)}}
.metric-card .v{{font-size:1.8em;font-weight:600}}
table{{border-collapse:collapse;width:100%;background:#fff}}td,th{{padding:6px 10px;border-bottom:1px solid #eee;text-align:left}}
.risk-high{{color:#c0392b;font-weight:600}}.risk-medium{{color:#d68910}}.risk-low{{color:#1e8449}}
.plot{{background:#fff;border-radius:8px;padding:10px;margin:20px 0;box-shadow:0 1px 3px rgba(0,0,0,0.1)}}
</style></head><body>
<h1>Partner Guard</h1>
<p>Advanced Early Warning &amp; Intervention System. Generated {generated_at} from <code>{source}</code>.</p>

<div class="cards">
<div class="metric-card">Active Partners<div class="v">{total}</div></div>
<div class="metric-card">High Priority Alerts<div class="v">{high}</div></div>
<div class="metric-card">Avg Churn Risk<div class="v">{avg}</div></div>
<div class="metric-card">Rev. at Risk (simulated)<div class="v">{revenue}</div></div>
</div>

<h2>Priority Action List</h2>
<table>
<tr><th>Partner</th><th>Region</th><th>Tier</th><th>Risk</th><th>Risk Probability</th><th>Primary Risk Factors</th><th>Recommendation</th></tr>
{rows}</table>

<h2>Portfolio Heatmap</h2>
<div class="plot"><div id="heatmap" style="height:480px"></div></div>

<script>
Plotly.newPlot('heatmap',{trace},{{title:'Risk Concentration',xaxis:{{title:'Region'}},yaxis:{{title:'Partner Tier'}}}});
</script>
</body></html>"#,
        generated_at = escape_html(generated_at),
        source = escape_html(source),
        total = metrics.total_partners,
        high = metrics.high_risk_partners,
        avg = format_pct(metrics.avg_churn_probability, 1),
        revenue = format_money(metrics.revenue_at_risk),
        rows = triage_rows_html(triage),
        trace = script_safe_json(&trace),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskTier;
    use crate::stats::heatmap;

    fn rec() -> PartnerRecord {
        PartnerRecord {
            partner_id: "P-7".into(),
            region: "EMEA".into(),
            partner_tier: "Gold".into(),
            risk_tier: RiskTier::High,
            churn_probability: 0.5,
            top_risk_drivers: "<script>alert(1)</script> & co".into(),
            recommended_action: "Call".into(),
        }
    }

    #[test]
    fn money_has_thousands_separators() {
        assert_eq!(format_money(0.0), "$0");
        assert_eq!(format_money(5200.0), "$5,200");
        assert_eq!(format_money(1_040_000.0), "$1,040,000");
        assert_eq!(format_money(f64::NAN), "n/a");
        assert_eq!(format_money(f64::INFINITY), "n/a");
    }

    #[test]
    fn heatmap_text_shows_whole_percentages() {
        let r = rec();
        let grid = heatmap(std::slice::from_ref(&r));
        let txt = render_heatmap_text(&grid);
        assert!(txt.contains("EMEA"));
        assert!(txt.contains("50%"));
    }

    #[test]
    fn dashboard_escapes_record_text() {
        let r = rec();
        let grid = heatmap(std::slice::from_ref(&r));
        let m = SummaryMetrics {
            total_partners: 1,
            high_risk_partners: 1,
            avg_churn_probability: 0.5,
            revenue_at_risk: 5200.0,
        };
        let html = render_dashboard_html("2026-10-19", "data.csv", &m, &[&r], &grid);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("$5,200"));
        assert!(html.contains("\"colorscale\":\"Reds\""));
    }

    #[test]
    fn dashboard_neutralises_heatmap_labels_and_source() {
        let r = PartnerRecord {
            region: "</script><img src=x onerror=alert(1)>".into(),
            partner_tier: "<b>Gold</b>".into(),
            top_risk_drivers: "Support backlog".into(),
            ..rec()
        };
        let grid = heatmap(std::slice::from_ref(&r));
        let m = SummaryMetrics {
            total_partners: 1,
            high_risk_partners: 1,
            avg_churn_probability: 0.5,
            revenue_at_risk: 5200.0,
        };
        let html = render_dashboard_html("2026-10-19", "data/<evil>.csv", &m, &[&r], &grid);

        assert!(!html.contains("</script><img"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("<b>Gold</b>"));
        assert!(!html.contains("<evil>"));
        // axis labels inside the Plotly trace
        assert!(html.contains("\\u003c/script\\u003e\\u003cimg src=x onerror=alert(1)\\u003e"));
        assert!(html.contains("\\u003cb\\u003eGold\\u003c/b\\u003e"));
        // table cells and the source path
        assert!(html.contains("&lt;/script&gt;&lt;img src=x onerror=alert(1)&gt;"));
        assert!(html.contains("data/&lt;evil&gt;.csv"));
        // only the CDN loader and the plot script close a script element
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn generated_error_is_shown_inline() {
        let out = render_generated("P-7", StrategyKind::Call, &GeneratedText::Error("boom".into()));
        assert!(out.starts_with("Call Script for P-7"));
        assert!(out.contains("⚠️ AI Error: boom"));
    }
}
