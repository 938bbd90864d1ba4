use anyhow::{anyhow, Result};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::generate::{generate_outreach, TextGenerator};
use crate::load::Dataset;
use crate::models::{StrategyKind, StrategyRequest};
use crate::out_models::TableQuery;
use crate::prompts::outreach_prompt;
use crate::render::render_generated;
use crate::session::{parse_command, Reply, Session, HELP};
use crate::stats::{heatmap, query_table, summary_metrics};
use crate::viz_export::write_all_viz;

/// Select a partner and pair it with a strategy.
pub fn outreach_request<'a>(
    dataset: &'a Dataset,
    partner_id: &str,
    strategy: StrategyKind,
) -> Result<StrategyRequest<'a>> {
    let record = dataset
        .find_partner(partner_id)
        .ok_or_else(|| anyhow!("Partner {:?} not found in {}", partner_id, dataset.path().display()))?;
    Ok(StrategyRequest { record, strategy })
}

/// One outreach draft, rendered for display. Generation failures are part of the output.
pub async fn run_outreach(req: &StrategyRequest<'_>, generator: &dyn TextGenerator) -> String {
    info!("Outreach requested - partner={}, strategy={:?}", req.record.partner_id, req.strategy);
    let prompt = outreach_prompt(req);
    let text = generate_outreach(generator, &prompt).await;
    debug!("Outreach finished - partner={}, failed={}", req.record.partner_id, text.is_error());
    render_generated(&req.record.partner_id, req.strategy, &text)
}

/// Write the dashboard bundle to `<output_dir>/<YYYY-MM-DD>/`; returns that directory.
pub fn run_dashboard(dataset: &Dataset, revenue_per_partner: f64, output_dir: &Path) -> Result<PathBuf> {
    let start = std::time::Instant::now();
    let now = Utc::now();
    let ymd = now.format("%Y-%m-%d").to_string();
    info!("Dashboard export started - date={}, partners={}", ymd, dataset.records().len());

    // 1) aggregates
    let agg_start = std::time::Instant::now();
    let metrics = summary_metrics(dataset.records(), revenue_per_partner);
    let triage = query_table(dataset.records(), &TableQuery::triage());
    let grid = heatmap(dataset.records());
    debug!(
        "Aggregates computed - duration={:.3}s, triage_rows={}, heat_cells={}",
        agg_start.elapsed().as_secs_f32(),
        triage.len(),
        grid.cells.len()
    );

    // 2) persist to date-scoped directory
    let date_dir = output_dir.join(&ymd);
    write_all_viz(
        &date_dir,
        &ymd,
        &now.to_rfc3339(),
        &dataset.path().display().to_string(),
        &metrics,
        &triage,
        &grid,
    )?;

    info!(
        "Dashboard export completed - duration={:.2}s, directory={}",
        start.elapsed().as_secs_f32(),
        date_dir.display()
    );
    Ok(date_dir)
}

/// Line-oriented interactive session; one command per interaction.
pub async fn run_console<R, W>(
    dataset: &Dataset,
    revenue_per_partner: f64,
    generator: &dyn TextGenerator,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = Session::new(dataset, revenue_per_partner);
    let mut lines = input.lines();

    write!(out, "{}", HELP)?;
    if let Some(r) = session.selected() {
        writeln!(out, "Selected {} ({})", r.partner_id, session.strategy().label())?;
    }

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{}", e)?;
                continue;
            }
        };

        match session.handle(cmd) {
            Ok(Reply::Print(text)) => write!(out, "{}", text)?,
            Ok(Reply::Generate { partner_id, strategy, prompt }) => {
                writeln!(out, "Generating {} for {}...", strategy.label(), partner_id)?;
                out.flush()?;
                let text = generate_outreach(generator, &prompt).await;
                write!(out, "{}", render_generated(&partner_id, strategy, &text))?;
            }
            Ok(Reply::Quit) => break,
            Err(e) => {
                warn!("Console command failed - error={:#}", e);
                writeln!(out, "{}", e)?;
            }
        }
    }
    debug!("Console session ended");
    Ok(())
}
