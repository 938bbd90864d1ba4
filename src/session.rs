use anyhow::{anyhow, bail, Result};
use tracing::debug;

use crate::load::Dataset;
use crate::models::{PartnerRecord, StrategyKind, StrategyRequest};
use crate::out_models::TableQuery;
use crate::prompts::outreach_prompt;
use crate::render::{render_heatmap_text, render_partner, render_partner_ids, render_summary, render_table};
use crate::stats::{heatmap, query_table, summary_metrics};

pub const HELP: &str = "Commands:
  partners              list partner ids
  select <ID>           pick a partner for analysis
  strategy <KIND>       email | call | incentive
  show                  deep dive on the selected partner
  prompt                print the prompt that would be sent
  generate              draft outreach for the selected partner
  summary | table | heatmap
  help | quit
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Partners,
    Select(String),
    Strategy(StrategyKind),
    Show,
    Prompt,
    Generate,
    Summary,
    Table,
    Heatmap,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.collect::<Vec<_>>().join(" ");

    let cmd = match head.to_ascii_lowercase().as_str() {
        "partners" | "ls" => Command::Partners,
        "select" | "use" => {
            if arg.is_empty() {
                bail!("usage: select <PARTNER_ID>");
            }
            Command::Select(arg)
        }
        "strategy" => Command::Strategy(arg.parse().map_err(|e: String| anyhow!(e))?),
        "show" => Command::Show,
        "prompt" => Command::Prompt,
        "generate" | "go" => Command::Generate,
        "summary" => Command::Summary,
        "table" | "triage" => Command::Table,
        "heatmap" => Command::Heatmap,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command {:?}; type `help`", other),
    };
    Ok(Some(cmd))
}

/// What the console should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Print(String),
    Generate { partner_id: String, strategy: StrategyKind, prompt: String },
    Quit,
}

/// Holds the user's current selection over a borrowed dataset.
pub struct Session<'a> {
    dataset: &'a Dataset,
    selected: Option<&'a PartnerRecord>,
    strategy: StrategyKind,
    revenue_per_partner: f64,
}

impl<'a> Session<'a> {
    pub fn new(dataset: &'a Dataset, revenue_per_partner: f64) -> Self {
        Self {
            dataset,
            // the selector starts on the first partner
            selected: dataset.records().first(),
            strategy: StrategyKind::Email,
            revenue_per_partner,
        }
    }

    pub fn selected(&self) -> Option<&'a PartnerRecord> {
        self.selected
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn select(&mut self, partner_id: &str) -> Result<&'a PartnerRecord> {
        let rec = self
            .dataset
            .find_partner(partner_id)
            .ok_or_else(|| anyhow!("unknown partner {:?}", partner_id))?;
        debug!("Partner selected - id={}", rec.partner_id);
        self.selected = Some(rec);
        Ok(rec)
    }

    pub fn request(&self) -> Result<StrategyRequest<'a>> {
        let record = self.selected.ok_or_else(|| anyhow!("no partner selected; use `select <ID>`"))?;
        Ok(StrategyRequest { record, strategy: self.strategy })
    }

    pub fn handle(&mut self, cmd: Command) -> Result<Reply> {
        let reply = match cmd {
            Command::Partners => Reply::Print(render_partner_ids(&self.dataset.partner_ids())),
            Command::Select(id) => {
                let rec = self.select(&id)?;
                Reply::Print(render_partner(rec))
            }
            Command::Strategy(kind) => {
                self.strategy = kind;
                Reply::Print(format!("Strategy: {}\n", kind.label()))
            }
            Command::Show => Reply::Print(render_partner(self.request()?.record)),
            Command::Prompt => Reply::Print(format!("{}\n", outreach_prompt(&self.request()?))),
            Command::Generate => {
                let req = self.request()?;
                Reply::Generate {
                    partner_id: req.record.partner_id.clone(),
                    strategy: req.strategy,
                    prompt: outreach_prompt(&req),
                }
            }
            Command::Summary => {
                Reply::Print(render_summary(&summary_metrics(self.dataset.records(), self.revenue_per_partner)))
            }
            Command::Table => Reply::Print(render_table(&query_table(self.dataset.records(), &TableQuery::triage()))),
            Command::Heatmap => Reply::Print(render_heatmap_text(&heatmap(self.dataset.records()))),
            Command::Help => Reply::Print(HELP.to_string()),
            Command::Quit => Reply::Quit,
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskTier;
    use crate::stats::DEFAULT_REVENUE_PER_PARTNER;

    fn dataset() -> Dataset {
        let rec = |id: &str, p: f64| PartnerRecord {
            partner_id: id.into(),
            region: "EMEA".into(),
            partner_tier: "Gold".into(),
            risk_tier: RiskTier::Medium,
            churn_probability: p,
            top_risk_drivers: "Fewer deal registrations".into(),
            recommended_action: "QBR".into(),
        };
        Dataset::from_records("mem.csv", vec![rec("P-1", 0.4), rec("P-2", 0.6)])
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("select P-2").unwrap(), Some(Command::Select("P-2".into())));
        assert_eq!(parse_command("strategy CALL").unwrap(), Some(Command::Strategy(StrategyKind::Call)));
        assert!(parse_command("strategy fax").is_err());
        assert!(parse_command("select").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn selection_feeds_generation() {
        let ds = dataset();
        let mut s = Session::new(&ds, DEFAULT_REVENUE_PER_PARTNER);
        assert_eq!(s.selected().unwrap().partner_id, "P-1");

        s.handle(Command::Select("P-2".into())).unwrap();
        s.handle(Command::Strategy(StrategyKind::Incentive)).unwrap();
        match s.handle(Command::Generate).unwrap() {
            Reply::Generate { partner_id, strategy, prompt } => {
                assert_eq!(partner_id, "P-2");
                assert_eq!(strategy, StrategyKind::Incentive);
                assert!(prompt.contains("60.0%"));
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn unknown_partner_keeps_previous_selection() {
        let ds = dataset();
        let mut s = Session::new(&ds, DEFAULT_REVENUE_PER_PARTNER);
        assert!(s.handle(Command::Select("P-9".into())).is_err());
        assert_eq!(s.selected().unwrap().partner_id, "P-1");
        assert_eq!(s.handle(Command::Quit).unwrap(), Reply::Quit);
    }
}
