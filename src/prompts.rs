use crate::models::{StrategyKind, StrategyRequest};

fn directive(strategy: StrategyKind) -> &'static str {
    match strategy {
        StrategyKind::Email => {
            "Write ONLY a professional email draft. Include a subject line. Address the risk drivers directly."
        }
        StrategyKind::Call => {
            "Provide ONLY a structured 10-minute call script outline with bullet points for the conversation. Focus on resolving the risk drivers."
        }
        StrategyKind::Incentive => {
            "Suggest ONLY a specific incentive package (e.g., credits, bonuses, or tier upgrades) tailored to this partner's tier and region to prevent churn."
        }
    }
}

pub fn outreach_prompt(req: &StrategyRequest<'_>) -> String {
    let r = req.record;
    format!(r#"You are an expert Partner Relationship Manager.
A partner ({id}) has a {pct} churn risk.

Context:
- Region: {region}
- Tier: {tier}
- Risk Drivers: {drivers}

Task:
{directive}

CRITICAL RULES:
1. Output ONLY the requested {label} text.
2. Do NOT provide alternative options or introductory commentary.
3. Use the Risk Drivers ({drivers}) to make the content personalized and actionable."#,
        id = r.partner_id,
        pct = r.churn_pct(),
        region = r.region,
        tier = r.partner_tier,
        drivers = r.top_risk_drivers,
        directive = directive(req.strategy),
        label = req.strategy.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PartnerRecord, RiskTier};

    fn record() -> PartnerRecord {
        PartnerRecord {
            partner_id: "P-0042".into(),
            region: "LATAM".into(),
            partner_tier: "Platinum".into(),
            risk_tier: RiskTier::High,
            churn_probability: 0.734,
            top_risk_drivers: "Declining deal registrations; support tickets up 40%".into(),
            recommended_action: "Exec sponsor call".into(),
        }
    }

    #[test]
    fn every_strategy_embeds_the_record() {
        let r = record();
        for strategy in [StrategyKind::Email, StrategyKind::Call, StrategyKind::Incentive] {
            let p = outreach_prompt(&StrategyRequest { record: &r, strategy });
            assert!(p.contains("P-0042"), "{:?}", strategy);
            assert!(p.contains("LATAM"));
            assert!(p.contains("Platinum"));
            assert!(p.contains("73.4%"));
            assert!(p.contains("Declining deal registrations; support tickets up 40%"));
            assert!(p.contains(strategy.label()));
        }
    }

    #[test]
    fn directives_are_exclusive() {
        let r = record();
        let call = outreach_prompt(&StrategyRequest { record: &r, strategy: StrategyKind::Call });
        assert!(!call.to_lowercase().contains("email"));
        assert!(call.contains("call script outline"));

        let incentive = outreach_prompt(&StrategyRequest { record: &r, strategy: StrategyKind::Incentive });
        assert!(!incentive.to_lowercase().contains("email"));
        assert!(!incentive.contains("call script"));

        let email = outreach_prompt(&StrategyRequest { record: &r, strategy: StrategyKind::Email });
        assert!(email.contains("subject line"));
        assert!(!email.contains("call script"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let r = record();
        let req = StrategyRequest { record: &r, strategy: StrategyKind::Email };
        assert_eq!(outreach_prompt(&req), outreach_prompt(&req));
    }
}
