use std::fmt::Write;

use crate::{
    detector::{CampaignIdSource, PatternTable},
    rules::RuleMap,
};

/// Renders the pattern table and rule map as markdown
pub fn render_markdown(patterns: &PatternTable, rules: &RuleMap) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "## Mutation patterns\n");
    let _ = writeln!(out, "| # | Method | Path | Event | Campaign id |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for (i, spec) in patterns.specs().enumerate() {
        let source = match spec.campaign_id {
            CampaignIdSource::Path => "path",
            CampaignIdSource::ResponseBody => "response body",
            CampaignIdSource::Agnostic => "none",
        };
        let _ = writeln!(
            out,
            "| {} | {} | `{}` | {} | {} |",
            i + 1,
            spec.method,
            spec.path,
            spec.event,
            source
        );
    }

    let _ = writeln!(out, "\n## Invalidation rules\n");
    let _ = writeln!(out, "| Event | Cache kinds | On reschedule | Global list |");
    let _ = writeln!(out, "|---|---|---|---|");
    for rule in rules.rules() {
        let reschedule = if rule.reschedule_kinds.is_empty() {
            "-".to_string()
        } else {
            rule.reschedule_kinds.to_string()
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            rule.event,
            rule.kinds,
            reschedule,
            if rule.affects_global_list { "yes" } else { "no" }
        );
    }

    out
}
