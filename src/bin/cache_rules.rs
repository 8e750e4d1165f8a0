use anyhow::Result;
use campaign_cache::{config, detector::PatternTable, docs, rules::RuleMap};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let settings = config::load()?;
    let rules = RuleMap::default();
    if let Err(e) = rules.validate() {
        tracing::error!(error = %e, "rule map is incomplete");
    }

    tracing::debug!(debounce_ms = settings.debounce_ms, "documenting invalidation tables");
    print!("{}", docs::render_markdown(PatternTable::builtin(), &rules));
    println!("\nPending invalidations are flushed {} ms after the last mutation.", settings.debounce_ms);

    Ok(())
}
