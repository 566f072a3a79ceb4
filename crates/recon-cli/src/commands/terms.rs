//! Extraction term commands

use std::path::Path;

use anyhow::{Context, Result};
use recon_core::{aggregate_terms, RuleSet};

pub fn cmd_terms(rules: &Path) -> Result<()> {
    let rule_set = RuleSet::load(rules)
        .with_context(|| format!("Failed to load rules from {}", rules.display()))?;
    let terms = aggregate_terms(&rule_set.extraction_rules);

    if terms.is_empty() {
        println!("No extraction terms defined in {}.", rules.display());
        println!("Add an [[extraction_rules]] table with a `terms` list.");
        return Ok(());
    }

    println!();
    println!(
        "🏷️  Extraction Terms ({} from {} rules)",
        terms.len(),
        rule_set.extraction_rules.len()
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for term in &terms {
        println!("   {}", term);
    }

    Ok(())
}
