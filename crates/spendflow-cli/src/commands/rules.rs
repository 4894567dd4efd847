//! Categorization rule commands

use anyhow::Result;
use spendflow_core::Ledger;

pub fn cmd_rules_list(ledger: &Ledger) -> Result<()> {
    let rules = ledger.rules();
    if rules.is_empty() {
        println!("No categorization rules configured.");
        return Ok(());
    }

    let source = match &ledger.settings().rules_path {
        Some(path) => path.display().to_string(),
        None => "built-in".to_string(),
    };

    println!();
    println!("📋 Categorization Rules ({})", source);
    println!("   Later rules win when several match.");
    println!("   ─────────────────────────────────────────────────────────────");

    for (i, rule) in rules.rules().iter().enumerate() {
        let essential = if rule.is_essential { " [essential]" } else { "" };
        println!(
            "   {:>2}. {}{}: {}",
            i + 1,
            rule.concept,
            essential,
            rule.keywords.join(", ")
        );
    }

    Ok(())
}

pub fn cmd_rules_test(ledger: &Ledger, description: &str) -> Result<()> {
    let matching: Vec<_> = ledger
        .rules()
        .rules()
        .iter()
        .filter(|r| r.matches(description))
        .collect();

    if matching.is_empty() {
        println!("No rules match \"{}\" (concept: Others)", description);
        return Ok(());
    }

    println!();
    println!("🔍 Rules matching \"{}\":", description);
    println!("   ─────────────────────────────────────────────────────────────");
    for rule in &matching {
        println!("   {} (keywords: {})", rule.concept, rule.keywords.join(", "));
    }

    if let Some(winner) = ledger.rules().classify(description) {
        println!();
        println!(
            "   → {}{}",
            winner.concept,
            if winner.is_essential { " (essential)" } else { "" }
        );
    }

    Ok(())
}
