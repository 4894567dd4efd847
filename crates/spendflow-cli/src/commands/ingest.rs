//! Statement ingestion command

use anyhow::{Context, Result};
use spendflow_core::{IngestReport, Ledger};

pub fn cmd_ingest(ledger: &Ledger, reprocess: bool) -> Result<()> {
    let settings = ledger.settings();
    if reprocess {
        println!("📥 Reprocessing every file in {}...", settings.raw_dir.display());
    } else {
        println!("📥 Ingesting new files from {}...", settings.raw_dir.display());
    }

    let report = ledger.ingest(reprocess).context("Ingestion failed")?;

    match report {
        IngestReport::NoNewFiles => {
            println!("ℹ️  No new files to process");
        }
        IngestReport::Ingested {
            files,
            rows,
            total_rows,
            recurring,
            balance_mismatches,
        } => {
            println!("✅ Ingestion complete!");
            println!("   Files: {}", files.len());
            for file in &files {
                println!("   - {}", file);
            }
            println!("   Transactions added: {}", rows);
            println!("   Recurring: {}", recurring);
            println!("   Table size: {}", total_rows);
            if balance_mismatches > 0 {
                println!(
                    "   ⚠️  {} balance(s) don't follow from the previous transaction",
                    balance_mismatches
                );
            }
        }
    }

    Ok(())
}
