//! Run command implementation.

use super::script::{self, Report};
use relstore_core::Store;
use std::path::Path;

/// Runs the run command.
pub fn run(path: &Path, format: &str, keep_going: bool) -> Result<(), Box<dyn std::error::Error>> {
    let script = script::load(path)?;
    let store = Store::new();
    let report = script::execute(&store, &script, keep_going)?;

    // Output
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

fn print_text_output(report: &Report) {
    println!("RelStore Script Run");
    println!("===================");
    println!();
    println!("Operations applied: {}", report.applied);
    if !report.failures.is_empty() {
        println!("Operations failed:  {}", report.failures.len());
        for failure in &report.failures {
            println!("  [{}] {}: {}", failure.index, failure.operation, failure.error);
        }
    }

    for collection in &report.collections {
        println!();
        match &collection.primary_key {
            Some(pk) => println!(
                "{} (key: {}, {} entities)",
                collection.name,
                pk,
                collection.entities.len()
            ),
            None => println!("{} ({} entities)", collection.name, collection.entities.len()),
        }
        for entity in &collection.entities {
            println!("  {}", entity.to_value());
        }
    }

    let stats = &report.stats;
    println!();
    println!("Statistics:");
    println!("  Inserts:               {}", stats.inserts);
    println!("  Updates:               {}", stats.updates);
    println!("  Deletes:               {}", stats.deletes);
    println!("  Cascaded deletes:      {}", stats.cascaded_deletes);
    println!("  Truncations:           {}", stats.truncations);
    println!("  Index lookups:         {}", stats.index_lookups);
    println!("  Scans:                 {}", stats.scans);
    println!("  Triggers fired:        {}", stats.triggers_fired);
    println!("  Constraint violations: {}", stats.constraint_violations);
}
