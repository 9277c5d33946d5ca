//! Check command implementation.

use super::script;
use relstore_core::Store;
use std::path::Path;

/// Runs the check command.
///
/// Every operation runs even if earlier ones fail; the check passes when
/// all operations succeed and every index matches its collection.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking script {}", path.display());
    println!();

    let script = script::load(path)?;
    let store = Store::new();
    let report = script::execute(&store, &script, true)?;

    println!(
        "  {} operations, applied: {}, failed: {}",
        script.operations.len(),
        report.applied,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("    ERROR: [{}] {}: {}", failure.index, failure.operation, failure.error);
    }

    let indexes = store.verify_indexes();
    if let Err(err) = &indexes {
        println!("    ERROR: {err}");
    }

    println!();
    if report.failures.is_empty() && indexes.is_ok() {
        println!("✓ Script check passed");
        Ok(())
    } else {
        println!("✗ Script check failed");
        Err("Check failed".into())
    }
}
