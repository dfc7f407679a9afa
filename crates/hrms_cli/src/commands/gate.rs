//! Access gate commands.

use anyhow::{Context, Result};
use console::style;
use hrms_core::GateStore;
use std::path::Path;

pub fn status(root: &Path) -> Result<()> {
    let config = super::load_config(root)?;
    let store = super::gate_store(root, &config);
    let record = store.load().context("Failed to read gate record")?;

    println!("Gate file: {}", store.path().display());
    if record.completed {
        println!("  Status: {}", style("completed").green());
        match record.display_name() {
            Some(name) => println!("  Display name: {}", name),
            None => println!("  Display name: {}", style("(none)").dim()),
        }
    } else {
        println!("  Status: {}", style("not completed").yellow());
    }
    Ok(())
}

pub fn complete(root: &Path, first: &str, last: &str) -> Result<()> {
    let config = super::load_config(root)?;
    let store = super::gate_store(root, &config);
    let record = match store.complete(first, last) {
        Ok(record) => record,
        Err(err) => {
            if let Some(hint) = err.recovery_suggestion() {
                eprintln!("{} {}", style("hint:").cyan(), hint);
            }
            return Err(err).context("Failed to complete access gate");
        }
    };
    println!(
        "{} Gate completed as {}",
        style("✓").green(),
        style(&record.display_name).bold()
    );
    Ok(())
}

pub fn reset(root: &Path) -> Result<()> {
    let config = super::load_config(root)?;
    let store = super::gate_store(root, &config);
    store.reset().context("Failed to reset access gate")?;
    println!("Gate record removed from {}", store.path().display());
    Ok(())
}
