//! Session bootstrap run against a seeded record service.

use anyhow::Result;
use console::style;
use hrms_core::{NotificationLevel, SessionBootstrap, SessionState};
use std::path::Path;
use std::sync::Arc;

pub fn run(root: &Path, seed: &Path, subject: Option<&str>) -> Result<()> {
    let config = super::load_config(root)?;
    let gate = Arc::new(super::gate_store(root, &config));
    let runtime = super::runtime()?;

    runtime.block_on(async {
        let wiring = super::wire(&config, seed, subject).await?;
        let boot = SessionBootstrap::new(wiring.client.clone(), gate);
        let state = boot.advance().await;

        println!("{}", style("State trace:").bold());
        for (step, entered) in boot.trace().iter().enumerate() {
            println!("  {:>2}. {}", step + 1, entered);
        }
        println!();
        print_outcome(&boot, &state);

        if let Some(report) = boot.last_invalidation() {
            println!();
            println!("{}", style("Invalidated after profile save:").bold());
            for target in &report.targets {
                println!("  {}", target);
            }
            match report.linked_employee {
                Some(id) => println!("  linked employee: {}", style(id).cyan()),
                None => println!("  linked employee: {}", style("(none)").dim()),
            }
        }

        let notes = wiring.client.notifications().drain();
        if !notes.is_empty() {
            println!();
            for note in notes {
                let marker = match note.level {
                    NotificationLevel::Success => style("✓").green(),
                    NotificationLevel::Error => style("×").red(),
                };
                println!("{} {}", marker, note.message);
            }
        }

        if let Some(err) = boot.last_error() {
            eprintln!("{} {}", style("warning:").yellow(), err);
            if let Some(hint) = err.recovery_suggestion() {
                eprintln!("{} {}", style("hint:").cyan(), hint);
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}

fn print_outcome(boot: &SessionBootstrap, state: &SessionState) {
    match state {
        SessionState::Ready {
            profile: Some(profile),
            ..
        } => {
            println!("{} Ready", style("✓").green());
            println!("  Profile: {}", profile.name);
            if !profile.email.is_empty() {
                println!("  Email: {}", profile.email);
            }
        }
        SessionState::Ready { profile: None, .. } => {
            println!("{} Ready, profile setup required", style("⚠").yellow());
            if let Some(name) = boot.suggested_name() {
                println!("  Suggested name: {}", name);
            }
        }
        SessionState::GateRequired => {
            println!("Access gate not completed. Run 'hrms gate complete <first> <last>' first.");
        }
        SessionState::LoginRequired => {
            println!("Not signed in. Pass --subject to sign in.");
        }
        other => println!("Stopped in {}", other),
    }
}
