//! Global search run against a seeded record service.

use anyhow::{Context, Result};
use console::style;
use hrms_core::{describe_result, NavigationTarget, SearchAggregator, SearchOutcome};
use std::path::Path;

pub fn run(root: &Path, seed: &Path, subject: &str, term: &str, json: bool) -> Result<()> {
    let config = super::load_config(root)?;
    let runtime = super::runtime()?;

    runtime.block_on(async {
        let wiring = super::wire(&config, seed, Some(subject)).await?;
        let search = SearchAggregator::open(wiring.client.clone(), &config.search)
            .await
            .with_context(|| format!("Search is not available to {}", subject))?;

        let view = match search.search(term).await? {
            SearchOutcome::Displayed(view) => view,
            SearchOutcome::Superseded => return Ok(()),
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&view.results)?);
            return Ok(());
        }

        let buckets = view.buckets();
        if buckets.is_empty() {
            println!("No results found.");
            return Ok(());
        }
        for (bucket, results) in buckets.sections() {
            println!("{}", style(bucket.heading()).bold());
            for result in results {
                let (label, detail) = describe_result(result);
                println!("  {}", label);
                println!("    {}", style(detail).dim());
                println!("    -> {}", style(NavigationTarget::for_result(result)).cyan());
            }
            println!();
        }
        println!(
            "{} result(s) for \"{}\"",
            style(buckets.len()).cyan(),
            view.term
        );
        Ok::<_, anyhow::Error>(())
    })
}
