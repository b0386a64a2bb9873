//! Replay an interaction script against a markup file
//!
//! ```text
//! fos-ui-replay [--config ui.json] page.html focus:#sizes key:ArrowDown key:Enter submit:#order
//! ```
//!
//! Prints the submissions and every list box's final state as JSON.

use anyhow::{Context, Result, bail};
use fos_ui::{Replay, Step, Ui, UiConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1).peekable();
    let config = if args.peek().map(String::as_str) == Some("--config") {
        args.next();
        let Some(path) = args.next() else {
            bail!("--config needs a path");
        };
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {path}"))?;
        UiConfig::from_json(&json)?
    } else {
        UiConfig::default()
    };

    let Some(page) = args.next() else {
        bail!("usage: fos-ui-replay [--config ui.json] <page.html> <step>...");
    };
    let html = std::fs::read_to_string(&page).with_context(|| format!("reading {page}"))?;
    let steps = args
        .map(|arg| arg.parse::<Step>())
        .collect::<Result<Vec<_>, _>>()?;

    let ui = Ui::from_markup(&html, config)?;
    tracing::info!("Replaying {} steps against {}", steps.len(), page);

    let mut replay = Replay::new(&ui);
    replay.run_all(&steps)?;
    let report = replay.finish();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
