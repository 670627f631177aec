//! Diagnostic CLI: run a warmup sweep and list every window the bridge
//! could resolve, with its id, owning pid and observed title. Useful for
//! checking what the brute-force enumerator can reach on a given machine,
//! including windows parked on inactive Spaces.

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "axbridge", about = "Warm the accessibility handle cache and list resolved windows")]
struct Args {
    /// Warm only this pid instead of all running processes.
    #[arg(long)]
    pid: Option<i32>,

    /// Per-process probe budget in milliseconds.
    #[arg(long, default_value_t = 50)]
    budget_ms: u64,

    /// Upper bound of the element-id space probed per process.
    #[arg(long, default_value_t = 2000)]
    max_element_id: u64,

    /// Simultaneous per-process probe tasks.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Only list windows whose title contains this substring.
    #[arg(long)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    run(args).await
}

#[cfg(not(target_os = "macos"))]
async fn run(_args: Args) -> Result<()> {
    anyhow::bail!("the accessibility bridge requires macOS")
}

#[cfg(target_os = "macos")]
async fn run(args: Args) -> Result<()> {
    use anyhow::Context;
    use axbridge::WarmupScheduler;
    use axbridge_core::api::WindowOwnerResolver;
    use axbridge_core::platform::{MacPlatform, MacProcessDirectory, MacWindowOwners};
    use axbridge_core::WarmupConfig;
    use std::sync::Arc;
    use std::time::Duration;

    let platform = Arc::new(
        MacPlatform::new().context("accessibility API unavailable in this session")?,
    );
    let owners = Arc::new(MacWindowOwners);
    let config = WarmupConfig {
        max_element_id: args.max_element_id,
        probe_budget: Duration::from_millis(args.budget_ms),
        max_concurrent: args.concurrency,
        ..WarmupConfig::default()
    };
    let scheduler = WarmupScheduler::new(
        platform,
        Arc::new(MacProcessDirectory),
        owners.clone(),
        config,
    );

    let budget = Duration::from_millis(args.budget_ms);
    let stats = match args.pid {
        Some(pid) => {
            scheduler
                .warm_pid_range(pid..pid + 1, budget, args.concurrency)
                .await
        }
        None => {
            scheduler
                .warm_all_running_processes(budget, args.concurrency)
                .await
        }
    };

    if scheduler.cache().is_empty() {
        tracing::warn!(
            "no windows resolved — is the accessibility permission granted to this terminal?"
        );
    }

    println!("{:<40} {:>10} {:>8}", "Title", "Window ID", "PID");
    println!("{}", "-".repeat(60));

    let mut rows: Vec<(u32, String, Option<i32>)> = scheduler
        .cache()
        .handles_snapshot()
        .into_iter()
        .map(|(id, _)| {
            let title = scheduler.cache().title(id).unwrap_or_default();
            (id, title, owners.owner_pid(id))
        })
        .collect();
    rows.sort_by_key(|(id, _, _)| *id);

    let mut listed = 0;
    for (id, title, pid) in rows {
        if let Some(ref filter) = args.title {
            if !title.to_lowercase().contains(&filter.to_lowercase()) {
                continue;
            }
        }
        let mut shown = title;
        if shown.chars().count() > 40 {
            shown = shown.chars().take(37).collect();
            shown.push_str("...");
        }
        let pid = pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into());
        println!("{:<40} {:>10} {:>8}", shown, id, pid);
        listed += 1;
    }

    println!(
        "\n{} windows listed ({} processes scanned, {} handles cached)",
        listed, stats.processes_scanned, stats.handles_cached
    );
    Ok(())
}
