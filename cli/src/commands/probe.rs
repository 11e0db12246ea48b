use std::sync::Arc;
use std::time::{Duration, Instant};

use accord_common::discovery::ResultBatch;
use accord_common::network::target::{self, Target};
use accord_core::engine::{NegotiationEngine, NegotiationResult, Outcome};
use accord_core::network::tcp::TcpBackend;
use colored::*;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::NegotiationArgs;
use crate::inventory::{InventoryCallback, TerminalSink};
use crate::terminal::{colors, print, spinner};

pub async fn probe(target: Target, options: &NegotiationArgs) -> anyhow::Result<()> {
    let addresses = target::to_addresses(target)?;
    let store = Arc::new(options.load_store()?);
    let backend = Arc::new(TcpBackend::new(store.clone()));
    let sink = Arc::new(TerminalSink::default());
    let engine = NegotiationEngine::new(options.engine_config(), store, backend, sink.clone());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, finishing the current attempt");
                cancel.cancel();
            }
        })
    };

    spinner::start("negotiating...");
    let start_time = Instant::now();
    let result = engine.run(&addresses, &InventoryCallback, &cancel).await;
    spinner::finish();
    interrupt.abort();

    let result = result?;
    report(&result, sink.take(), start_time.elapsed());
    Ok(())
}

fn report(result: &NegotiationResult, batches: Vec<ResultBatch>, total_time: Duration) {
    if result.cancelled {
        warn!("run was cancelled before every attempt was made");
    }

    match result.outcome() {
        Outcome::Connected => print_inventory(result, &batches),
        Outcome::Cancelled => print::no_results("cancelled before any session was negotiated"),
        Outcome::NothingToTry => {
            print::no_results("no credential matched any address; add a [[credential]] entry for them")
        }
        Outcome::AuthenticationFailed => {
            print::no_results("every credential was rejected; check usernames and passwords")
        }
        Outcome::AuthorizationDenied { privileges } if privileges.is_empty() => {
            print::no_results("logged in but lacked privileges; grant the account read access")
        }
        Outcome::AuthorizationDenied { privileges } => print::no_results(&format!(
            "logged in but lacked privileges; grant {}",
            privileges.join(", ")
        )),
        Outcome::Failed => print::no_results("no attempt completed; see the errors above"),
    }

    print::fat_separator();
    let summary = format!(
        "{} of {} attempts connected in {}, {} errors, {} warnings",
        result.success_count().to_string().bold().green(),
        result.attempted.len().to_string().bold(),
        format!("{:.2}s", total_time.as_secs_f64()).bold().yellow(),
        result.errors().count().to_string().red(),
        result.warnings().count().to_string().color(colors::WARNING),
    );
    print::centerln(&summary);
}

fn print_inventory(result: &NegotiationResult, batches: &[ResultBatch]) {
    print::header("negotiated sessions");
    for (idx, ctx) in result.successes().into_iter().enumerate() {
        let attempt = ctx.attempt();
        print::tree_head(idx, attempt.address.as_str());

        let mut details: Vec<(String, ColoredString)> = vec![
            ("Endpoint".into(), attempt.endpoint.to_string().normal()),
            ("Login".into(), attempt.credential.to_string().normal()),
        ];
        if let Some(peer) = ctx.peer() {
            details.push(("Reports".into(), format!("{} {}", peer.version, peer.peer_type).normal()));
        }
        if let Some(module) = ctx.capability() {
            details.push(("Module".into(), module.to_string().color(colors::ACCENT)));
        }
        for batch in batches.iter().filter(|b| &b.source == attempt) {
            for item in &batch.items {
                let value = item
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<String>>()
                    .join(" ");
                details.push((item.kind.clone(), value.normal()));
            }
        }
        print::as_tree_one_level(details);
    }
    info!("{} peer(s) inventoried", batches.len());
}
