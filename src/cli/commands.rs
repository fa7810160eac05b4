use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use telesales_insights::context::KpiSnapshot;
use telesales_insights::data::{AggregateRow, AttemptBreakdown, ATTEMPT_NOT_AVAILABLE};
use telesales_insights::report::render_report;
use telesales_insights::{
    shared_datasets, AppConfig, Assistant, ConversationSession, DatasetState, InsightsError,
    ModelGateway,
};

use crate::cli::args::Layout;

const EXIT_WORDS: &[&str] = &["exit", "quit", ":q"];

fn build_assistant(config: &AppConfig) -> Result<(Assistant, DatasetState)> {
    let datasets = shared_datasets(&config.datasets);
    let gateway = ModelGateway::from_config(config.gateway.clone())?;
    Ok((Assistant::from_datasets(gateway, config, &datasets), datasets))
}

pub async fn handle_chat(config: &AppConfig, layout: Layout) -> Result<()> {
    let (assistant, datasets) = build_assistant(config)?;
    let mut session = ConversationSession::new();

    if layout == Layout::Wide {
        print_dashboard(&KpiSnapshot::default(), &datasets);
    }
    for message in session.messages() {
        println!("{}\n", message);
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"user> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if EXIT_WORDS.contains(&line) {
            break;
        }

        match assistant.ask(&mut session, line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(InsightsError::EmptyPrompt) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Session ended after {} questions.", session.user_turns());
    Ok(())
}

pub async fn handle_ask(config: &AppConfig, prompt: &[String]) -> Result<()> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err(anyhow!("Prompt is empty. Provide a question or use the chat command."));
    }

    let (assistant, _) = build_assistant(config)?;
    let mut session = ConversationSession::new();
    let reply = assistant.ask(&mut session, &prompt).await?;
    println!("{}", reply.content);
    Ok(())
}

pub fn handle_report() -> Result<()> {
    println!("{}", render_report());
    Ok(())
}

pub fn handle_stats(config: &AppConfig) -> Result<()> {
    let datasets = shared_datasets(&config.datasets);
    let Some(loaded) = datasets.datasets() else {
        if let DatasetState::Unavailable { reason } = &datasets {
            println!("Datasets unavailable: {reason}");
        }
        return Ok(());
    };

    println!(
        "Loaded: {} calls, {} orders, {} leads, {} campaigns",
        loaded.calls.len(),
        loaded.orders.len(),
        loaded.leads.len(),
        loaded.campaigns.len()
    );

    let Some(aggregates) =
        telesales_insights::assistant::aggregates_for(&datasets, &config.datasets.call_schema)
    else {
        println!("Call statistics unavailable: required columns are missing.");
        return Ok(());
    };

    print_rows("Calls per agent", &aggregates.by_agent);
    print_rows("Calls per campaign", &aggregates.by_campaign);
    match &aggregates.by_attempt {
        AttemptBreakdown::Available(rows) => print_rows("Calls per attempt number", rows),
        AttemptBreakdown::NotAvailable => {
            println!("\nCalls per attempt number\n  {ATTEMPT_NOT_AVAILABLE}")
        }
    }
    Ok(())
}

fn print_rows(title: &str, rows: &[AggregateRow]) {
    println!("\n{title}");
    let width = rows.iter().map(|r| r.key.len()).max().unwrap_or(0);
    for row in rows {
        println!("  {:<width$}  {:>8}", row.key, row.count, width = width);
    }
}

fn print_dashboard(kpis: &KpiSnapshot, datasets: &DatasetState) {
    for section in &kpis.sections {
        println!("{}", section.title);
        for figure in &section.figures {
            println!("  {:<28} {}", figure.label, figure.value);
        }
        println!();
    }
    match datasets {
        DatasetState::Loaded(d) => println!("Datasets: {} call records loaded\n", d.calls.len()),
        DatasetState::Unavailable { .. } => println!("Datasets: not loaded\n"),
    }
}
