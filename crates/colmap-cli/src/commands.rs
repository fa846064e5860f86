use std::io;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use colmap_approval::{RejectReason, ReviewOutcome, ScriptedReviewer, review_channel};
use colmap_audit::{AuditLog, JsonlAuditSink};
use colmap_cli::review::serve_desk;
use colmap_cli::summary::{
    execution_table, mapping_overview, mapping_table, risk_report, sample_table, schema_table,
};
use colmap_core::{ApprovalDecision, IntegrationConfig, Session, SuggestedMapping, Workflow};
use colmap_exec::SqlVariant;
use colmap_ingest::{build_snapshot, sample};
use colmap_model::TablePair;
use colmap_warehouse::{Catalog, MemoryWarehouse};
use tracing::{info, info_span, warn};

use crate::cli::{Cli, PairArgs, RunArgs, SampleArgs, SchemaArgs};

/// How a `run` ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Rejected,
}

struct Environment {
    warehouse: MemoryWarehouse,
    config: IntegrationConfig,
}

fn open_environment(cli: &Cli) -> Result<Environment> {
    let config = IntegrationConfig::load(cli.config.as_deref()).context("load config")?;
    let catalog_path = cli
        .catalog
        .as_deref()
        .ok_or_else(|| anyhow!("no warehouse catalog given; pass --catalog <PATH>"))?;
    let catalog = Catalog::load(catalog_path)
        .with_context(|| format!("load catalog {}", catalog_path.display()))?;
    info!(project = catalog.project_id.as_str(), "catalog loaded");
    Ok(Environment {
        warehouse: MemoryWarehouse::new(catalog),
        config,
    })
}

fn open_audit(config: &IntegrationConfig) -> Result<AuditLog> {
    match config.audit_path() {
        Some(path) => {
            let sink = JsonlAuditSink::open(&path)
                .with_context(|| format!("open audit log {}", path.display()))?;
            info!(path = %path.display(), "audit log opened");
            Ok(AuditLog::new(sink))
        }
        None => {
            warn!("no audit log location available; events are kept in memory only");
            Ok(AuditLog::in_memory().0)
        }
    }
}

pub fn run_schema(cli: &Cli, args: &SchemaArgs) -> Result<()> {
    let env = open_environment(cli)?;
    let snapshot = build_snapshot(&env.warehouse, &args.dataset)
        .with_context(|| format!("read schema of {}", args.dataset))?;
    println!(
        "Dataset: {}.{} ({} tables)",
        snapshot.project_id,
        snapshot.dataset_id,
        snapshot.table_count()
    );
    println!("{}", schema_table(&snapshot));
    Ok(())
}

pub fn run_sample(cli: &Cli, args: &SampleArgs) -> Result<()> {
    let env = open_environment(cli)?;
    let rows = sample(&env.warehouse, &args.dataset, &args.table, args.limit)
        .with_context(|| format!("sample {}.{}", args.dataset, args.table))?;
    if rows.rows.is_empty() {
        println!("{}.{} has no rows", args.dataset, args.table);
    } else {
        println!("{}", sample_table(&rows));
    }
    Ok(())
}

pub fn run_suggest(cli: &Cli, args: &PairArgs) -> Result<()> {
    let env = open_environment(cli)?;
    let mut workflow = Workflow::new(&env.warehouse, env.config.clone(), open_audit(&env.config)?);
    let mut session = Session::new();
    let pair = TablePair::new(&args.source_table, &args.target_table);

    workflow
        .load_schemas(&mut session)
        .context("load schemas")?;
    let suggestion = workflow
        .suggest(&mut session, &pair)
        .with_context(|| format!("suggest mappings for {pair}"))?;
    print_suggestion(&workflow, suggestion);
    Ok(())
}

pub fn run_pipeline(cli: &Cli, args: &RunArgs) -> Result<RunStatus> {
    let env = open_environment(cli)?;
    let mut workflow = Workflow::new(&env.warehouse, env.config.clone(), open_audit(&env.config)?);
    let mut session = Session::new();
    let pair = TablePair::new(&args.pair.source_table, &args.pair.target_table);
    let span = info_span!("run", session = %session.id(), %pair);
    let _guard = span.enter();

    workflow
        .load_schemas(&mut session)
        .context("load schemas")?;
    let suggestion = workflow
        .suggest(&mut session, &pair)
        .with_context(|| format!("suggest mappings for {pair}"))?;
    print_suggestion(&workflow, suggestion);

    let timeout = args.review_timeout.map(Duration::from_secs);
    let decision = if args.yes {
        workflow.request_approval(&mut session, &pair, &ScriptedReviewer::approve_all(), timeout)
    } else {
        review_at_console(&mut workflow, &mut session, &pair, timeout)
    }
    .context("request approval")?;

    if let ReviewOutcome::Rejected { reason, note } = &decision.outcome {
        match note {
            Some(note) => println!("Mappings rejected ({}): {note}", reason.as_str()),
            None => println!("Mappings rejected ({}).", reason.as_str()),
        }
        return Ok(RunStatus::Rejected);
    }
    println!("Mappings approved.");

    let sql = workflow
        .generate_sql(&mut session, &pair)
        .context("generate SQL")?;
    for warning in &sql.sql_validation.warnings {
        println!("warning: {warning}");
    }
    let variant = if args.merge {
        SqlVariant::Merge
    } else {
        SqlVariant::Insert
    };
    if args.show_sql {
        println!("\n{}\n", variant.statement(sql).trim_end());
    }

    let mut reports = vec![
        workflow
            .execute(&session, &pair, variant, true)
            .context("dry run")?,
    ];
    if args.execute {
        reports.push(
            workflow
                .execute(&session, &pair, variant, false)
                .context("execute")?,
        );
    }
    println!("{}", execution_table(&reports));
    for report in &reports {
        println!("{}", report.message());
    }
    if !args.execute {
        println!("Nothing was written; pass --execute to run the statement.");
    }
    Ok(RunStatus::Completed)
}

/// Serves the review on stdin from a helper thread while this thread waits.
fn review_at_console(
    workflow: &mut Workflow<'_>,
    session: &mut Session,
    pair: &TablePair,
    timeout: Option<Duration>,
) -> colmap_model::Result<ApprovalDecision> {
    let (broker, desk) = review_channel();
    let console = thread::spawn(move || serve_desk(&desk, io::stdin().lock(), io::stdout()));
    let decision = workflow.request_approval(session, pair, &broker, timeout);
    drop(broker);

    let timed_out = matches!(
        &decision,
        Ok(ApprovalDecision {
            outcome: ReviewOutcome::Rejected {
                reason: RejectReason::TimedOut,
                ..
            },
            ..
        })
    );
    // A timed-out prompt is still blocked on stdin; leave it behind.
    if !timed_out {
        match console.join() {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "console reviewer failed"),
            Err(_) => warn!("console reviewer panicked"),
        }
    }
    decision
}

fn print_suggestion(workflow: &Workflow<'_>, suggestion: &SuggestedMapping) {
    let set = &suggestion.set;
    println!("{}", mapping_overview(set));
    println!(
        "{}",
        mapping_table(set, &workflow.config().confidence_thresholds())
    );
    if let Some(validation) = &set.validation {
        println!("Guardrail: {}", validation.validation_error);
    }
    println!("{}", suggestion.confidence.recommendation.message());
    println!("{}", risk_report(&suggestion.risk));
}
