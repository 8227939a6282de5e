//! desk-runner: headless driver for the fraud-risk desk.
//!
//! Usage:
//!   desk-runner --demo
//!   desk-runner --file batch.csv --backend http://127.0.0.1:5000/api
//!   desk-runner --scored scored.csv --filter high --sort amount --desc --page 2
//!   desk-runner --sample --export ./out --db desk.db
//!   desk-runner --ipc-mode --config desk.json

use anyhow::{anyhow, Context, Result};
use riskdesk_core::{
    analysis::{FraudComparison, Provenance, RiskBucket, Statistics},
    config::DeskConfig,
    export::write_suspicious,
    session::{AcquisitionRequest, Notice, PublishOutcome, Session},
    table::{RiskFilter, SortColumn, SortDirection, TableView, ViewState},
    types::{AnalysisId, RequestId},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::path::Path;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetView,
    Sample,
    Demo,
    Upload { file_name: String, content: String },
    Scored { file_name: String, content: String },
    Sort { column: String },
    ClearSort,
    Filter { level: String },
    NextPage,
    PrevPage,
    GoToPage { page: usize },
    Export,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    latest_request:    RequestId,
    analysis_id:       Option<AnalysisId>,
    provenance:        Option<Provenance>,
    notice:            Option<String>,
    statistics:        Option<Statistics>,
    risk_distribution: Vec<RiskBucket>,
    fraud_comparison:  Option<FraudComparison>,
    view:              ViewState,
    table:             Option<TableView>,
    showing:           (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    export:            Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = has_flag(&args, "--ipc-mode");

    let mut config = match arg_value(&args, "--config") {
        Some(path) => DeskConfig::load(path)?,
        None => DeskConfig::default(),
    };
    if let Some(url) = arg_value(&args, "--backend") {
        config.scoring_url = Some(url.to_string());
    }
    if let Some(db) = arg_value(&args, "--db") {
        config.db_path = Some(db.to_string());
    }
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.page_size = parse_arg(&args, "--page-size", config.page_size);
    config.validate()?;

    let session = Session::from_config(&config)?;
    if has_flag(&args, "--resume") && session.resume_from_store()? {
        log::info!("resumed last stored analysis");
    }

    let page_size = NonZeroUsize::new(config.page_size)
        .ok_or_else(|| anyhow!("page_size must be positive"))?;
    let mut state = ViewState::with_page_size(page_size);

    if ipc_mode {
        return run_ipc_loop(&session, &mut state);
    }

    println!("Risk desk: desk-runner");
    println!("  backend:   {}", session.backend_name());
    println!("  seed:      {}", config.seed);
    println!("  db:        {}", config.db_path.as_deref().unwrap_or("(none)"));
    println!();

    let notice = if has_flag(&args, "--resume") && session.current().is_some() {
        None
    } else {
        match session.acquire(request_from_args(&args)?)? {
            PublishOutcome::Published { notice, .. } => Some(notice),
            PublishOutcome::Superseded { request_id, latest } => {
                anyhow::bail!("request {request_id} superseded by {latest}")
            }
        }
    };

    apply_view_args(&args, &session, &mut state)?;
    print_summary(&session, notice.as_ref(), &mut state)?;

    if let Some(dir) = arg_value(&args, "--export") {
        if let Some(analysis) = session.current() {
            let path = write_suspicious(&analysis.result.transactions, Path::new(dir))?;
            println!();
            println!("Exported {} suspicious transactions to {}", analysis.result.statistics.suspicious_count, path.display());
        }
    }
    Ok(())
}

fn request_from_args(args: &[String]) -> Result<AcquisitionRequest> {
    if let Some(path) = arg_value(args, "--file") {
        let (file_name, content) = read_input(path)?;
        return Ok(AcquisitionRequest::Upload { file_name, content });
    }
    if let Some(path) = arg_value(args, "--scored") {
        let (file_name, content) = read_input(path)?;
        return Ok(AcquisitionRequest::ScoredFile { file_name, content });
    }
    if has_flag(args, "--demo") {
        return Ok(AcquisitionRequest::Demo);
    }
    Ok(AcquisitionRequest::Sample)
}

fn read_input(path: &str) -> Result<(String, String)> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    Ok((file_name, content))
}

fn apply_view_args(args: &[String], session: &Session, state: &mut ViewState) -> Result<()> {
    if let Some(level) = arg_value(args, "--filter") {
        let filter = RiskFilter::parse(level).ok_or_else(|| anyhow!("Unknown risk filter: {level}"))?;
        state.set_risk_filter(filter);
    }
    if let Some(column) = arg_value(args, "--sort") {
        let column = SortColumn::parse(column).ok_or_else(|| anyhow!("Unknown sort column: {column}"))?;
        state.toggle_sort(column);
        if has_flag(args, "--desc") {
            state.toggle_sort(column);
        }
    }
    let page: usize = parse_arg(args, "--page", 1);
    if let Some(analysis) = session.current() {
        state.go_to_page(&analysis.result, page.saturating_sub(1));
    }
    Ok(())
}

fn run_ipc_loop(session: &Session, state: &mut ViewState) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut notice: Option<Notice> = None;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match handle_command(session, state, &mut notice, cmd) {
            Ok(None) => break,
            Ok(Some(export)) => {
                let ui = build_ui_state(session, notice.as_ref(), state, export);
                writeln!(stdout, "{}", serde_json::to_string(&ui)?)?;
            }
            Err(e) => write_error(&mut stdout, &e.to_string())?,
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Apply one command. Ok(None) means quit; otherwise carries the export
/// payload, if the command produced one.
fn handle_command(
    session: &Session,
    state: &mut ViewState,
    notice: &mut Option<Notice>,
    cmd: IpcCommand,
) -> Result<Option<Option<String>>> {
    let request = match cmd {
        IpcCommand::Quit => return Ok(None),
        IpcCommand::GetView => None,
        IpcCommand::Sample => Some(AcquisitionRequest::Sample),
        IpcCommand::Demo => Some(AcquisitionRequest::Demo),
        IpcCommand::Upload { file_name, content } => {
            Some(AcquisitionRequest::Upload { file_name, content })
        }
        IpcCommand::Scored { file_name, content } => {
            Some(AcquisitionRequest::ScoredFile { file_name, content })
        }
        IpcCommand::Sort { column } => {
            let column = SortColumn::parse(&column).ok_or_else(|| anyhow!("Unknown sort column: {column}"))?;
            state.toggle_sort(column);
            None
        }
        IpcCommand::ClearSort => {
            state.clear_sort();
            None
        }
        IpcCommand::Filter { level } => {
            let filter = RiskFilter::parse(&level).ok_or_else(|| anyhow!("Unknown risk filter: {level}"))?;
            state.set_risk_filter(filter);
            None
        }
        IpcCommand::NextPage => {
            if let Some(analysis) = session.current() {
                state.next_page(&analysis.result);
            }
            None
        }
        IpcCommand::PrevPage => {
            state.prev_page();
            None
        }
        IpcCommand::GoToPage { page } => {
            if let Some(analysis) = session.current() {
                state.go_to_page(&analysis.result, page.saturating_sub(1));
            }
            None
        }
        IpcCommand::Export => return Ok(Some(session.export_current()?)),
    };

    if let Some(request) = request {
        if let PublishOutcome::Published { notice: n, .. } = session.acquire(request)? {
            *notice = Some(n);
        }
    }
    Ok(Some(None))
}

fn build_ui_state(
    session: &Session,
    notice: Option<&Notice>,
    state: &mut ViewState,
    export: Option<String>,
) -> UiState {
    let current = session.current();
    let table = session.project(state);
    let showing = table
        .as_ref()
        .map(|t| t.showing_range(state.page_size))
        .unwrap_or((0, 0));

    UiState {
        latest_request:    session.latest_request_id(),
        analysis_id:       current.as_ref().map(|a| a.analysis_id.clone()),
        provenance:        current.as_ref().map(|a| a.result.provenance),
        notice:            notice.map(Notice::message),
        statistics:        current.as_ref().map(|a| a.result.statistics.clone()),
        risk_distribution: current
            .as_ref()
            .map(|a| a.result.risk_distribution.clone())
            .unwrap_or_default(),
        fraud_comparison:  current.as_ref().map(|a| a.result.fraud_comparison.clone()),
        view:              state.clone(),
        table,
        showing,
        export,
    }
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn print_summary(session: &Session, notice: Option<&Notice>, state: &mut ViewState) -> Result<()> {
    let analysis = session
        .current()
        .ok_or_else(|| anyhow!("No analysis has been published"))?;
    let result = &analysis.result;
    let stats = &result.statistics;

    println!("=== ANALYSIS SUMMARY ===");
    println!("  analysis_id:    {}", analysis.analysis_id);
    println!("  published_at:   {}", analysis.published_at.to_rfc3339());
    println!("  provenance:     {}", result.provenance);
    if let Some(notice) = notice {
        println!("  notice:         {}", notice.message());
    }
    println!("  transactions:   {}", stats.total_transactions);
    println!("  suspicious:     {}", stats.suspicious_count);
    println!("  fraud rate:     {:.1}%", stats.fraud_rate);
    println!("  total at risk:  ${:.2}", stats.total_at_risk);

    println!();
    println!("=== RISK DISTRIBUTION ===");
    for bucket in &result.risk_distribution {
        println!("  {:<9} {:>5}", bucket.level, bucket.count);
    }

    println!();
    if result.fraud_comparison.approximate {
        println!("=== FRAUD COMPARISON (approximate) ===");
    } else {
        println!("=== FRAUD COMPARISON ===");
    }
    for period in &result.fraud_comparison.periods {
        println!(
            "  {:<10} | fraudulent: {:>4} | normal: {:>4}",
            period.name, period.fraudulent, period.normal
        );
    }

    let Some(view) = session.project(state) else {
        return Ok(());
    };
    println!();
    let sort = match state.sort_column {
        Some(column) => {
            let dir = match state.sort_direction {
                SortDirection::Asc  => "asc",
                SortDirection::Desc => "desc",
            };
            format!("{column:?} {dir}")
        }
        None => "batch order".to_string(),
    };
    println!(
        "=== TRANSACTIONS (page {} of {}, {sort}) ===",
        view.page_index + 1,
        view.page_count
    );
    for txn in &view.rows {
        println!(
            "  {:<12} {:>10.2} {:>4} {:<9} {}",
            txn.id,
            txn.amount,
            txn.risk_score,
            txn.risk_level,
            txn.reasons.join("; ")
        );
    }
    let (first, last) = view.showing_range(state.page_size);
    println!("  Showing {first} to {last} of {}", view.total_filtered_count);
    Ok(())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
