mod api;
mod server;

use chrono::{Duration as ChronoDuration, Local, Utc};
use clap::{Args, Parser, Subcommand};
use focus_monitor::client::{ClientError, MonitorClient};
use focus_monitor::config::MonitorConfig;
use focus_monitor::history::{format_record_line, load_history};
use focus_monitor::readings::load_batch;
use focus_monitor::session::{Session, SessionStore};
use focus_monitor::synthetic::generate_synthetic_history;
use focus_monitor::{format_float, EngagementLevel, EngagementRecord, SensorReading, Summarizer};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "focus-monitor", about = "Student focus monitoring client")]
struct Cli {
    #[arg(long, global = true, help = "TOML config path (default config/monitor.toml)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Summarize(SummarizeArgs),
    Suggest(SuggestArgs),
    Login(LoginArgs),
    Logout,
    Register(RegisterArgs),
    Profile,
    Predict(PredictArgs),
    PredictCsv(FileArgs),
    History(HistoryArgs),
    Demo(DemoArgs),
    Replay(ReplayArgs),
    Serve(ServeArgs),
    Init(InitArgs),
}

#[derive(Args, Debug, Clone)]
struct SummarizeArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    student_id: Option<String>,
    #[arg(long)]
    details: bool,
}

#[derive(Args, Debug, Clone)]
struct SuggestArgs {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    details: bool,
}

#[derive(Args, Debug, Clone)]
struct LoginArgs {
    #[arg(long)]
    username: String,
    #[arg(long, help = "read from stdin when omitted")]
    password: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct PredictArgs {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    heart_rate: f64,
    #[arg(long)]
    skin_conductance: f64,
    #[arg(long)]
    eeg: f64,
}

#[derive(Args, Debug, Clone)]
struct FileArgs {
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct HistoryArgs {
    #[arg(long, conflicts_with = "student_id")]
    delete: Option<String>,
    #[arg(long)]
    student_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct DemoArgs {
    #[arg(long, default_value = "demo-student")]
    student_id: String,
    #[arg(long, default_value_t = 24)]
    count: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long)]
    details: bool,
}

#[derive(Args, Debug, Clone)]
struct ReplayArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct InitArgs {
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = MonitorConfig::load(cli.config).map_err(|err| err.to_string())?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Summarize(args) => run_summarize(&config, args),
        Command::Suggest(args) => run_suggest(&config, args).await,
        Command::Login(args) => run_login(&config, args).await,
        Command::Logout => run_logout(&config).await,
        Command::Register(args) => run_register(&config, args).await,
        Command::Profile => run_profile(&config).await,
        Command::Predict(args) => run_predict(&config, args).await,
        Command::PredictCsv(args) => run_predict_csv(&config, args).await,
        Command::History(args) => run_history(&config, args).await,
        Command::Demo(args) => run_demo(&config, args),
        Command::Replay(args) => run_replay(&config, args).await,
        Command::Serve(args) => server::serve(&config, args.host, args.port).await,
        Command::Init(args) => run_init(&config, config_path, args),
    }
}

fn run_init(config: &MonitorConfig, path: Option<PathBuf>, args: InitArgs) -> Result<(), String> {
    let path = path.unwrap_or_else(|| PathBuf::from("config/monitor.toml"));
    if path.exists() && !args.force {
        return Err(format!("{} already exists; pass --force to overwrite", path.display()));
    }
    config.write(&path).map_err(|err| err.to_string())?;
    println!("Wrote {}.", path.display());
    Ok(())
}

fn run_summarize(config: &MonitorConfig, args: SummarizeArgs) -> Result<(), String> {
    let records = load_history(&args.file).map_err(|err| err.to_string())?;
    let label = args
        .student_id
        .unwrap_or_else(|| args.file.display().to_string());
    print_summary(config, &label, &records, args.details);
    Ok(())
}

async fn run_suggest(config: &MonitorConfig, args: SuggestArgs) -> Result<(), String> {
    let student_id = args.student_id.trim();
    if student_id.is_empty() {
        return Err("student id is required".to_string());
    }
    let client = build_client(config)?;
    let session = require_session(config).await?;
    let records = client
        .history_for_student(&session, student_id)
        .await
        .map_err(|err| err.to_string())?;
    if records.is_empty() {
        println!("No history found for {}.", student_id);
        return Ok(());
    }
    print_summary(config, student_id, &records, args.details);
    Ok(())
}

async fn run_login(config: &MonitorConfig, args: LoginArgs) -> Result<(), String> {
    let password = read_secret(args.password)?;
    let client = build_client(config)?;
    let session = client
        .login(&args.username, &password)
        .await
        .map_err(|err| err.to_string())?;
    let store = SessionStore::new(config.session.path.clone());
    store.save(&session).await.map_err(|err| err.to_string())?;
    println!("Logged in as {}.", session.username.as_deref().unwrap_or(&args.username));
    println!("Session saved to {}.", store.path().display());
    Ok(())
}

async fn run_logout(config: &MonitorConfig) -> Result<(), String> {
    let removed = SessionStore::new(config.session.path.clone())
        .clear()
        .await
        .map_err(|err| err.to_string())?;
    if removed {
        println!("Logged out.");
    } else {
        println!("No active session.");
    }
    Ok(())
}

async fn run_register(config: &MonitorConfig, args: RegisterArgs) -> Result<(), String> {
    let password = read_secret(args.password)?;
    if args.username.trim().is_empty() || args.email.trim().is_empty() {
        return Err("username, email and password are required".to_string());
    }
    let client = build_client(config)?;
    let message = client
        .register(&args.username, &password, &args.email)
        .await
        .map_err(|err| err.to_string())?;
    println!("{}", message);
    Ok(())
}

async fn run_profile(config: &MonitorConfig) -> Result<(), String> {
    let client = build_client(config)?;
    let session = require_session(config).await?;
    let profile = client.profile(&session).await.map_err(|err| err.to_string())?;
    println!("Username: {}", profile.username);
    println!("Email: {}", if profile.email.is_empty() { "-" } else { profile.email.as_str() });
    if let Some(expires) = session.expires_at {
        println!("Session expires: {}", expires.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

async fn run_predict(config: &MonitorConfig, args: PredictArgs) -> Result<(), String> {
    let reading = SensorReading::new(args.heart_rate, args.skin_conductance, args.eeg);
    let errors = reading.validate();
    if !errors.is_empty() {
        return Err(errors.join(" | "));
    }

    let client = build_client(config)?;
    let session = require_session(config).await?;
    let prediction = client
        .predict_manual(&session, &args.student_id, reading)
        .await
        .map_err(|err| err.to_string())?;

    println!(
        "Predicted engagement: {}",
        EngagementLevel::from_value(prediction.engagement_level).label()
    );
    if let Some(feedback) = prediction.feedback.filter(|text| !text.is_empty()) {
        println!("Feedback: {}", feedback);
    }
    if !prediction.top_features.is_empty() {
        println!("Top features: {}", prediction.top_features.join(", "));
    }
    for (feature, severity) in &prediction.severities {
        println!("  {}: {:?}", feature, severity);
    }
    Ok(())
}

async fn run_predict_csv(config: &MonitorConfig, args: FileArgs) -> Result<(), String> {
    let batch = load_batch(&args.file).map_err(|err| err.to_string())?;
    for rejected in &batch.rejected {
        println!(
            "Line {} ({}) will be skipped: {}",
            rejected.line,
            rejected.student_id,
            rejected.errors.join(" | ")
        );
    }
    if batch.rows.is_empty() && batch.incomplete == 0 {
        return Err("All rows are out of range; nothing to upload.".to_string());
    }

    let contents = std::fs::read(&args.file).map_err(|err| format!("failed to read csv: {}", err))?;
    let file_name = file_name_of(&args.file);
    let client = build_client(config)?;
    let session = require_session(config).await?;
    let predictions = client
        .predict_csv(&session, &file_name, contents)
        .await
        .map_err(|err| err.to_string())?;

    println!("Batch predictions: {} of {} rows", predictions.len(), batch.total());
    for prediction in predictions {
        println!(
            "{} | {} | HR {} | SC {} | EEG {} | {} | {}",
            prediction.timestamp.as_deref().unwrap_or("-"),
            prediction.student_id.as_deref().unwrap_or("-"),
            prediction.reading.heart_rate,
            prediction.reading.skin_conductance,
            prediction.reading.eeg,
            EngagementLevel::from_value(prediction.engagement_level).label(),
            prediction.feedback.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_history(config: &MonitorConfig, args: HistoryArgs) -> Result<(), String> {
    let client = build_client(config)?;
    let session = require_session(config).await?;

    if let Some(history_id) = args.delete {
        let message = client
            .delete_history(&session, &history_id)
            .await
            .map_err(|err| err.to_string())?;
        println!("{}", message);
        return Ok(());
    }

    let records = match args.student_id.as_deref() {
        Some(student_id) => client.history_for_student(&session, student_id).await,
        None => client.history(&session).await,
    }
    .map_err(|err| err.to_string())?;

    if records.is_empty() {
        println!("No history yet.");
        return Ok(());
    }
    for record in &records {
        println!(
            "[{}] {} {}",
            record.id.as_deref().unwrap_or("-"),
            record.student_id.as_deref().unwrap_or("-"),
            format_record_line(record)
        );
    }
    Ok(())
}

fn run_demo(config: &MonitorConfig, args: DemoArgs) -> Result<(), String> {
    let start = Local::now().naive_local() - ChronoDuration::hours(args.count as i64);
    let records = generate_synthetic_history(&args.student_id, args.count, args.seed, start);
    print_summary(config, &args.student_id, &records, args.details);
    Ok(())
}

async fn run_replay(config: &MonitorConfig, args: ReplayArgs) -> Result<(), String> {
    let batch = load_batch(&args.file).map_err(|err| err.to_string())?;
    let interval = Duration::from_millis(args.interval_ms.unwrap_or(config.replay.interval_ms));
    let client = build_client(config)?;
    let session = require_session(config).await?;

    for (index, row) in batch.rows.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(interval).await;
        }
        match client.predict_manual(&session, &row.student_id, row.reading).await {
            Ok(prediction) => println!(
                "[Line {}] {} {} -> {}",
                row.line,
                row.timestamp.as_deref().unwrap_or("-"),
                row.student_id,
                EngagementLevel::from_value(prediction.engagement_level).label()
            ),
            Err(err) => {
                tracing::warn!(line = row.line, error = %err, "replay row failed");
                println!("[Line {}] Error: {}", row.line, err);
            }
        }
    }

    println!(
        "Replayed {} rows ({} rejected locally, {} incomplete).",
        batch.rows.len(),
        batch.rejected.len(),
        batch.incomplete
    );
    Ok(())
}

fn print_summary(config: &MonitorConfig, label: &str, records: &[EngagementRecord], details: bool) {
    let summarizer = Summarizer::new(config.summary.clone());
    let result = summarizer.summarize(records);

    println!("Summary for: {}", label);
    println!(
        "Average engagement level: {}",
        result.average_label().unwrap_or_else(|| "n/a".to_string())
    );

    if let Some(stats) = result.stats.as_ref().filter(|_| details) {
        println!(
            "Records: {} | recent avg {} | variance {} | mode {} | afternoon lows {} | negative feedback {}",
            stats.count,
            format_float(stats.recent_average, 2),
            format_float(stats.variance, 2),
            EngagementLevel::from_value(stats.mode).label(),
            stats.afternoon_low_count,
            stats.negative_feedback_count
        );
        let rules: Vec<&str> = result.rules.iter().map(|rule| rule.label()).collect();
        println!("Rules: {}", rules.join(", "));
    }

    if !result.suggestions.is_empty() {
        println!("\nSuggestions:");
        for suggestion in &result.suggestions {
            println!("- {}", suggestion);
        }
    }

    if details {
        println!("\nHistory:");
        for record in records {
            println!("  {}", format_record_line(record));
        }
    }
}

fn build_client(config: &MonitorConfig) -> Result<MonitorClient, String> {
    MonitorClient::from_config(&config.api).map_err(|err| err.to_string())
}

async fn require_session(config: &MonitorConfig) -> Result<Session, String> {
    let session = SessionStore::new(config.session.path.clone())
        .load()
        .await
        .map_err(|err| err.to_string())?
        .ok_or_else(|| ClientError::MissingSession.to_string())?;
    if session.is_expired(Utc::now()) {
        return Err(ClientError::ExpiredSession.to_string());
    }
    Ok(session)
}

fn read_secret(arg: Option<String>) -> Result<String, String> {
    if let Some(value) = arg {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("failed reading stdin: {}", err))?;
    let trimmed = buffer.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err("missing password: pass --password or pipe stdin".to_string());
    }
    Ok(trimmed.to_string())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("readings.csv")
        .to_string()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("focus_monitor=info,tower_http=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_config_once_unless_forced() {
        let dir = std::env::temp_dir().join(format!("focus-monitor-init-{}", std::process::id()));
        let path = dir.join("monitor.toml");
        let config = MonitorConfig::default();

        run_init(&config, Some(path.clone()), InitArgs { force: false }).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(MonitorConfig::from_toml_str(&written).unwrap(), config);

        let err = run_init(&config, Some(path.clone()), InitArgs { force: false }).unwrap_err();
        assert!(err.contains("--force"), "{}", err);
        run_init(&config, Some(path.clone()), InitArgs { force: true }).unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
