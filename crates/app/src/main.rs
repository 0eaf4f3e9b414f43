use std::fmt;
use std::sync::Arc;

use exam_core::model::{CategoryCode, ExamCatalog, SchoolId, Selection};
use services::{
    ChannelListener, Clock, ExamLoopService, ExamServiceError, HistoryService,
    NavigationController, ResultRecorder, SessionRandomizer, TickSource,
};
use storage::repository::{QuestionFilter, Storage};
use tracing_subscriber::EnvFilter;

mod runner;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidSchoolId { raw: String },
    InvalidCount { raw: String },
    InvalidSeed { raw: String },
    InvalidLimit { raw: String },
    InvalidCategory { raw: String },
    InvalidTopic { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSchoolId { raw } => write!(f, "invalid --school-id value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw}"),
            ArgsError::InvalidTopic { raw } => write!(f, "invalid --topic value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam categories [options]");
    eprintln!("  exam exam --category <CODE> [--count <n>] [--seed <n>] [options]");
    eprintln!("  exam exercise --topic <SLUG> [--count <n>] [--seed <n>] [options]");
    eprintln!("  exam stats [--limit <n>] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://dev.sqlite3)");
    eprintln!("  --school-id <id>          Record and list results for this school");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("While answering: a-e selects, Enter or n goes on, q abandons.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_SCHOOL_ID, EXAM_SEED, EXAM_LOG (default: warn)");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Categories,
    Exam {
        selection: Selection,
        count: Option<u32>,
    },
    Stats {
        limit: u32,
    },
}

/// Values picked up from the process environment before flags are applied.
#[derive(Debug, Clone, Default)]
struct Env {
    db_url: Option<String>,
    school_id: Option<String>,
    seed: Option<String>,
}

impl Env {
    fn from_process() -> Self {
        Self {
            db_url: std::env::var("EXAM_DB_URL").ok(),
            school_id: std::env::var("EXAM_SCHOOL_ID").ok(),
            seed: std::env::var("EXAM_SEED").ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    db_url: String,
    school_id: Option<SchoolId>,
    seed: Option<u64>,
}

const DEFAULT_STATS_LIMIT: u32 = 50;

impl Args {
    fn parse_from(argv: impl IntoIterator<Item = String>, env: Env) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter();
        let name = args
            .next()
            .ok_or(ArgsError::MissingFlag { flag: "subcommand" })?;

        let mut db_url = env
            .db_url
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut school_id = env
            .school_id
            .map(|raw| parse_school_id(&raw))
            .transpose()?;
        let mut seed = env.seed.map(|raw| parse_seed(&raw)).transpose()?;
        let mut category: Option<String> = None;
        let mut topic: Option<String> = None;
        let mut count: Option<u32> = None;
        let mut limit = DEFAULT_STATS_LIMIT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--school-id" => {
                    let value = require_value(&mut args, "--school-id")?;
                    school_id = Some(parse_school_id(&value)?);
                }
                "--seed" => {
                    let value = require_value(&mut args, "--seed")?;
                    seed = Some(parse_seed(&value)?);
                }
                "--category" => category = Some(require_value(&mut args, "--category")?),
                "--topic" => topic = Some(require_value(&mut args, "--topic")?),
                "--count" => {
                    let value = require_value(&mut args, "--count")?;
                    let parsed = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidCount { raw: value })?;
                    count = Some(parsed);
                }
                "--limit" => {
                    let value = require_value(&mut args, "--limit")?;
                    limit = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidLimit { raw: value })?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_str() {
            "categories" => Command::Categories,
            "exam" => {
                let raw = category.ok_or(ArgsError::MissingFlag { flag: "--category" })?;
                let code = CategoryCode::parse(&raw)
                    .map_err(|_| ArgsError::InvalidCategory { raw: raw.clone() })?;
                Command::Exam {
                    selection: Selection::Category(code),
                    count,
                }
            }
            "exercise" => {
                let raw = topic.ok_or(ArgsError::MissingFlag { flag: "--topic" })?;
                let selection = Selection::topic(&raw)
                    .map_err(|_| ArgsError::InvalidTopic { raw: raw.clone() })?;
                Command::Exam { selection, count }
            }
            "stats" => Command::Stats { limit },
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        Ok(Self {
            command,
            db_url,
            school_id,
            seed,
        })
    }
}

fn parse_school_id(raw: &str) -> Result<SchoolId, ArgsError> {
    raw.trim()
        .parse::<SchoolId>()
        .map_err(|_| ArgsError::InvalidSchoolId {
            raw: raw.to_string(),
        })
}

fn parse_seed(raw: &str) -> Result<u64, ArgsError> {
    raw.trim().parse::<u64>().map_err(|_| ArgsError::InvalidSeed {
        raw: raw.to_string(),
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("EXAM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn list_categories(
    storage: &Storage,
    catalog: &ExamCatalog,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Exams:");
    for category in catalog.categories() {
        let available = storage
            .questions
            .count_questions(&QuestionFilter::category(category.code.clone()))
            .await?;
        println!(
            "  {:<4} {:<16} {:>2} questions, {:>3} min, pass at {:>2}  ({} in bank)",
            category.code.as_str(),
            category.title,
            category.question_count,
            category.time_limit.as_secs() / 60,
            category.min_correct,
            available
        );
    }
    println!();
    println!("Exercises:");
    for topic in catalog.topics() {
        let available = storage
            .questions
            .count_questions(&QuestionFilter::topic(topic.slug.clone()))
            .await?;
        println!(
            "  {:<14} {:<20} ({} in bank)",
            topic.slug, topic.title, available
        );
    }
    Ok(())
}

async fn run_exam(
    storage: &Storage,
    catalog: ExamCatalog,
    args: &Args,
    selection: &Selection,
    count: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (channel, events) = ChannelListener::channel();
    let recorder = ResultRecorder::new(Arc::clone(&storage.results)).spawn(events);
    let nav = Arc::new(NavigationController::new());

    let randomizer = args
        .seed
        .map_or(SessionRandomizer::Entropy, SessionRandomizer::Seeded);
    let svc = ExamLoopService::new(
        catalog,
        Arc::clone(&storage.questions),
        Clock::system(),
        TickSource::every_second(),
    )
    .with_randomizer(randomizer)
    .with_listener(Arc::new(channel))
    .with_listener(nav.clone());

    let mut engine = svc.engine();
    match svc.start(&mut engine, selection, count, args.school_id).await {
        Ok(first) => runner::run(&mut engine, &nav, first).await?,
        Err(ExamServiceError::NoContent { .. }) => {
            println!("No questions available for this selection.");
        }
        Err(err) => return Err(err.into()),
    }

    drop(engine);
    drop(svc);
    let report = recorder.await?;
    tracing::debug!(
        recorded = report.recorded,
        failed = report.failed,
        "result recorder finished"
    );
    Ok(())
}

async fn print_stats(
    storage: &Storage,
    school_id: Option<SchoolId>,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = HistoryService::new(Arc::clone(&storage.results))
        .stats(school_id, limit)
        .await?;
    if stats.recent.is_empty() {
        println!("No results yet. Finish an exam or exercise to see your progress.");
        return Ok(());
    }

    println!(
        "Exams:     {:>3}% average, {} taken, {} passed",
        stats.exams.average_percent, stats.exams.count, stats.exams.passed
    );
    println!(
        "Exercises: {:>3}% average, {} taken, {} passed",
        stats.exercises.average_percent, stats.exercises.count, stats.exercises.passed
    );
    println!();
    for entry in &stats.recent {
        println!(
            "  {}  {:<14} {:>3}/{:<3} {:>3}%  {}",
            entry.completed_at.format("%Y-%m-%d %H:%M"),
            entry.label,
            entry.correct,
            entry.total,
            entry.percent,
            if entry.passed { "passed" } else { "failed" }
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse_from(argv, Env::from_process()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    let catalog = ExamCatalog::builtin();

    match &args.command {
        Command::Categories => list_categories(&storage, &catalog).await,
        Command::Exam { selection, count } => {
            run_exam(&storage, catalog, &args, selection, *count).await
        }
        Command::Stats { limit } => print_stats(&storage, args.school_id, *limit).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_exam_with_flags() {
        let args = Args::parse_from(
            argv(&["exam", "--category", "ara", "--count", "5", "--seed", "9"]),
            Env::default(),
        )
        .unwrap();
        assert_eq!(
            args.command,
            Command::Exam {
                selection: Selection::Category(CategoryCode::parse("ARA").unwrap()),
                count: Some(5),
            }
        );
        assert_eq!(args.seed, Some(9));
        assert!(args.db_url.starts_with("sqlite://"));
    }

    #[test]
    fn env_is_overridden_by_flags() {
        let env = Env {
            db_url: Some("sqlite::memory:".into()),
            school_id: Some("3".into()),
            seed: Some("1".into()),
        };
        let args =
            Args::parse_from(argv(&["stats", "--school-id", "8", "--limit", "5"]), env).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.school_id, Some(SchoolId::new(8)));
        assert_eq!(args.seed, Some(1));
        assert_eq!(args.command, Command::Stats { limit: 5 });
    }

    #[test]
    fn exercise_requires_topic() {
        let err = Args::parse_from(argv(&["exercise"]), Env::default()).unwrap_err();
        assert!(matches!(err, ArgsError::MissingFlag { flag: "--topic" }));

        let args =
            Args::parse_from(argv(&["exercise", "--topic", "iala"]), Env::default()).unwrap();
        assert_eq!(
            args.command,
            Command::Exam {
                selection: Selection::topic("IALA").unwrap(),
                count: None,
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            argv(&["exam", "--category", "A1"]),
            argv(&["exam", "--category", "ARA", "--count", "0"]),
            argv(&["stats", "--school-id", "x"]),
            argv(&["stats", "--bogus"]),
            argv(&["play"]),
            argv(&["stats", "--db"]),
        ];
        for args in bad {
            assert!(Args::parse_from(args, Env::default()).is_err());
        }
    }

    #[test]
    fn sqlite_url_is_made_absolute() {
        let url = normalize_sqlite_url("sqlite:data/exam.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/exam.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
