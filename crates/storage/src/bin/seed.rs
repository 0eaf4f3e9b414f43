use std::fmt;
use std::path::PathBuf;

use exam_core::model::{
    CategoryCode, ChoiceLabel, MAX_CHOICES, Question, QuestionError, QuestionId,
};
use serde::Deserialize;
use storage::repository::{QuestionFilter, QuestionRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    bank: Option<PathBuf>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
struct BankError {
    id: u64,
    source: exam_core::Error,
}

impl fmt::Display for BankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "question {}: {}", self.id, self.source)
    }
}

impl std::error::Error for BankError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .unwrap_or_else(|_| "sqlite:dev.sqlite3?mode=rwc".into());
        let mut bank = std::env::var("EXAM_BANK").ok().map(PathBuf::from);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--bank" => {
                    let value = require_value(&mut args, "--bank")?;
                    bank = Some(PathBuf::from(value));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, bank })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3?mode=rwc)");
    eprintln!("  --bank <file.json>        Question bank to import (default: built-in sample)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  EXAM_DB_URL, EXAM_BANK");
}

/// One question-bank entry as it appears in an exported JSON bank.
#[derive(Debug, Deserialize)]
struct BankEntry {
    id: u64,
    category: String,
    #[serde(default)]
    topic: Option<String>,
    prompt: String,
    answers: Vec<String>,
    correct: char,
    #[serde(default)]
    image_ref: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl BankEntry {
    fn into_record(self) -> Result<QuestionRecord, BankError> {
        let id = self.id;
        let fail = |source: exam_core::Error| BankError { id, source };

        if self.answers.len() > MAX_CHOICES {
            let len = self.answers.len();
            return Err(fail(QuestionError::TooManyChoices { len }.into()));
        }
        let mut columns: [Option<String>; MAX_CHOICES] = Default::default();
        for (slot, text) in columns.iter_mut().zip(self.answers) {
            *slot = Some(text);
        }

        let correct = ChoiceLabel::try_from(self.correct).map_err(|e| fail(e.into()))?;
        let category = CategoryCode::parse(&self.category).map_err(|e| fail(e.into()))?;
        let question = Question::from_answer_columns(
            QuestionId::new(id),
            self.prompt,
            columns,
            correct,
            self.image_ref,
        );
        question.validate().map_err(|e| fail(e.into()))?;

        let record = QuestionRecord::new(question, category, self.topic);
        Ok(if self.active { record } else { record.inactive() })
    }
}

const SAMPLE_BANK: &str = r#"[
  {
    "id": 1,
    "category": "ARA",
    "topic": "RIPEAM",
    "prompt": "Two power-driven vessels meet head-on. What must each do?",
    "answers": [
      "Keep course and speed",
      "Alter course to starboard",
      "Alter course to port",
      "Stop engines"
    ],
    "correct": "B"
  },
  {
    "id": 2,
    "category": "ARA",
    "topic": "IALA",
    "prompt": "In IALA region B, a port-hand lateral mark is painted:",
    "answers": ["Red", "Green", "Yellow", "Black and yellow"],
    "correct": "B"
  },
  {
    "id": 3,
    "category": "ARA",
    "topic": "INCENDIO",
    "prompt": "Which extinguisher suits a fuel fire in the engine compartment?",
    "answers": ["Water jet", "CO2", "Wet blanket"],
    "correct": "B"
  },
  {
    "id": 4,
    "category": "MTA",
    "topic": "MANOBRA",
    "prompt": "When approaching a swimmer area on a personal watercraft you should:",
    "answers": [
      "Reduce to idle speed and keep clear",
      "Keep planing speed to reduce wake"
    ],
    "correct": "A"
  },
  {
    "id": 5,
    "category": "MTA",
    "topic": "SOBREVIVENCIA",
    "prompt": "The kill-switch lanyard must be attached to:",
    "answers": ["The handlebar", "The operator", "The tow ring", "The seat", "The hull"],
    "correct": "B"
  },
  {
    "id": 6,
    "category": "VLA",
    "topic": "RIPEAM",
    "prompt": "A sailing vessel on port tack meets one on starboard tack. Who gives way?",
    "answers": ["Port tack", "Starboard tack", "The larger vessel"],
    "correct": "A"
  },
  {
    "id": 7,
    "category": "MSA",
    "topic": "SOCORROS",
    "prompt": "The first step when recovering a person overboard is to:",
    "answers": [
      "Shout and keep them in sight",
      "Call the harbour master",
      "Turn off all lights"
    ],
    "correct": "A"
  },
  {
    "id": 8,
    "category": "CPA",
    "topic": "IALA",
    "prompt": "An isolated danger mark shows which colours?",
    "answers": ["Black with red bands", "Yellow", "Red and white stripes"],
    "correct": "A"
  }
]"#;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let raw = match &args.bank {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_BANK.to_string(),
    };
    let entries: Vec<BankEntry> = serde_json::from_str(&raw)?;
    let records = entries
        .into_iter()
        .map(BankEntry::into_record)
        .collect::<Result<Vec<_>, _>>()?;

    let storage = Storage::sqlite(&args.db_url).await?;
    for record in &records {
        storage.questions.upsert_question(record).await?;
    }
    let active = storage
        .questions
        .count_questions(&QuestionFilter::default())
        .await?;

    println!(
        "Seeded {} questions into {} ({} active in bank)",
        records.len(),
        args.db_url,
        active
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
