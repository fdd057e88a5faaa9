//! `ladder`: operator binary for the Ladder practice engine.
//!
//! Reads `ladder.toml` (or the path given with `--config`), layers `LADDER_*`
//! environment variables on top, opens the SQLite store and runs a single
//! command. Results are printed to stdout as JSON.
//!
//! ```
//! ladder session start 6f1c...
//! ladder next 6f1c... 9b2e... --category algebra
//! ladder answer 6f1c... 9b2e... 41d7... "x = 4"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use ladder_core::{
  Classify,
  config::EngineConfig,
  ids::{CategoryId, ItemId, SessionId, SubjectId},
  model::{NewItem, SessionStatus},
  store::{AttemptSubmission, PracticeStore, SelectionRequest},
};
use ladder_store_sqlite::SqliteStore;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ladder", version, about = "Adaptive practice rating engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ladder.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Add or refresh a practice item.
  AddItem(AddItem),

  /// Bulk-load items from a JSON array of item definitions.
  Import { file: PathBuf },

  /// Show a subject's overall rating, creating it if needed.
  Rating { subject: SubjectId },

  /// List a subject's category ratings with attempt aggregates.
  Categories { subject: SubjectId },

  /// Create a default rating for every category that has items.
  InitCategories { subject: SubjectId },

  /// Rank a subject's categories by practice priority.
  Priorities { subject: SubjectId },

  /// Manage practice sessions.
  #[command(subcommand)]
  Session(SessionCommand),

  /// Pick the next item for a session.
  Next(Next),

  /// Submit an answer and apply the rating updates.
  Answer {
    subject: SubjectId,
    session: SessionId,
    item:    ItemId,
    answer:  String,
  },
}

#[derive(Args)]
struct AddItem {
  #[arg(long)]
  category:    CategoryId,
  #[arg(long)]
  prompt:      String,
  #[arg(long)]
  answer:      String,
  #[arg(long)]
  explanation: Option<String>,
  /// Starting difficulty; ignored when the item already exists.
  #[arg(long)]
  difficulty:  Option<i32>,
  /// Refresh an existing item instead of creating a new one.
  #[arg(long)]
  id:          Option<ItemId>,
}

#[derive(Subcommand)]
enum SessionCommand {
  /// Open a new active session.
  Start { subject: SubjectId },
  /// Show a session.
  Show { session: SessionId },
  /// Move a session to another status.
  Status {
    session: SessionId,
    status:  SessionStatus,
  },
  /// List the attempts recorded in a session.
  Attempts { session: SessionId },
}

#[derive(Args)]
struct Next {
  subject:  SubjectId,
  session:  SessionId,
  /// Only consider items from this category.
  #[arg(long)]
  category: Option<CategoryId>,
  /// Favour a category, as `slug=weight`. May be repeated.
  #[arg(long = "weight", value_parser = parse_weight)]
  weights:  Vec<(CategoryId, f64)>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LadderConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  #[serde(default)]
  engine:     EngineConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/ladder/ladder.db") }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so stdout stays machine-readable.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("LADDER")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let cfg: LadderConfig = settings
    .try_deserialize()
    .context("failed to deserialise LadderConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open_with(&store_path, cfg.engine)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  run(&store, cli.command).await
}

async fn run(store: &SqliteStore, command: Command) -> anyhow::Result<()> {
  match command {
    Command::AddItem(args) => {
      let mut item = NewItem::new(args.category, args.prompt, args.answer);
      item.item_id = args.id.unwrap_or_default();
      item.explanation = args.explanation;
      item.initial_difficulty = args.difficulty;
      print_json(&store.upsert_item(item).await?)
    }

    Command::Import { file } => {
      let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading item file {}", file.display()))?;
      let items: Vec<NewItem> = serde_json::from_str(&raw).context("parsing item file")?;
      let total = items.len();
      for item in items {
        store.upsert_item(item).await?;
      }
      tracing::info!(total, "imported items");
      Ok(())
    }

    Command::Rating { subject } => print_json(&store.get_overall_rating(subject).await?),
    Command::Categories { subject } => {
      print_json(&store.list_category_ratings(subject).await?)
    }
    Command::InitCategories { subject } => {
      print_json(&store.init_category_ratings(subject).await?)
    }
    Command::Priorities { subject } => print_json(&store.category_priorities(subject).await?),

    Command::Session(SessionCommand::Start { subject }) => {
      print_json(&store.start_session(subject).await?)
    }
    Command::Session(SessionCommand::Show { session }) => {
      let found = store
        .get_session(session)
        .await?
        .with_context(|| format!("no session {session}"))?;
      print_json(&found)
    }
    Command::Session(SessionCommand::Status { session, status }) => {
      print_json(&store.set_session_status(session, status).await?)
    }
    Command::Session(SessionCommand::Attempts { session }) => {
      print_json(&store.list_attempts(session).await?)
    }

    Command::Next(args) => {
      let weights = (!args.weights.is_empty()).then(|| {
        args
          .weights
          .into_iter()
          .fold(store.config().selection.clone(), |w, (category, weight)| {
            w.favor(category, weight)
          })
      });
      let request = SelectionRequest { category: args.category, weights };
      match store.select_next(args.subject, args.session, &request).await? {
        Some(candidate) => print_json(&candidate),
        None => print_json(&serde_json::Value::Null),
      }
    }

    Command::Answer { subject, session, item, answer } => {
      let submission = AttemptSubmission {
        session_id: session,
        item_id:    item,
        subject_id: subject,
        answer,
      };
      match store.record_attempt(submission).await {
        Ok(outcome) => print_json(&outcome),
        // Already answered in this session; the first submission stands.
        Err(e) if e.is_conflict() => {
          print_json(&serde_json::json!({ "duplicate": true, "error": e.to_string() }))
        }
        Err(e) => Err(e.into()),
      }
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Parse a `slug=weight` pair for `--weight`.
fn parse_weight(s: &str) -> anyhow::Result<(CategoryId, f64)> {
  let (slug, weight) = s
    .split_once('=')
    .with_context(|| format!("expected slug=weight, got {s:?}"))?;
  let weight: f64 = weight
    .parse()
    .with_context(|| format!("invalid weight {weight:?}"))?;
  Ok((CategoryId::new(slug)?, weight))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn weight_pairs_parse() {
    let (category, weight) = parse_weight("algebra=2.5").unwrap();
    assert_eq!(category.as_str(), "algebra");
    assert_eq!(weight, 2.5);

    assert!(parse_weight("algebra").is_err());
    assert!(parse_weight("Algebra=1").is_err());
    assert!(parse_weight("algebra=lots").is_err());
  }

  #[test]
  fn cli_parses_next_with_weights() {
    let subject = SubjectId::new();
    let session = SessionId::new();
    let cli = Cli::try_parse_from([
      "ladder".to_owned(),
      "next".to_owned(),
      subject.to_string(),
      session.to_string(),
      "--weight".to_owned(),
      "geometry=3".to_owned(),
    ])
    .unwrap();

    let Command::Next(next) = cli.command else { panic!("expected next") };
    assert_eq!(next.subject, subject);
    assert_eq!(next.weights.len(), 1);
    assert_eq!(cli.config, PathBuf::from("ladder.toml"));
  }

  #[test]
  fn session_status_parses_lowercase() {
    let cli = Cli::try_parse_from([
      "ladder".to_owned(),
      "session".to_owned(),
      "status".to_owned(),
      SessionId::new().to_string(),
      "paused".to_owned(),
    ])
    .unwrap();
    assert!(matches!(
      cli.command,
      Command::Session(SessionCommand::Status { status: SessionStatus::Paused, .. })
    ));
  }
}
