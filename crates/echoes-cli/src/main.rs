//! Echoes CLI
//!
//! Command-line journal: today's questions, answers, skips and progress.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use echoes_core::{
    EchoesConfig, Journal, Period, Question, Reflection, RemoteSettingsSink, Storage,
    SyncDebouncer,
};
use tracing_subscriber::EnvFilter;

type CliJournal = Journal<Arc<Storage>, Arc<Storage>>;

/// Echoes of Me - daily reflection journal
#[derive(Parser)]
#[command(name = "echoes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Two reflective questions a day, and a record of your answers")]
struct Cli {
    /// Directory holding echoes.db (overrides ECHOES_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// User identifier, usually an email (overrides ECHOES_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Question catalog JSON file (overrides ECHOES_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Day to act on, YYYY-MM-DD (default: today, UTC)
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the morning and afternoon questions
    Today,

    /// Skip a period's question and draw another
    Reroll {
        /// morning or afternoon
        period: Period,
    },

    /// Answer a period's question
    Answer {
        /// morning or afternoon
        period: Period,
        /// Reflection text
        text: String,
        /// Tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,
    },

    /// List reflections, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Replace a reflection's text
    Edit {
        id: String,
        text: String,
    },

    /// Delete a reflection
    Delete {
        id: String,
    },

    /// Show progress, streaks and milestones
    Stats,

    /// Show skipped questions, oldest first
    Skips,

    /// Rebuild the answered-question cache from stored reflections
    Resync,

    /// Push local-only reflections and reconcile settings
    Sync,

    /// Show the question catalog
    Catalog {
        /// Only this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the reconciled settings
    Show,
    /// Set a value (parsed as JSON, else stored as a string)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let mut config = EchoesConfig::from_env();
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }
    if cli.catalog.is_some() {
        config.catalog_path = cli.catalog;
    }
    if cli.user.is_some() {
        config.user = cli.user;
    }
    let date = cli.date.unwrap_or_else(|| Utc::now().date_naive());

    let journal = open_journal(&config)?;

    if let Commands::Catalog { category } = &cli.command {
        return run_catalog(&journal, category.as_deref());
    }

    let Some(user) = config.user.clone() else {
        bail!("No user given: pass --user or set ECHOES_USER");
    };

    match cli.command {
        Commands::Today => run_today(&journal, &user, date),
        Commands::Reroll { period } => run_reroll(&journal, &user, date, period),
        Commands::Answer { period, text, tags } => {
            run_answer(&journal, &user, date, period, &text, tags)
        }
        Commands::List { limit } => run_list(&journal, &user, limit),
        Commands::Edit { id, text } => run_edit(&journal, &user, &id, &text),
        Commands::Delete { id } => run_delete(&journal, &user, &id),
        Commands::Stats => run_stats(&journal, &user, date),
        Commands::Skips => run_skips(&journal, &user),
        Commands::Resync => run_resync(&journal, &user),
        Commands::Sync => run_sync(&journal, &user),
        Commands::Settings { action } => run_settings(&journal, &config, &user, action).await,
        Commands::Catalog { .. } => Ok(()),
    }
}

fn open_journal(config: &EchoesConfig) -> anyhow::Result<CliJournal> {
    let catalog = config.load_catalog().context("Failed to load question catalog")?;
    let storage = Arc::new(Storage::new(config.db_path()).context("Failed to open database")?);
    tracing::debug!(db = %storage.path().display(), questions = catalog.len(), "Journal opened");
    Ok(Journal::new(
        catalog,
        Arc::clone(&storage),
        storage,
        config.selection.clone(),
    ))
}

fn print_question(label: &str, question: &Question) {
    println!(
        "{} {} {}",
        format!("{:>10}", label).white().bold(),
        format!("[{}]", question.category).dimmed(),
        question.text
    );
    println!("{:>10} {}", "", format!("#{}", question.id).dimmed());
}

fn print_reflection(reflection: &Reflection) {
    let when = reflection
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let id = if reflection.is_local() {
        format!("{} (local)", reflection.id).yellow()
    } else {
        reflection.id.normal()
    };

    println!("{} {} {}", when.cyan(), format!("[{}]", reflection.category).dimmed(), id);
    println!("  {}", reflection.response_text);
    println!(
        "  {}",
        format!(
            "{} words, quality {:.2}",
            reflection.word_count, reflection.quality_score
        )
        .dimmed()
    );
}

/// Run today command
fn run_today(journal: &CliJournal, user: &str, date: NaiveDate) -> anyhow::Result<()> {
    let pair = journal.today(user, date)?;

    println!("{}", format!("=== Questions for {} ===", date).cyan().bold());
    println!();
    print_question("Morning", &pair.morning);
    println!();
    print_question("Afternoon", &pair.afternoon);

    for period in Period::ALL {
        if let Some(lock) = journal.lock(user, date, period)? {
            if lock.previously_skipped {
                println!();
                println!(
                    "  {} {}",
                    ">".cyan(),
                    format!("The {} question is one you skipped before.", period).dimmed()
                );
            }
        }
    }

    Ok(())
}

/// Run reroll command
fn run_reroll(
    journal: &CliJournal,
    user: &str,
    date: NaiveDate,
    period: Period,
) -> anyhow::Result<()> {
    let previous = journal.select(user, date, period)?;
    let next = journal.reroll(user, date, period)?;

    println!("{}", "=== Rerolled ===".cyan().bold());
    println!();
    println!("{}: #{} {}", "Skipped".white().bold(), previous.id, previous.text.dimmed());
    println!();
    print_question(&capitalize(period.as_str()), &next);

    Ok(())
}

/// Run answer command
fn run_answer(
    journal: &CliJournal,
    user: &str,
    date: NaiveDate,
    period: Period,
    text: &str,
    tags: Option<String>,
) -> anyhow::Result<()> {
    let tags: Vec<String> = tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let saved = journal.answer(user, date, period, text, tags)?;

    if saved.synced {
        println!("{}", "Reflection saved.".green().bold());
    } else {
        println!(
            "{}",
            "Reflection saved locally; run 'echoes sync' to push it.".yellow().bold()
        );
    }
    println!("{}: {}", "ID".white().bold(), saved.reflection.id);
    println!("{}: {}", "Words".white().bold(), saved.reflection.word_count);
    println!("{}: {:.2}", "Quality".white().bold(), saved.reflection.quality_score);

    Ok(())
}

/// Run list command
fn run_list(journal: &CliJournal, user: &str, limit: usize) -> anyhow::Result<()> {
    let reflections = journal.reflections(user)?;

    println!("{}", "=== Reflections ===".cyan().bold());
    println!();

    if reflections.is_empty() {
        println!("{}", "No reflections yet.".dimmed());
        return Ok(());
    }

    for reflection in reflections.iter().take(limit) {
        print_reflection(reflection);
        println!();
    }
    if reflections.len() > limit {
        println!("{}", format!("... {} more", reflections.len() - limit).dimmed());
    }

    Ok(())
}

/// Run edit command
fn run_edit(journal: &CliJournal, user: &str, id: &str, text: &str) -> anyhow::Result<()> {
    let updated = journal.update(user, id, text)?;
    println!("{}", "Reflection updated.".green().bold());
    print_reflection(&updated);
    Ok(())
}

/// Run delete command
fn run_delete(journal: &CliJournal, user: &str, id: &str) -> anyhow::Result<()> {
    if journal.delete(user, id)? {
        println!("{}", format!("Deleted {}", id).green());
    } else {
        println!("{}", format!("No reflection with id {}", id).yellow());
    }
    Ok(())
}

/// Run stats command
fn run_stats(journal: &CliJournal, user: &str, date: NaiveDate) -> anyhow::Result<()> {
    let report = journal.stats(user, date)?;
    let stats = &report.stats;

    println!("{}", "=== Echoes Progress ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Reflections".white().bold(), stats.total_reflections);
    println!(
        "{}: {} of {}",
        "Categories Covered".white().bold(),
        stats.categories_covered.len(),
        journal.catalog().categories().len()
    );
    println!("{}: {:.1}", "Average Words".white().bold(), stats.average_word_count);
    println!("{}: {:.2}", "Average Quality".white().bold(), stats.average_quality_score);
    println!("{}: {} days", "Current Streak".white().bold(), stats.current_streak);
    println!("{}: {} days", "Longest Streak".white().bold(), stats.longest_streak);
    println!("{}: {:.1}%", "Completion".white().bold(), stats.completion_percentage);

    match &stats.next_milestone {
        Some(m) => println!(
            "{}: {} ({} to go)",
            "Next Milestone".white().bold(),
            m.description,
            m.remaining
        ),
        None => println!("{}: {}", "Next Milestone".white().bold(), "All reached!".green()),
    }

    if let Some(delta) = &report.delta {
        println!();
        println!(
            "{}",
            format!("=== Since {} ===", delta.since.format("%Y-%m-%d %H:%M"))
                .yellow()
                .bold()
        );
        println!("  {} {:+}", "Reflections".white(), delta.reflections);
        println!("  {} {:+}", "Streak".white(), delta.current_streak);
        println!("  {} {:+}", "Categories".white(), delta.categories_covered);
        println!("  {} {:+.2}", "Quality".white(), delta.average_quality_score);
    }

    Ok(())
}

/// Run skips command
fn run_skips(journal: &CliJournal, user: &str) -> anyhow::Result<()> {
    let entries = journal.skipped(user)?;

    println!("{}", "=== Skipped Questions ===".cyan().bold());
    println!();

    if entries.is_empty() {
        println!("{}", "Nothing skipped.".dimmed());
        return Ok(());
    }

    for entry in entries {
        let text = journal
            .catalog()
            .get(entry.question_id)
            .map(|q| q.text.as_str())
            .unwrap_or("(no longer in catalog)");
        println!(
            "  #{:<4} {} {}",
            entry.question_id,
            format!("x{}", entry.skip_count).yellow(),
            text
        );
        println!(
            "        {}",
            format!("last skipped {}", entry.last_skipped_at.format("%Y-%m-%d")).dimmed()
        );
    }

    Ok(())
}

/// Run resync command
fn run_resync(journal: &CliJournal, user: &str) -> anyhow::Result<()> {
    let answered = journal.resync_answered(user)?;

    println!("{}", "=== Answered Questions ===".cyan().bold());
    println!();
    for (category, count) in answered.counts() {
        println!("  {:15} {}", category, count);
    }
    println!();
    println!("{}", format!("{} questions answered", answered.len()).green());

    Ok(())
}

/// Run sync command
fn run_sync(journal: &CliJournal, user: &str) -> anyhow::Result<()> {
    let report = journal.sync_pending(user)?;
    journal.settings(user)?;

    println!("{}: {}", "Pushed".white().bold(), report.pushed);
    if report.remaining > 0 {
        println!(
            "{}",
            format!("{} reflections still local", report.remaining).yellow()
        );
    } else {
        println!("{}", "Everything is synced.".green());
    }

    Ok(())
}

/// Run catalog command
fn run_catalog(journal: &CliJournal, category: Option<&str>) -> anyhow::Result<()> {
    let catalog = journal.catalog();

    println!("{}", "=== Question Catalog ===".cyan().bold());
    println!();

    for (name, count) in catalog.categories() {
        if category.is_some_and(|c| c != name) {
            continue;
        }
        println!("{} ({})", name.white().bold(), count);
        for question in catalog.questions().iter().filter(|q| q.category == name) {
            println!("  {} {}", format!("#{:<4}", question.id).dimmed(), question.text);
        }
        println!();
    }

    Ok(())
}

/// Run settings command
async fn run_settings(
    journal: &CliJournal,
    config: &EchoesConfig,
    user: &str,
    action: SettingsAction,
) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show => {
            let blob = journal.settings(user)?;
            println!("{}", serde_json::to_string_pretty(&blob.values)?);
            println!(
                "{}",
                format!("updated {}", blob.updated_at.format("%Y-%m-%d %H:%M:%S")).dimmed()
            );
        }
        SettingsAction::Set { key, value } => {
            let value = serde_json::from_str(&value)
                .unwrap_or(serde_json::Value::String(value));
            let blob = journal.set_setting(user, &key, value)?;

            let sink = Arc::new(RemoteSettingsSink::new(Arc::clone(journal.remote())));
            let debouncer = SyncDebouncer::new(sink, config.sync_debounce);
            debouncer.schedule(user, serde_json::to_value(&blob)?);
            // One-shot process: write now instead of waiting out the timer
            let written = debouncer.flush();
            let message = settings_set_message(&key, written);
            if written == 0 {
                println!("{}", message.yellow());
            } else {
                println!("{}", message.green());
            }
        }
    }
    Ok(())
}

/// Outcome line for `settings set`, given how many pushes reached the store
fn settings_set_message(key: &str, written: usize) -> String {
    if written == 0 {
        format!("Set {} locally; it will sync on the next 'echoes sync'", key)
    } else {
        format!("Set {}", key)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
