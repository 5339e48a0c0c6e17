use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod app;
mod codec;
mod csv_import;
mod db;
mod error;
mod gradebook;
mod models;
mod report;
mod risk;
mod seed;
mod stats;
mod store;
mod validation;

use gradebook::{GradeTarget, Gradebook};
use store::{Backend, JsonFileStore};
use validation::{GradeInput, NumericPolicy};

#[derive(Parser)]
#[command(name = "grade-risk")]
#[command(
    about = "Weighted grade averages and failing-risk outlook per teaching unit",
    long_about = None
)]
struct Cli {
    /// Snapshot file used when DATABASE_URL is not set
    #[arg(long, global = true, default_value_os_t = store::default_path())]
    data: PathBuf,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Reject malformed numbers instead of falling back to coefficient 1 and value 0
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample semester, skipping units that already exist
    Seed,
    /// Add a teaching unit
    AddUnit {
        name: String,
        #[arg(long)]
        coefficient: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Add a subject to a teaching unit
    AddSubject {
        /// Unit id or name
        #[arg(long)]
        unit: String,
        name: String,
        #[arg(long)]
        coefficient: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Record a grade on a subject, or directly on a unit
    #[command(group(
        ArgGroup::new("grade_value")
            .args(["exact", "min"])
            .required(true)
            .multiple(false)
    ))]
    AddGrade {
        /// Unit id or name
        #[arg(long)]
        unit: String,
        /// Subject id or name; omit to attach the grade to the unit itself
        #[arg(long)]
        subject: Option<String>,
        name: String,
        #[arg(long)]
        exact: Option<String>,
        #[arg(long, requires = "max")]
        min: Option<String>,
        #[arg(long, requires = "min")]
        max: Option<String>,
        #[arg(long)]
        coefficient: Option<String>,
        #[arg(long)]
        confirmed: bool,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Rename a teaching unit or change its coefficient or color
    EditUnit {
        unit: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        coefficient: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename a subject or change its coefficient or color
    EditSubject {
        #[arg(long)]
        unit: String,
        subject: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        coefficient: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Change a grade's name, value or coefficient
    #[command(group(
        ArgGroup::new("grade_value")
            .args(["exact", "min"])
            .multiple(false)
    ))]
    EditGrade {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        exact: Option<String>,
        #[arg(long, requires = "max")]
        min: Option<String>,
        #[arg(long, requires = "min")]
        max: Option<String>,
        #[arg(long)]
        coefficient: Option<String>,
    },
    /// Mark a grade as final, or back to provisional with --undo
    ConfirmGrade {
        id: String,
        #[arg(long)]
        undo: bool,
    },
    /// Delete a teaching unit with its subjects and grades
    DeleteUnit { unit: String },
    /// Delete a subject with its grades
    DeleteSubject {
        #[arg(long)]
        unit: String,
        subject: String,
    },
    /// Delete a grade
    DeleteGrade { id: String },
    /// Print overall and per unit averages with risk
    Summary,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print a shareable export code
    Export,
    /// Replace all data with the content of an export code
    Import {
        code: String,
        /// Only check the code and show what it contains
        #[arg(long)]
        dry_run: bool,
    },
    /// Import grades from a CSV file
    ImportCsv {
        #[arg(long)]
        csv: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_unit_id(book: &Gradebook, key: &str) -> anyhow::Result<String> {
    book.resolve_unit(key)
        .map(|unit| unit.id.clone())
        .with_context(|| format!("no teaching unit matches {key:?}"))
}

fn resolve_subject_ids(
    book: &Gradebook,
    unit_key: &str,
    key: &str,
) -> anyhow::Result<(String, String)> {
    let unit = book
        .resolve_unit(unit_key)
        .with_context(|| format!("no teaching unit matches {unit_key:?}"))?;
    let subject = unit
        .resolve_subject(key)
        .with_context(|| format!("no subject matches {key:?} in {}", unit.name))?;
    Ok((unit.id.clone(), subject.id.clone()))
}

fn print_summary(book: &Gradebook) {
    if book.is_empty() {
        println!("No teaching units yet. Start with `grade-risk add-unit`.");
        return;
    }

    let overall = book.overall_stats();
    println!(
        "Overall: current {:.2}, worst {:.2}, best {:.2} ({})",
        overall.current,
        overall.min,
        overall.max,
        stats::average_band(overall.current)
    );

    for summary in report::summarize_units(book.units()) {
        println!(
            "- {} [{}] current {:.2}, worst {:.2}, best {:.2}; risk {} ({}): {}",
            summary.unit.name,
            summary.unit.id,
            summary.stats.current,
            summary.stats.min,
            summary.stats.max,
            summary.risk.score,
            summary.risk.level.as_str(),
            summary.risk.message
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let policy = if cli.strict {
        NumericPolicy::Strict
    } else {
        NumericPolicy::Lenient
    };

    let backend = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            info!("using Postgres snapshot store");
            Backend::Postgres(db::PgStore::new(db::connect(&database_url).await?))
        }
        Err(_) => {
            let store = JsonFileStore::new(&cli.data);
            info!(path = %store.path().display(), "using snapshot file");
            Backend::File(store)
        }
    };

    match cli.command {
        Commands::InitDb => {
            let Backend::Postgres(store) = &backend else {
                anyhow::bail!(
                    "DATABASE_URL must be set to a Postgres instance to initialise the schema"
                );
            };
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let mut added = 0usize;
            let book = app::apply(&backend, |book| {
                let (book, count) = seed::merge_seed(book);
                added = count;
                Ok(book)
            })
            .await?;
            info!(added, total = book.units().len(), "sample semester seeded");
            println!(
                "Sample semester loaded ({added} new units, {} in total).",
                book.units().len()
            );
        }
        Commands::AddUnit {
            name,
            coefficient,
            color,
        } => {
            let unit =
                validation::build_unit(&name, coefficient.as_deref(), color.as_deref(), policy)?;
            let id = unit.id.clone();
            app::apply(&backend, |book| Ok(book.add_unit(unit))).await?;
            info!(%id, "unit added");
            println!("Added unit {name} [{id}].");
        }
        Commands::AddSubject {
            unit,
            name,
            coefficient,
            color,
        } => {
            let subject =
                validation::build_subject(&name, coefficient.as_deref(), color.as_deref(), policy)?;
            let id = subject.id.clone();
            app::apply(&backend, |book| {
                let unit_id = resolve_unit_id(&book, &unit)?;
                Ok(book.add_subject(&unit_id, subject)?)
            })
            .await?;
            info!(%id, %unit, "subject added");
            println!("Added subject {name} [{id}].");
        }
        Commands::AddGrade {
            unit,
            subject,
            name,
            exact,
            min,
            max,
            coefficient,
            confirmed,
            date,
        } => {
            let grade = validation::build_grade(
                &GradeInput {
                    name: &name,
                    exact: exact.as_deref(),
                    min: min.as_deref(),
                    max: max.as_deref(),
                    coefficient: coefficient.as_deref(),
                    confirmed,
                    date,
                },
                policy,
            )?;
            let id = grade.id.clone();
            let value = grade.value;
            app::apply(&backend, |book| match subject.as_deref() {
                Some(subject) => {
                    let (unit_id, subject_id) = resolve_subject_ids(&book, &unit, subject)?;
                    Ok(book.add_grade(
                        GradeTarget::Subject {
                            unit_id: &unit_id,
                            subject_id: &subject_id,
                        },
                        grade,
                    )?)
                }
                None => {
                    let unit_id = resolve_unit_id(&book, &unit)?;
                    Ok(book.add_grade(GradeTarget::Unit(&unit_id), grade)?)
                }
            })
            .await?;
            info!(%id, %unit, subject = subject.as_deref(), "grade added");
            println!("Added grade {name} {value} [{id}].");
        }
        Commands::EditUnit {
            unit,
            name,
            coefficient,
            color,
        } => {
            app::apply(&backend, |book| {
                let mut updated = book
                    .resolve_unit(&unit)
                    .cloned()
                    .with_context(|| format!("no teaching unit matches {unit:?}"))?;
                if let Some(name) = name.as_deref() {
                    updated.name = validation::required_name(name, "unit name")?;
                }
                if let Some(raw) = coefficient.as_deref() {
                    updated.coefficient = validation::parse_coefficient(Some(raw), policy)?;
                }
                if let Some(color) = color {
                    updated.color = color;
                }
                Ok(book.update_unit(updated)?)
            })
            .await?;
            info!(%unit, "unit updated");
            println!("Updated unit {unit}.");
        }
        Commands::EditSubject {
            unit,
            subject,
            name,
            coefficient,
            color,
        } => {
            app::apply(&backend, |book| {
                let (unit_id, subject_id) = resolve_subject_ids(&book, &unit, &subject)?;
                let mut updated = book
                    .unit(&unit_id)
                    .and_then(|unit| unit.subjects.iter().find(|s| s.id == subject_id))
                    .cloned()
                    .with_context(|| format!("no subject matches {subject:?}"))?;
                if let Some(name) = name.as_deref() {
                    updated.name = validation::required_name(name, "subject name")?;
                }
                if let Some(raw) = coefficient.as_deref() {
                    updated.coefficient = validation::parse_coefficient(Some(raw), policy)?;
                }
                if let Some(color) = color {
                    updated.color = color;
                }
                Ok(book.update_subject(&unit_id, updated)?)
            })
            .await?;
            info!(%unit, %subject, "subject updated");
            println!("Updated subject {subject}.");
        }
        Commands::EditGrade {
            id,
            name,
            exact,
            min,
            max,
            coefficient,
        } => {
            let book = app::apply(&backend, |book| {
                let mut updated = book
                    .find_grade(&id)
                    .cloned()
                    .with_context(|| format!("no grade with id {id}"))?;
                if let Some(name) = name.as_deref() {
                    updated.name = validation::required_name(name, "grade name")?;
                }
                if exact.is_some() || min.is_some() {
                    updated.value = validation::parse_grade_value(
                        exact.as_deref(),
                        min.as_deref(),
                        max.as_deref(),
                        policy,
                    )?;
                }
                if let Some(raw) = coefficient.as_deref() {
                    updated.coefficient = validation::parse_coefficient(Some(raw), policy)?;
                }
                Ok(book.update_grade(updated)?)
            })
            .await?;
            info!(%id, "grade updated");
            if let Some(grade) = book.find_grade(&id) {
                println!("Grade {} is now {} x{}.", grade.name, grade.value, grade.coefficient);
            }
        }
        Commands::ConfirmGrade { id, undo } => {
            app::apply(&backend, |book| Ok(book.set_confirmed(&id, !undo)?)).await?;
            info!(%id, confirmed = !undo, "grade confirmation changed");
            println!(
                "Grade {id} marked {}.",
                if undo { "provisional" } else { "confirmed" }
            );
        }
        Commands::DeleteUnit { unit } => {
            app::apply(&backend, |book| {
                let unit_id = resolve_unit_id(&book, &unit)?;
                Ok(book.delete_unit(&unit_id)?)
            })
            .await?;
            info!(%unit, "unit deleted");
            println!("Deleted unit {unit}.");
        }
        Commands::DeleteSubject { unit, subject } => {
            app::apply(&backend, |book| {
                let (unit_id, subject_id) = resolve_subject_ids(&book, &unit, &subject)?;
                Ok(book.delete_subject(&unit_id, &subject_id)?)
            })
            .await?;
            info!(%unit, %subject, "subject deleted");
            println!("Deleted subject {subject}.");
        }
        Commands::DeleteGrade { id } => {
            app::apply(&backend, |book| Ok(book.delete_grade(&id)?)).await?;
            info!(%id, "grade deleted");
            println!("Deleted grade {id}.");
        }
        Commands::Summary => {
            let book = app::load_book(&backend).await?;
            print_summary(&book);
        }
        Commands::Report { out } => {
            let book = app::load_book(&backend).await?;
            let report = report::build_report(book.units(), Utc::now().date_naive());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export => {
            println!("{}", app::export_code(&backend).await?);
        }
        Commands::Import { code, dry_run: true } => {
            let preview = app::preview_code(&code)
                .context("invalid code, check that the whole export was copied")?;
            info!(?preview, "import code checked");
            println!(
                "Code is valid: {} units, {} subjects, {} grades. Nothing was changed.",
                preview.units, preview.subjects, preview.grades
            );
        }
        Commands::Import {
            code,
            dry_run: false,
        } => {
            let book = app::import_code(&backend, &code)
                .await
                .context("invalid code, check that the whole export was copied")?;
            println!("Imported {} units.", book.units().len());
        }
        Commands::ImportCsv { csv } => {
            let mut inserted = 0usize;
            app::apply(&backend, |book| {
                let (book, count) = csv_import::import_csv(book, &csv, policy)?;
                inserted = count;
                Ok(book)
            })
            .await?;
            info!(inserted, path = %csv.display(), "csv grades imported");
            println!("Inserted {inserted} grades from {}.", csv.display());
        }
    }

    Ok(())
}
