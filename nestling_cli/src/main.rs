use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use nestling_core::journal::{DOSES_FILE, EVENTS_FILE, GROWTH_FILE};
use nestling_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nestling")]
#[command(about = "Infant care analytics and dosing-safety toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the baby profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Log a care event (feeding, sleep, excretion)
    Log {
        /// Event category (feeding, sleep, excretion)
        #[arg(long)]
        category: String,

        /// Event start, RFC 3339 (e.g. 2026-03-05T19:30:00Z)
        #[arg(long)]
        start: String,

        /// Event end, RFC 3339
        #[arg(long)]
        end: String,
    },

    /// Weekly active-time statistics for a category
    Stats {
        /// Category to summarize (feeding, sleep, excretion)
        #[arg(long)]
        category: String,

        /// Last day of the 7-day window (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Growth tracking and percentile analytics
    Growth {
        #[command(subcommand)]
        command: GrowthCommands,
    },

    /// Antipyretic dosing safety
    Dose {
        #[command(subcommand)]
        command: DoseCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Set the baby profile
    Set {
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: NaiveDate,

        /// Sex (male, female)
        #[arg(long)]
        sex: String,
    },

    /// Show the configured profile
    Show,
}

#[derive(Subcommand)]
enum GrowthCommands {
    /// Record a growth measurement
    Record {
        /// Measurement kind (height, weight, head-size)
        #[arg(long)]
        kind: String,

        /// Measured value (cm for height/head size, kg for weight)
        #[arg(long)]
        value: f64,

        /// Measurement time, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Classify the latest measurement into a percentile band
    Band {
        /// Measurement kind (height, weight, head-size)
        #[arg(long)]
        kind: String,
    },

    /// Print the growth trend series (population median + own samples)
    History {
        /// Measurement kind (height, weight, head-size)
        #[arg(long)]
        kind: String,
    },
}

#[derive(Subcommand)]
enum DoseCommands {
    /// Check whether a dose would be safe to administer now
    Check {
        /// Drug class (acetaminophen, ibuprofen)
        #[arg(long)]
        drug: String,

        /// Proposed amount in milligrams
        #[arg(long)]
        amount_mg: f64,
    },

    /// Check a dose and record it if safe
    Record {
        /// Drug class (acetaminophen, ibuprofen)
        #[arg(long)]
        drug: String,

        /// Administered amount in milligrams
        #[arg(long)]
        amount_mg: f64,

        /// Record even when the safety check disallows
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    nestling_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Profile { command } => match command {
            ProfileCommands::Set { birth_date, sex } => {
                cmd_profile_set(&data_dir, birth_date, &sex)
            }
            ProfileCommands::Show => cmd_profile_show(&data_dir),
        },
        Commands::Log {
            category,
            start,
            end,
        } => cmd_log(&data_dir, &category, &start, &end),
        Commands::Stats { category, date } => cmd_stats(&data_dir, &category, date),
        Commands::Growth { command } => match command {
            GrowthCommands::Record { kind, value, at } => {
                cmd_growth_record(&data_dir, &kind, value, at.as_deref())
            }
            GrowthCommands::Band { kind } => cmd_growth_band(&data_dir, &kind),
            GrowthCommands::History { kind } => cmd_growth_history(&data_dir, &kind),
        },
        Commands::Dose { command } => match command {
            DoseCommands::Check { drug, amount_mg } => {
                cmd_dose_check(&data_dir, &config, &drug, amount_mg)
            }
            DoseCommands::Record {
                drug,
                amount_mg,
                force,
            } => cmd_dose_record(&data_dir, &config, &drug, amount_mg, force),
        },
    }
}

// ============================================================================
// Argument parsing helpers
// ============================================================================

fn parse_category(s: &str) -> Result<DurationCategory> {
    match s.to_lowercase().as_str() {
        "feeding" => Ok(DurationCategory::Feeding),
        "sleep" => Ok(DurationCategory::Sleep),
        "excretion" => Ok(DurationCategory::Excretion),
        other => Err(Error::InvalidInput(format!(
            "unknown category '{}' (expected feeding, sleep, or excretion)",
            other
        ))),
    }
}

fn parse_measurement(s: &str) -> Result<MeasurementType> {
    match s.to_lowercase().as_str() {
        "height" | "length" => Ok(MeasurementType::Height),
        "weight" => Ok(MeasurementType::Weight),
        "head-size" | "head_size" | "head" => Ok(MeasurementType::HeadSize),
        other => Err(Error::InvalidInput(format!(
            "unknown measurement kind '{}' (expected height, weight, or head-size)",
            other
        ))),
    }
}

fn parse_drug(s: &str) -> Result<DrugClass> {
    match s.to_lowercase().as_str() {
        "acetaminophen" | "paracetamol" => Ok(DrugClass::Acetaminophen),
        "ibuprofen" => Ok(DrugClass::Ibuprofen),
        other => Err(Error::InvalidInput(format!(
            "unknown drug class '{}' (expected acetaminophen or ibuprofen)",
            other
        ))),
    }
}

fn parse_sex(s: &str) -> Result<Sex> {
    match s.to_lowercase().as_str() {
        "male" | "m" => Ok(Sex::Male),
        "female" | "f" => Ok(Sex::Female),
        other => Err(Error::InvalidInput(format!(
            "unknown sex '{}' (expected male or female)",
            other
        ))),
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("invalid timestamp '{}': {}", s, e)))
}

// ============================================================================
// Data directory layout
// ============================================================================

fn journal_path(data_dir: &Path, file: &str) -> PathBuf {
    data_dir.join("journal").join(file)
}

fn profile_path(data_dir: &Path) -> PathBuf {
    data_dir.join("profile.json")
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_profile_set(data_dir: &Path, birth_date: NaiveDate, sex: &str) -> Result<()> {
    let profile = BabyProfile {
        birth_date,
        sex: parse_sex(sex)?,
    };

    save_profile(&profile_path(data_dir), &profile)?;

    println!("✓ Profile saved: born {}, {:?}", birth_date, profile.sex);
    Ok(())
}

fn cmd_profile_show(data_dir: &Path) -> Result<()> {
    let profile = require_profile(&profile_path(data_dir))?;
    let today = Utc::now().date_naive();

    println!("Birth date: {}", profile.birth_date);
    println!("Sex:        {:?}", profile.sex);
    println!("Day of life: {}", profile.day_of_life(today));
    println!("Age:        {} months", profile.age_in_months(today));
    Ok(())
}

fn cmd_log(data_dir: &Path, category: &str, start: &str, end: &str) -> Result<()> {
    let category = parse_category(category)?;
    let started_at = parse_timestamp(start)?;
    let ended_at = parse_timestamp(end)?;

    // Rejects an inverted range before anything is written
    let _ = TimeInterval::new(started_at, ended_at)?;

    let event = CareEvent {
        id: uuid::Uuid::new_v4(),
        record_type: category.record_type(),
        started_at,
        ended_at,
    };

    let mut sink = JsonlSink::new(journal_path(data_dir, EVENTS_FILE));
    sink.append(&event)?;

    println!(
        "✓ Logged {} event ({} minutes)",
        category.name(),
        (ended_at - started_at).num_minutes()
    );
    Ok(())
}

fn cmd_stats(data_dir: &Path, category: &str, date: Option<NaiveDate>) -> Result<()> {
    let category = parse_category(category)?;
    let anchor_date = date.unwrap_or_else(|| Utc::now().date_naive());
    let window_start = anchor_date - chrono::Days::new(6);

    let events = journal::load_category_intervals(
        &journal_path(data_dir, EVENTS_FILE),
        category,
        window_start,
        anchor_date,
    )?;

    let stats = weekly_statistics(category, anchor_date, &events);

    println!();
    println!("Weekly {} summary, {} – {}", category.name(), window_start, anchor_date);
    println!("─────────────────────────────────────────");
    for day in &stats.days {
        let blocks: Vec<String> = day
            .blocks
            .iter()
            .map(|b| {
                format!(
                    "{:02}:{:02}–{:02}:{:02}",
                    b.start_minute / 60,
                    b.start_minute % 60,
                    b.end_minute / 60,
                    b.end_minute % 60
                )
            })
            .collect();

        println!(
            "  {}  {:>4} min  {}",
            day.date,
            day.total_minutes(),
            if blocks.is_empty() {
                "-".to_string()
            } else {
                blocks.join(", ")
            }
        );
    }
    println!();
    Ok(())
}

fn cmd_growth_record(data_dir: &Path, kind: &str, value: f64, at: Option<&str>) -> Result<()> {
    let measurement_type = parse_measurement(kind)?;
    if value <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "measurement value must be positive, got {}",
            value
        )));
    }

    let measured_at = match at {
        Some(s) => parse_timestamp(s)?,
        None => Utc::now(),
    };

    let sample = GrowthSample {
        id: uuid::Uuid::new_v4(),
        measurement_type,
        value,
        measured_at,
    };

    let mut sink = JsonlSink::new(journal_path(data_dir, GROWTH_FILE));
    sink.append(&sample)?;

    println!("✓ Recorded {:?} {} at {}", measurement_type, value, measured_at);
    Ok(())
}

fn cmd_growth_band(data_dir: &Path, kind: &str) -> Result<()> {
    let measurement_type = parse_measurement(kind)?;
    let profile = require_profile(&profile_path(data_dir))?;
    let samples = journal::load_growth_samples(&journal_path(data_dir, GROWTH_FILE))?;
    let today = Utc::now().date_naive();

    let band = classify_band(
        builtin_reference(),
        &profile,
        &samples,
        measurement_type,
        today,
    )?;

    let value = latest_sample(&samples, measurement_type)
        .map(|s| s.value)
        .unwrap_or_default();

    println!();
    println!("  {:?}: {} → percentile band {}", measurement_type, value, band);
    if band == TOP_OUT_BAND {
        println!("  (above the 99th percentile of the reference population)");
    }
    println!();
    Ok(())
}

fn cmd_growth_history(data_dir: &Path, kind: &str) -> Result<()> {
    let measurement_type = parse_measurement(kind)?;
    let profile = require_profile(&profile_path(data_dir))?;
    let samples = journal::load_growth_samples(&journal_path(data_dir, GROWTH_FILE))?;
    let today = Utc::now().date_naive();

    let points = growth_history(
        builtin_reference(),
        &profile,
        &samples,
        measurement_type,
        today,
    )?;

    println!();
    println!("  day   median  measured");
    for point in &points {
        println!(
            "  {:>4}  {:>6}  {}",
            point.day_of_life,
            point
                .population_median
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "-".into()),
            point
                .measured
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "-".into()),
        );
    }
    println!();
    Ok(())
}

fn run_safety_check(
    data_dir: &Path,
    config: &Config,
    drug_class: DrugClass,
    amount_mg: f64,
    now: DateTime<Utc>,
) -> Result<SafetyCheckResult> {
    let profile = require_profile(&profile_path(data_dir))?;
    let history = journal::load_dosing_history(&journal_path(data_dir, DOSES_FILE))?;
    let samples = journal::load_growth_samples(&journal_path(data_dir, GROWTH_FILE))?;

    let ctx = DoseCheckContext {
        now,
        birth_date: profile.birth_date,
        drug_class,
        proposed_amount_mg: amount_mg,
        history: &history,
        latest_weight_kg: latest_sample(&samples, MeasurementType::Weight).map(|s| s.value),
    };

    Ok(check_safety(&ctx, &config.dosing))
}

fn display_safety_result(drug_class: DrugClass, amount_mg: f64, result: &SafetyCheckResult) {
    println!();
    if result.allowed {
        println!("  ✓ {} mg {} is SAFE to administer now", amount_mg, drug_class.name());
    } else {
        println!("  ✗ {} mg {} is NOT SAFE to administer now", amount_mg, drug_class.name());
        for violation in &result.violations {
            println!("    - {}", violation.label());
        }
    }
    println!();
}

fn cmd_dose_check(data_dir: &Path, config: &Config, drug: &str, amount_mg: f64) -> Result<()> {
    let drug_class = parse_drug(drug)?;
    let result = run_safety_check(data_dir, config, drug_class, amount_mg, Utc::now())?;

    // A disallowed dose is a domain decision, not a failure
    display_safety_result(drug_class, amount_mg, &result);
    Ok(())
}

fn cmd_dose_record(
    data_dir: &Path,
    config: &Config,
    drug: &str,
    amount_mg: f64,
    force: bool,
) -> Result<()> {
    let drug_class = parse_drug(drug)?;
    let now = Utc::now();
    let result = run_safety_check(data_dir, config, drug_class, amount_mg, now)?;

    display_safety_result(drug_class, amount_mg, &result);

    if !result.allowed && !force {
        println!("  Refusing to record (use --force to override).");
        std::process::exit(1);
    }

    let dose = DosingEvent {
        id: uuid::Uuid::new_v4(),
        drug_class,
        amount_mg,
        administered_at: now,
    };

    let mut sink = JsonlSink::new(journal_path(data_dir, DOSES_FILE));
    sink.append(&dose)?;

    println!("✓ Dose recorded.");
    Ok(())
}
