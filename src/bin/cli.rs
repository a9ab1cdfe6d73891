use anyhow::{Context, Result};
use chrono::Local;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::fs;
use std::str::FromStr;
use vigia::config::Config;
use vigia::controller::{Auditor, IngestOutcome};
use vigia::model::adapter;
use vigia::model::item::{EventStatus, RecordOrigin};
use vigia::storage::{AuditStore, LocalStore};

fn main() -> Result<()> {
    let _ = TermLogger::init(
        LevelFilter::Warn,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" || args[1] == "help" {
        vigia::cli::print_help();
        return Ok(());
    }

    let config = Config::load();
    let mut auditor = Auditor::new(LocalStore::open(config));
    let now = Local::now().naive_local();

    // Housekeeping must never block the actual command.
    if let Err(e) = auditor.autopurge(now) {
        log::warn!("autopurge failed: {}", e);
    }

    match args[1].as_str() {
        "ingest" => {
            let text = args
                .get(2)
                .filter(|t| !t.starts_with("--"))
                .context("Usage: vigia ingest <text> [--origin <o>]")?;
            let origin = flag_value(&args, "--origin")
                .map(|v| RecordOrigin::from_str(&v))
                .transpose()
                .map_err(|_| anyhow::anyhow!("Unknown origin"))?
                .unwrap_or(RecordOrigin::Paste);

            match auditor.ingest(text, origin, now)? {
                IngestOutcome::Created { event_id } => {
                    let event = auditor
                        .store
                        .get_potential_event(&event_id)?
                        .context("Commitment vanished after creation")?;
                    println!(
                        "{} [{}] {} ({})",
                        event.id, event.status, event.summary, event.start
                    );
                }
                IngestOutcome::Duplicate { event_id } => {
                    println!("Already tracked: {}", event_id);
                }
                IngestOutcome::NoDate => {
                    println!("No date found; text kept for audit.");
                }
            }
        }
        "import" => {
            let path = args.get(2).context("Usage: vigia import <file.ics>")?;
            let raw_ics = fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path))?;
            let count = auditor.import_calendar(&raw_ics, now)?;
            println!("Imported {} calendar events.", count);
        }
        "export" => {
            let events = auditor.store.all_calendar_events()?;
            print!("{}", adapter::events_to_ics(&events));
        }
        "list" => {
            let filter = flag_value(&args, "--status")
                .map(|v| EventStatus::from_str(&v))
                .transpose()
                .map_err(|_| anyhow::anyhow!("Unknown status"))?;
            let mut events = auditor.store.all_potential_events()?;
            events.sort_by_key(|e| e.start);
            for event in events {
                if filter.is_some_and(|f| f != event.status) {
                    continue;
                }
                println!(
                    "{} [{}] {} ({})",
                    event.id, event.status, event.summary, event.start
                );
            }
        }
        "status" => {
            let id = args
                .get(2)
                .context("Usage: vigia status <id> <new-status>")?;
            let requested = args
                .get(3)
                .and_then(|v| EventStatus::from_str(v).ok())
                .context("Usage: vigia status <id> <new-status>")?;
            auditor.set_status(id, requested, now)?;
            println!("{} -> {}", id, requested);
        }
        "recalc" => {
            let changed = auditor.recalculate_statuses(now)?;
            println!("{} statuses updated.", changed);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            vigia::cli::print_help();
            std::process::exit(2);
        }
    }

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
