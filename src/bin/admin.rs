//! confsched administrative CLI
//!
//! Operator tooling for tasks that do not go through the public API, most
//! importantly moving a whole event to a new start date.
//!
//! # Usage
//!
//! ```bash
//! confsched-admin move-event <slug> <YYYY-MM-DD>
//! confsched-admin release <slug> [version] [comment]
//! confsched-admin suggest-version <slug>
//! confsched-admin schedules <slug>
//! ```
//!
//! The repository backend is selected the same way as for the server:
//! `REPOSITORY_TYPE` / `DATABASE_URL` environment variables, defaulting to
//! the in-memory backend when no database is configured.

use std::env;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use confsched::db::{self, services};

fn print_usage() {
    eprintln!("Usage: confsched-admin <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  move-event <slug> <YYYY-MM-DD>   Move an event to a new start date");
    eprintln!("  release <slug> [version] [comment]");
    eprintln!("                                   Release the work-in-progress schedule");
    eprintln!("  suggest-version <slug>           Print the suggested next version");
    eprintln!("  schedules <slug>                 List the schedules of an event");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::WARN),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    db::init_repository()?;
    let repo = db::get_repository()?.as_ref();

    match command {
        "move-event" => {
            let [_, slug, date] = args.as_slice() else {
                bail!("move-event requires <slug> and <YYYY-MM-DD>");
            };
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date \"{}\", expected YYYY-MM-DD", date))?;
            let report = services::shift_event_by_slug(repo, slug, date).await?;
            if report.delta_days == 0 {
                println!("Event \"{}\" already starts on {}; nothing to do", slug, date);
            } else {
                println!(
                    "Moved event \"{}\" by {} day(s): {} slot(s), {} availability window(s)",
                    slug, report.delta_days, report.slots_shifted, report.availabilities_shifted
                );
            }
        }
        "release" => {
            let slug = args.get(1).map(String::as_str);
            let Some(slug) = slug else {
                bail!("release requires an event <slug>");
            };
            let event = services::get_event_by_slug(repo, slug).await?;
            let event_id = event.id.context("Stored event is missing its primary key")?;

            let version = match args.get(2) {
                Some(version) => version.clone(),
                None => {
                    let suggestion = services::suggest_version(repo, event_id).await?;
                    if suggestion.is_empty() {
                        bail!(
                            "The next version cannot be guessed from the previous one; \
                             pass a version explicitly"
                        );
                    }
                    suggestion
                }
            };
            let comment = args.get(3).map(String::as_str);

            let (released, _) =
                services::release_schedule(repo, event_id, &version, comment).await?;
            println!(
                "Released schedule \"{}\" for event \"{}\"",
                released.version.as_deref().unwrap_or("?"),
                slug
            );
        }
        "suggest-version" => {
            let Some(slug) = args.get(1) else {
                bail!("suggest-version requires an event <slug>");
            };
            let event = services::get_event_by_slug(repo, slug).await?;
            let event_id = event.id.context("Stored event is missing its primary key")?;
            let suggestion = services::suggest_version(repo, event_id).await?;
            if suggestion.is_empty() {
                println!("No suggestion possible; the previous version has no trailing number");
            } else {
                println!("{}", suggestion);
            }
        }
        "schedules" => {
            let Some(slug) = args.get(1) else {
                bail!("schedules requires an event <slug>");
            };
            let event = services::get_event_by_slug(repo, slug).await?;
            let event_id = event.id.context("Stored event is missing its primary key")?;
            let schedules = services::list_schedules(repo, event_id).await?;
            for info in schedules {
                let version = info.version.as_deref().unwrap_or("(work in progress)");
                let published = info
                    .published
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} published={:<28} slots={}",
                    version, published, info.slot_count
                );
            }
        }
        _ => {
            print_usage();
            std::process::exit(2);
        }
    }

    Ok(())
}
