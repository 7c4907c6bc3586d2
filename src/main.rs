use anyhow::{Context, Result};
use archive_timeline::{
    logging, Config, DateRange, FileFragment, IngestSlot, MediaKind, PersistenceCache, Session,
    SortDirection, TweetRecord,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "archive-timeline")]
#[command(about = "Merge Twitter/X archive fragments into one cached timeline", long_about = None)]
struct Cli {
    /// Keep the timeline in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest fragments and replace the cached timeline
    Ingest {
        /// LABEL=PATH, one per person (repeatable)
        #[arg(long = "slot", value_parser = parse_slot, required = true)]
        slots: Vec<(String, PathBuf)>,
    },
    /// Print the cached timeline
    Show(ShowArgs),
    /// Delete the cached timeline
    Clear,
}

#[derive(Args)]
struct ShowArgs {
    /// Extra pages to reveal beyond the first
    #[arg(long, default_value_t = 0)]
    more: usize,

    /// Only records with a photo
    #[arg(long, conflicts_with_all = ["from", "to", "search", "oldest_first"])]
    media: bool,

    /// First day to include (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["search", "oldest_first"])]
    from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["search", "oldest_first"])]
    to: Option<NaiveDate>,

    /// Case-sensitive text or owner match
    #[arg(long, conflicts_with = "oldest_first")]
    search: Option<String>,

    /// Oldest records first
    #[arg(long)]
    oldest_first: bool,
}

fn parse_slot(raw: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=PATH, got `{raw}`"))?;
    if label.trim().is_empty() || path.trim().is_empty() {
        return Err(format!("expected LABEL=PATH, got `{raw}`"));
    }
    Ok((label.trim().to_string(), PathBuf::from(path.trim())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;
    logging::init(&config.log_level);

    let cache = if cli.ephemeral {
        PersistenceCache::in_memory()
    } else {
        PersistenceCache::file_backed(&config.resolved_data_dir())
    };
    let mut session = Session::from_config(cache, &config)?;

    match cli.command {
        Command::Ingest { slots } => {
            let slots = slots
                .into_iter()
                .map(|(label, path)| IngestSlot::new(Arc::new(FileFragment::new(path)), label))
                .collect();
            let outcome = session.ingest_slots(slots).await?;
            outcome
                .persisted
                .await
                .context("cache write task failed")?
                .context("failed to cache timeline")?;
            println!("Ingested {} records.", outcome.record_count);
            print_visible(&session);
        }
        Command::Show(args) => {
            if let Err(e) = session.restore().await {
                tracing::warn!(error = %e, "cache unavailable, starting empty");
            }
            apply_view(&mut session, &args);
            for _ in 0..args.more {
                if !session.on_sentinel_visible() {
                    break;
                }
            }
            print_visible(&session);
        }
        Command::Clear => {
            session.clear().await.context("failed to clear cache")?;
            println!("Timeline cleared.");
        }
    }

    Ok(())
}

fn apply_view(session: &mut Session, args: &ShowArgs) {
    if args.media {
        session.filter_by_media();
    } else if args.from.is_some() || args.to.is_some() {
        let range = DateRange::from_dates(args.from, args.to, session.display_tz());
        session.filter_by_date_range(range);
    } else if let Some(query) = &args.search {
        session.search(query);
    } else if args.oldest_first {
        session.sort_by_time(SortDirection::Ascending);
    }
}

fn print_visible(session: &Session) {
    let visible = session.visible();
    if visible.is_empty() {
        println!("No records.");
        return;
    }

    for (i, record) in visible.iter().enumerate() {
        print_record(i + 1, record);
    }
    println!(
        "-- showing {} of {} --",
        visible.len(),
        session.current_list().len()
    );
}

fn print_record(index: usize, record: &TweetRecord) {
    println!(
        "{}. {} | {}",
        index, record.owner_label, record.display_timestamp
    );
    for line in record.raw_text.lines() {
        println!("   {}", line);
    }
    for media in &record.attachments {
        let kind = match media.kind {
            MediaKind::Photo => "photo",
            MediaKind::Other => "media",
        };
        println!("   [{}] {}", kind, media.url);
    }
}
