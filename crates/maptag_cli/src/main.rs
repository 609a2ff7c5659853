//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open (and migrate) a MapTag database to verify `maptag_core` wiring.
//! - Print a deterministic summary of queue and review state.
//! - Register one address from the command line.
//!
//! Usage:
//! - `maptag_cli [DB_PATH]` prints the summary. Without a path an in-memory
//!   database is used.
//! - `maptag_cli DB_PATH register LAT LON NAME [CATEGORY]` creates an address
//!   and prints its code and share links.
//!
//! Set `MAPTAG_LOG_DIR` to an absolute directory to enable file logging.

use log::info;
use maptag_core::{
    open_db, open_db_in_memory, AddressService, AddressServiceError, CreateAddressRequest,
    QueueListQuery, RandomSuffix, ReportService, SqliteAddressRepository,
    SqliteDuplicateReportRepository, SqliteVerificationRepository, VerificationService,
};
use rusqlite::Connection;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("MAPTAG_LOG_DIR") {
        maptag_core::init_logging(maptag_core::default_log_level(), &log_dir)?;
    }

    println!("maptag_core ping={}", maptag_core::ping());
    println!("maptag_core version={}", maptag_core::core_version());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut conn = match args.first() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    match args.get(1).map(String::as_str) {
        None => summarize(&mut conn),
        Some("register") => register(&mut conn, &args[2..]),
        Some(other) => Err(format!("unknown command `{other}`").into()),
    }
}

fn register(conn: &mut Connection, args: &[String]) -> Result<(), Box<dyn Error>> {
    let [lat, lon, name, rest @ ..] = args else {
        return Err("usage: maptag_cli DB_PATH register LAT LON NAME [CATEGORY]".into());
    };
    let mut request = CreateAddressRequest::new(lat.parse()?, lon.parse()?, name.as_str());
    if let Some(category) = rest.first() {
        request = request.with_category(category.as_str());
    }

    let mut service = AddressService::new(
        SqliteAddressRepository::try_new(conn)?,
        RandomSuffix::from_entropy(),
    );
    match service.create_address(request) {
        Ok(created) => {
            println!("code={}", created.address.code);
            println!("share_url={}", created.links.share_url);
            println!("short_url={}", created.links.short_url);
            info!(
                "event=cli_register module=cli status=ok code={}",
                created.address.code
            );
            Ok(())
        }
        Err(AddressServiceError::Conflict { candidates }) => {
            for candidate in &candidates {
                println!(
                    "conflict code={} distance_m={:.1} probability={:.2}",
                    candidate.address.code,
                    candidate.distance_m,
                    candidate.duplicate_probability()
                );
            }
            Err(format!("{} nearby address(es) look like duplicates", candidates.len()).into())
        }
        Err(err) => Err(err.into()),
    }
}

fn summarize(conn: &mut Connection) -> Result<(), Box<dyn Error>> {
    let review_feed = {
        let reports = ReportService::new(SqliteDuplicateReportRepository::try_new(conn)?);
        reports.review_feed(None)?.len()
    };

    let verification = VerificationService::new(SqliteVerificationRepository::try_new(conn)?);
    let stats = verification.stats()?;
    let pending_queue = verification.list_queue(&QueueListQuery::default())?.len();

    println!(
        "addresses total={} pending={} verified={} rejected={} flagged={} avg_confidence={:.1}",
        stats.addresses.total,
        stats.addresses.pending,
        stats.addresses.verified,
        stats.addresses.rejected,
        stats.addresses.flagged,
        stats.addresses.avg_confidence
    );
    println!(
        "queue pending={} processing={} completed={} verification_rate={:.1}%",
        stats.queue.pending,
        stats.queue.processing,
        stats.queue.completed,
        stats.verification_rate()
    );
    println!("queue_head={pending_queue} review_feed={review_feed}");

    info!(
        "event=cli_summary module=cli status=ok addresses={} review_feed={review_feed}",
        stats.addresses.total
    );
    Ok(())
}
