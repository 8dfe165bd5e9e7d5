//! Daily scheduling and shutdown handling.
//!
//! The worker runs one cycle per day at a fixed local time. Cycles never run
//! back to back: triggers that pass while a cycle is still running are
//! skipped and logged, and the next run waits for the following trigger.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use std::future::pending;
use tokio::signal;
use tracing::{error, info, warn};

/// Parse a `HH:MM` local time of day.
pub fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
}

/// The first datetime strictly after `now` whose time of day is `at`.
pub fn next_trigger(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Daily triggers after `last` that have already passed at `now`.
pub fn skipped_triggers(last: NaiveDateTime, now: NaiveDateTime) -> i64 {
    if now <= last {
        0
    } else {
        (now - last).num_days()
    }
}

async fn sleep_until_local(trigger: NaiveDateTime) {
    let wait = (trigger - Local::now().naive_local())
        .to_std()
        .unwrap_or_default();
    tokio::time::sleep(wait).await;
}

/// Run `job` every day at `at` until a shutdown signal arrives.
pub async fn run_daily<Job, Fut>(at: NaiveTime, mut job: Job)
where
    Job: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let scheduled = async {
        let mut trigger = next_trigger(Local::now().naive_local(), at);
        loop {
            info!(next_run = %trigger, "Waiting for next scheduled run");
            sleep_until_local(trigger).await;

            info!("Running scheduled article generation");
            job().await;

            let now = Local::now().naive_local();
            let skipped = skipped_triggers(trigger, now);
            if skipped > 0 {
                warn!(skipped, "Cycle overran its schedule; skipping missed runs");
            }
            trigger = next_trigger(now, at);
        }
    };

    tokio::select! {
        _ = scheduled => {}
        _ = shutdown_signal() => {
            info!("Worker process terminated");
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
