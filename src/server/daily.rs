//! Daily import schedule.
//!
//! Sleeps until the next local occurrence of the configured wall-clock time,
//! starts the import pipelines, then re-arms for the following day.

use crate::jobs::Pipeline;
use chrono::{DateTime, Local, NaiveTime};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn duration_until_next(now: DateTime<Local>, hour: u32, minute: u32) -> std::time::Duration {
    let target_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let mut target = now.date_naive().and_time(target_time);
    if target <= now.naive_local() {
        target += chrono::Duration::days(1);
    }
    (target - now.naive_local())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

pub async fn run_daily_import(
    pipeline: Arc<Pipeline>,
    hour: u32,
    minute: u32,
    shutdown: CancellationToken,
) {
    info!("Daily import scheduled at {:02}:{:02}", hour, minute);
    loop {
        let wait = duration_until_next(Local::now(), hour, minute);
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Daily import schedule stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        info!("Daily import window reached, starting pipelines");
        if let Err(err) = pipeline.run_import().await {
            error!("Daily import failed to start: {:#}", err);
        }
    }
}
