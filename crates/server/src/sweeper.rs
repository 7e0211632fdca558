//! Periodic expiry of invitations, job postings and refresh tokens

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::db::Database;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub invitations: u64,
    pub jobs: u64,
    pub refresh_tokens: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Run one expiry pass as of `now`.
pub async fn sweep(db: &Database, now: DateTime<Utc>) -> Result<SweepReport> {
    Ok(SweepReport {
        invitations: db.expire_invitations(now).await?,
        jobs: db.expire_overdue_jobs(now).await?,
        refresh_tokens: db.purge_expired_refresh_tokens(now).await?,
    })
}

pub fn spawn(db: Database, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match sweep(&db, Utc::now()).await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => tracing::info!(
                    "Expired {} invitations and {} jobs, purged {} refresh tokens",
                    report.invitations,
                    report.jobs,
                    report.refresh_tokens
                ),
                Err(e) => tracing::error!("Expiry sweep failed: {:#}", e),
            }
        }
    })
}
