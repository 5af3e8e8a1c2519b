//! Long-running daemon: two timers sharing one scheduler.
//!
//! The refresh timer re-fetches today's tasks and merges them; the check
//! timer evaluates due alerts and hands them to the sink. The scheduler is
//! the only shared state, behind a mutex that is never held across a fetch
//! or a delivery.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use taskping_core::AlertScheduler;

use crate::config::{Config, Secrets, SinkChoice};
use crate::notion::NotionClient;
use crate::sink::Sink;

pub async fn run(cfg: Config, secrets: Secrets, once: bool) -> Result<()> {
    let tz: Tz = cfg
        .source
        .timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {}", cfg.source.timezone))?;

    let client = NotionClient::new(secrets.notion_token.clone(), secrets.database_id.clone())
        .context("building task source client")?;

    let sink = match cfg.delivery.sink {
        SinkChoice::Webhook => {
            let url = secrets
                .webhook_url
                .clone()
                .context("DISCORD_WEBHOOK_URL must be set for the webhook sink")?;
            Sink::webhook(url, tz)
        }
        SinkChoice::Desktop => Sink::desktop(tz),
    };

    let scheduler = Arc::new(Mutex::new(AlertScheduler::new(cfg.alerts.kinds.clone())));

    // First fetch is the startup connectivity check: fail fast on
    // misconfiguration instead of polling a dead source forever.
    let today = Utc::now().with_timezone(&tz).date_naive();
    let tasks = client
        .fetch_tasks(today, tz, &cfg.source.status)
        .await
        .context("initial fetch from task source failed")?;
    info!(count = tasks.len(), "tracking today's tasks");
    scheduler.lock().await.merge(tasks);

    if once {
        check_once(&scheduler, &sink).await;
        return Ok(());
    }

    let refresh = {
        let scheduler = scheduler.clone();
        let status = cfg.source.status.clone();
        let period = Duration::from_secs(cfg.poll.refresh_secs);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The startup fetch already covered the immediate first tick.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let today = Utc::now().with_timezone(&tz).date_naive();
                match client.fetch_tasks(today, tz, &status).await {
                    Ok(tasks) => {
                        let mut s = scheduler.lock().await;
                        s.merge(tasks);
                        info!(count = s.task_count(), "refreshed tracked tasks");
                    }
                    // Keep the stale set; the next refresh retries.
                    Err(e) => warn!("refresh skipped: {e}"),
                }
            }
        })
    };

    let check = {
        let scheduler = scheduler.clone();
        let period = Duration::from_secs(cfg.poll.check_secs);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                check_once(&scheduler, &sink).await;
            }
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    refresh.abort();
    check.abort();
    Ok(())
}

/// One check tick: collect due alerts under the lock, deliver after
/// releasing it. Delivery failures keep the fired flag set; no retry.
async fn check_once(scheduler: &Arc<Mutex<AlertScheduler>>, sink: &Sink) {
    let due = scheduler.lock().await.check_due(Utc::now());
    for n in due {
        match sink.deliver(&n).await {
            Ok(()) => info!(task = %n.task.title, kind = ?n.kind, "alert delivered"),
            Err(e) => warn!(task = %n.task.title, kind = ?n.kind, "delivery failed: {e}"),
        }
    }
}
