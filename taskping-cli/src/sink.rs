//! Delivery sinks: chat webhook (rich embed) and desktop notifications.
//!
//! Fire-and-forget from the scheduler's viewpoint: a failed delivery is
//! logged by the caller and the alert stays marked fired, since re-sending
//! later would be a stale notification.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;
use tokio::process::Command;

use taskping_core::{AlertKind, Notification};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("notify-send failed: {0}")]
    Desktop(String),
}

pub struct Sink {
    tz: Tz,
    transport: Transport,
}

enum Transport {
    Webhook { http: reqwest::Client, url: String },
    Desktop,
}

impl Sink {
    pub fn webhook(url: impl Into<String>, tz: Tz) -> Self {
        Self {
            tz,
            transport: Transport::Webhook {
                http: reqwest::Client::new(),
                url: url.into(),
            },
        }
    }

    pub fn desktop(tz: Tz) -> Self {
        Self {
            tz,
            transport: Transport::Desktop,
        }
    }

    pub async fn deliver(&self, n: &Notification) -> Result<(), DeliveryError> {
        match &self.transport {
            Transport::Webhook { http, url } => self.deliver_webhook(http, url, n).await,
            Transport::Desktop => self.deliver_desktop(n).await,
        }
    }

    async fn deliver_webhook(
        &self,
        http: &reqwest::Client,
        url: &str,
        n: &Notification,
    ) -> Result<(), DeliveryError> {
        let payload = webhook_payload(n, self.tz);
        let resp = http.post(url).json(&payload).send().await?;

        // Discord answers 204 on success; anything else is a rejection.
        if resp.status().as_u16() != 204 {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }
        Ok(())
    }

    async fn deliver_desktop(&self, n: &Notification) -> Result<(), DeliveryError> {
        let status = Command::new("notify-send")
            .arg("--app-name=taskping")
            .arg(format!("{} {}", emoji(n.kind), alert_title(n)))
            .arg(alert_body(n, self.tz))
            .status()
            .await
            .map_err(|e| DeliveryError::Desktop(e.to_string()))?;

        if !status.success() {
            return Err(DeliveryError::Desktop(format!("exit status {status}")));
        }
        Ok(())
    }
}

fn emoji(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::Prepare => "\u{1F9E0}",
        AlertKind::Start => "\u{1F3AF}",
        AlertKind::SoftStop => "\u{1F504}",
        AlertKind::End => "\u{1F6D1}",
    }
}

fn alert_title(n: &Notification) -> String {
    match n.kind {
        AlertKind::Prepare => match n.task.prepare_minutes {
            Some(m) => format!("Prepare - {m} min warning"),
            None => n.kind.label().to_string(),
        },
        AlertKind::SoftStop => match n.task.soft_stop_minutes {
            Some(m) => format!("Soft Stop - {m} min warning"),
            None => n.kind.label().to_string(),
        },
        AlertKind::Start | AlertKind::End => n.kind.label().to_string(),
    }
}

fn alert_body(n: &Notification, tz: Tz) -> String {
    match n.kind {
        AlertKind::Prepare => format!(
            "Start getting ready to shift gears\n{}\nStarts at {}",
            n.task.title,
            local_hhmm(n.task.start, tz)
        ),
        AlertKind::Start => format!("Lock in and begin the task\n{}", n.task.title),
        AlertKind::SoftStop => match n.task.end {
            Some(end) => format!(
                "Start winding down\n{}\nEnds at {}",
                n.task.title,
                local_hhmm(end, tz)
            ),
            None => format!("Start winding down\n{}", n.task.title),
        },
        AlertKind::End => format!("Disengage now\n{}", n.task.title),
    }
}

fn local_hhmm(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%H:%M").to_string()
}

fn webhook_payload(n: &Notification, tz: Tz) -> serde_json::Value {
    let mut fields = vec![
        json!({ "name": "Task", "value": n.task.title, "inline": true }),
        json!({
            "name": "Open in Notion",
            "value": format!("[Click here to open task]({})", n.task.url),
            "inline": true,
        }),
        json!({ "name": "Start Time", "value": local_hhmm(n.task.start, tz), "inline": true }),
    ];
    if let Some(end) = n.task.end {
        fields.push(json!({ "name": "End Time", "value": local_hhmm(end, tz), "inline": true }));
    }

    json!({
        "content": format!("@here {} **Task Alert**", emoji(n.kind)),
        "username": "taskping",
        "avatar_url": "https://www.notion.so/images/favicon.ico",
        "embeds": [{
            "title": format!("{} {}", emoji(n.kind), alert_title(n)),
            "description": alert_body(n, tz),
            "color": n.kind.color(),
            "timestamp": n.fired_at.to_rfc3339(),
            "fields": fields,
        }],
    })
}
