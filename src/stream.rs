// src/stream.rs
// SSE subscription to the host server's event stream

use std::time::Duration;

use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::event::ServerEvent;
use crate::reflect::IdleReflectionTrigger;

/// Delay before reopening the stream after it closes
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connect timeout for the stream request. No overall request timeout:
/// the stream is expected to stay open indefinitely.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscribe to `{base}/event` and feed every record to the trigger.
///
/// Runs until the process is stopped. Transport errors are retried by
/// the EventSource itself; a closed stream is reopened after a short
/// delay. Nothing here aborts the process.
pub async fn run(base_url: &Url, trigger: &IdleReflectionTrigger) -> Result<()> {
    let url = base_url.join("event")?;
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    loop {
        subscribe_once(&client, url.clone(), trigger).await;
        warn!(
            delay_secs = RECONNECT_DELAY.as_secs(),
            "event stream closed, reconnecting"
        );
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn subscribe_once(client: &reqwest::Client, url: Url, trigger: &IdleReflectionTrigger) {
    let mut es = match EventSource::new(client.get(url)) {
        Ok(es) => es,
        Err(e) => {
            warn!(error = %e, "failed to open event stream");
            return;
        }
    };

    while let Some(event) = es.next().await {
        match event {
            Ok(Event::Open) => {
                debug!("event stream opened");
            }
            Ok(Event::Message(msg)) => match ServerEvent::from_json(&msg.data) {
                Ok(record) => {
                    debug!(kind = %record.kind, "event received");
                    trigger.handle(&record).await;
                }
                Err(e) => {
                    debug!(error = %e, "skipping undecodable event");
                }
            },
            Err(e) => {
                // The EventSource retries on its own; only log here.
                warn!(error = %e, "event stream error");
            }
        }
    }
}
