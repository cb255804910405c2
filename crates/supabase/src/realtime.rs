//! Postgres `LISTEN`/`NOTIFY` change feed.
//!
//! `aq-cli migrate` installs a trigger on each table that runs
//! `pg_notify('<table>_changes', TG_OP)` after every insert, update and
//! delete. The feed is at-least-once at best: a dropped connection is
//! reported as [`ChangeKind::Resync`] so consumers refetch.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::store::{ChangeEvent, ChangeKind, Subscription};

/// Suffix appended to a table name to form its notification channel.
pub const CHANNEL_SUFFIX: &str = "_changes";

const EVENT_BUFFER: usize = 32;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Notification channel for a table.
#[must_use]
pub fn channel_name(table: &str) -> String {
    format!("{table}{CHANNEL_SUFFIX}")
}

/// Listen for changes to `table`.
///
/// # Errors
///
/// Returns an error if the initial connection or `LISTEN` fails.
pub async fn listen(database_url: &SecretString, table: &str) -> Result<Subscription> {
    let mut listener = PgListener::connect(database_url.expose_secret()).await?;
    let channel = channel_name(table);
    listener.listen(&channel).await?;
    tracing::info!(channel = %channel, "Listening for table changes");

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let table = table.to_string();

    let task = tokio::spawn(async move {
        loop {
            let kind = match listener.try_recv().await {
                Ok(Some(notification)) => ChangeKind::from_op(notification.payload()),
                Ok(None) => {
                    tracing::warn!(channel = %channel, "Change feed connection lost, reconnecting");
                    ChangeKind::Resync
                }
                Err(e) => {
                    tracing::error!(channel = %channel, error = %e, "Change feed reconnect failed");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };

            let event = ChangeEvent {
                table: table.clone(),
                kind,
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    Ok(Subscription::new(rx, task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name() {
        assert_eq!(channel_name("products"), "products_changes");
    }
}
