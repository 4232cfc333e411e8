//! The reminder scheduler — a periodic due-scan driving the notification
//! dispatcher.
//!
//! One in-process task ticks every `tick` interval, claims due reminders
//! from the store (stamping their dispatch instant in the same transaction),
//! and fires a detached delivery task per reminder. Failures are logged and
//! never propagate: the scheduler runs out-of-band from tool callers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::watch;

use crate::error::{MosaicError, Result};
use crate::notify::NotificationDispatcher;
use crate::store::reminders;
use crate::store::types::Reminder;

pub struct Scheduler {
    db: Arc<Mutex<Connection>>,
    dispatcher: Arc<NotificationDispatcher>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        dispatcher: Arc<NotificationDispatcher>,
        tick: Duration,
    ) -> Self {
        Self {
            db,
            dispatcher,
            tick,
        }
    }

    /// Run the scheduler loop until shutdown is signalled. The in-flight
    /// check-due pass always completes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(tick_secs = self.tick.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.check_due().await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(count = n, "dispatched due reminders"),
                        Err(e) => tracing::error!(error = %e, "check-due pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }

    /// One check-due pass: claim everything due right now and hand each
    /// reminder to the dispatcher. Dispatch is fire-and-forget per reminder
    /// so one slow bridge call cannot stall the scan.
    pub async fn check_due(&self) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let due: Vec<Reminder> = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| MosaicError::Internal(anyhow::anyhow!("db lock poisoned: {e}")))?;
            reminders::claim_due(&mut conn, Utc::now())
        })
        .await
        .map_err(|e| MosaicError::Internal(anyhow::anyhow!("check-due task failed: {e}")))??;

        let count = due.len();
        for reminder in due {
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                let metadata = serde_json::json!({
                    "reminder_id": reminder.id,
                    "reminder_time": reminder.reminder_time,
                    "related_entity_type": reminder.related_entity_type,
                    "related_entity_id": reminder.related_entity_id,
                });
                match dispatcher
                    .notify("Reminder", &reminder.message, None, Some(&metadata))
                    .await
                {
                    Ok(receipt) if receipt.delivered => {
                        tracing::info!(
                            reminder_id = reminder.id,
                            attempts = receipt.attempts,
                            "reminder notification delivered"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!(
                            reminder_id = reminder.id,
                            "reminder dispatch skipped (notifications disabled)"
                        );
                    }
                    Err(e) => {
                        // The reminder stays dispatched; the user can edit its
                        // time to re-trigger delivery.
                        tracing::error!(
                            reminder_id = reminder.id,
                            error = %e,
                            "reminder notification failed"
                        );
                    }
                }
            });
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RetryPolicy;
    use crate::store::reminders::{create_reminder, NewReminder};
    use chrono::Duration as ChronoDuration;

    fn test_scheduler(db: Arc<Mutex<Connection>>) -> Scheduler {
        let dispatcher = Arc::new(NotificationDispatcher::new(
            None,
            false,
            None,
            RetryPolicy::default(),
        ));
        Scheduler::new(db, dispatcher, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn check_due_claims_each_reminder_once() {
        let conn = crate::db::open_memory_database().unwrap();
        let past = Utc::now() - ChronoDuration::minutes(5);
        create_reminder(
            &conn,
            NewReminder {
                reminder_time: past,
                message: "due now".into(),
                recurrence_config: None,
                related_entity_type: None,
                related_entity_id: None,
                tags: vec![],
            },
        )
        .unwrap();
        let db = Arc::new(Mutex::new(conn));

        let scheduler = test_scheduler(Arc::clone(&db));
        assert_eq!(scheduler.check_due().await.unwrap(), 1);
        assert_eq!(scheduler.check_due().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn future_and_completed_reminders_are_ignored() {
        let conn = crate::db::open_memory_database().unwrap();
        create_reminder(
            &conn,
            NewReminder {
                reminder_time: Utc::now() + ChronoDuration::hours(1),
                message: "future".into(),
                recurrence_config: None,
                related_entity_type: None,
                related_entity_id: None,
                tags: vec![],
            },
        )
        .unwrap();
        let done = create_reminder(
            &conn,
            NewReminder {
                reminder_time: Utc::now() - ChronoDuration::hours(1),
                message: "done".into(),
                recurrence_config: None,
                related_entity_type: None,
                related_entity_id: None,
                tags: vec![],
            },
        )
        .unwrap();
        conn.execute(
            "UPDATE reminders SET is_completed = 1 WHERE id = ?1",
            [done.id],
        )
        .unwrap();
        let db = Arc::new(Mutex::new(conn));

        let scheduler = test_scheduler(db);
        assert_eq!(scheduler.check_due().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_exits_on_shutdown_signal() {
        let conn = crate::db::open_memory_database().unwrap();
        let db = Arc::new(Mutex::new(conn));
        let scheduler = test_scheduler(db);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }
}
