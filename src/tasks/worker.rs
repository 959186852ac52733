use std::sync::Arc;
use tokio::sync::mpsc;

use super::{Clock, Task};
use crate::services::notification::{DigestOutcome, NotificationDispatcher};

/// Consumes the task queue one task at a time
pub struct TaskWorker {
    receiver: mpsc::Receiver<Task>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Clock,
}

impl TaskWorker {
    pub fn new(receiver: mpsc::Receiver<Task>, dispatcher: Arc<NotificationDispatcher>, clock: Clock) -> Self {
        Self {
            receiver,
            dispatcher,
            clock,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs until every `TaskQueue` handle is dropped
    async fn run(mut self) {
        tracing::info!("Task worker started");
        while let Some(task) = self.receiver.recv().await {
            self.handle(task).await;
        }
        tracing::info!("Task queue closed, worker stopping");
    }

    async fn handle(&self, task: Task) {
        match task {
            Task::NotifySubscribers { post_id } => match self.dispatcher.notify_subscribers(post_id).await {
                Ok(outcome) => tracing::info!(post_id, sent = outcome.sent, failed = outcome.failed, "Post notification done"),
                Err(e) => tracing::error!(post_id, error = %e, "Post notification failed"),
            },
            Task::WeeklyDigest => match self.dispatcher.send_weekly_digest((self.clock)()).await {
                Ok(DigestOutcome::Completed(summary)) => tracing::info!(
                    categories = summary.categories,
                    sent = summary.delivery.sent,
                    failed = summary.delivery.failed,
                    "Weekly digest done"
                ),
                Ok(DigestOutcome::Skipped) => tracing::info!("Weekly digest skipped"),
                Err(e) => tracing::error!(error = %e, "Weekly digest failed"),
            },
            Task::Welcome { user_id } => match self.dispatcher.send_welcome(user_id).await {
                Ok(outcome) => tracing::info!(user_id, sent = outcome.sent, "Welcome email done"),
                Err(e) => tracing::error!(user_id, error = %e, "Welcome email failed"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::repositories::user::tests::{new_user, setup_test_pool};
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::models::UserRole;
    use crate::services::email::testing::RecordingMailer;
    use crate::services::notification::tests::dispatcher;
    use crate::tasks::{system_clock, TaskQueue};

    #[tokio::test]
    async fn test_worker_drains_queue_and_stops() {
        let pool = setup_test_pool().await;
        let users = SqlxUserRepository::new(pool.clone());
        let alice = users
            .create(&new_user("alice", "alice@example.com", UserRole::Common))
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = Arc::new(dispatcher(&pool, mailer.clone(), &Config::default()));
        let (queue, receiver) = TaskQueue::new(8);
        let handle = TaskWorker::new(receiver, dispatcher, system_clock()).spawn();

        queue.enqueue(Task::Welcome { user_id: alice.id }).unwrap();
        // failures are logged, the worker keeps going
        queue.enqueue(Task::NotifySubscribers { post_id: 404 }).unwrap();
        queue.enqueue(Task::WeeklyDigest).unwrap();
        drop(queue);

        handle.await.unwrap();
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");
    }
}
