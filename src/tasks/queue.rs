use tokio::sync::mpsc;

/// Default queue depth
pub const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Email the subscribers of a freshly published post
    NotifySubscribers { post_id: i64 },
    WeeklyDigest,
    Welcome { user_id: i64 },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotifySubscribers { .. } => "notify_subscribers",
            Self::WeeklyDigest => "weekly_digest",
            Self::Welcome { .. } => "welcome",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("task queue is full")]
    Full,

    #[error("task worker has stopped")]
    Closed,
}

/// Sending half of the task channel. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<Task>,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Task>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queue a task without waiting for room
    pub fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        match self.sender.try_send(task) {
            Ok(()) => {
                tracing::debug!(task = task.name(), "Task queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(task = task.name(), "Task queue full, task dropped");
                Err(QueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::error!(task = task.name(), "Task worker stopped, task dropped");
                Err(QueueError::Closed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_and_receive() {
        let (queue, mut receiver) = TaskQueue::new(4);
        queue.enqueue(Task::NotifySubscribers { post_id: 7 }).unwrap();
        queue.enqueue(Task::WeeklyDigest).unwrap();

        assert_eq!(receiver.recv().await, Some(Task::NotifySubscribers { post_id: 7 }));
        assert_eq!(receiver.recv().await, Some(Task::WeeklyDigest));
    }

    #[test]
    fn test_full_queue_does_not_block() {
        let (queue, _receiver) = TaskQueue::new(1);
        queue.enqueue(Task::WeeklyDigest).unwrap();
        assert_eq!(queue.enqueue(Task::WeeklyDigest), Err(QueueError::Full));
    }

    #[test]
    fn test_closed_queue() {
        let (queue, receiver) = TaskQueue::new(1);
        drop(receiver);
        assert_eq!(queue.enqueue(Task::Welcome { user_id: 1 }), Err(QueueError::Closed));
    }
}
