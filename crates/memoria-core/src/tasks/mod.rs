//! Priority work queue for background tasks: embedding generation, search
//! warm-up, corpus cleanup, batch inserts, and miscellaneous memory
//! operations. Foreground tool handlers never block on this queue beyond
//! enqueueing; failures here are recorded and never propagated to a
//! caller's response.

use std::collections::BinaryHeap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Embedding,
    Search,
    Cleanup,
    BatchInsert,
    MemoryOperation,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Search => "search",
            Self::Cleanup => "cleanup",
            Self::BatchInsert => "batch_insert",
            Self::MemoryOperation => "memory_operation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

struct QueuedTask {
    id: u64,
    kind: TaskKind,
    priority: Priority,
    retry_count: u32,
    max_retries: u32,
    timeout: Duration,
    enqueued_at: Instant,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.id == other.id
    }
}
impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; higher priority and older tasks pop first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Retried,
    Failed,
    TimedOut,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QueueStats {
    pub queue_depth: usize,
    pub in_flight: usize,
    pub completed_total: u64,
    pub failed_total: u64,
    pub average_execution_millis: f64,
}

struct StatsInner {
    completed_total: u64,
    failed_total: u64,
    in_flight: usize,
    total_execution_millis: f64,
    execution_samples: u64,
}

/// Bounded worker set over a priority queue. `submit` enqueues and returns
/// immediately; callers that need the result await the returned handle,
/// callers that don't (most background work) can drop it.
pub struct TaskQueue {
    heap: Mutex<BinaryHeap<QueuedTask>>,
    permits: Semaphore,
    next_id: AtomicU64,
    stats: Mutex<StatsInner>,
}

/// A task's declared timeout elapsed before it completed.
#[derive(Debug, Clone, Copy)]
pub struct Timeout;

impl TaskQueue {
    pub fn new(workers: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            permits: Semaphore::new(workers.max(1)),
            next_id: AtomicU64::new(1),
            stats: Mutex::new(StatsInner {
                completed_total: 0,
                failed_total: 0,
                in_flight: 0,
                total_execution_millis: 0.0,
                execution_samples: 0,
            }),
        }
    }

    fn enqueue(&self, kind: TaskKind, priority: Priority, max_retries: u32, timeout: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let task = QueuedTask {
            id,
            kind,
            priority,
            retry_count: 0,
            max_retries,
            timeout,
            enqueued_at: Instant::now(),
        };
        self.heap.lock().expect("task queue mutex poisoned").push(task);
        id
    }

    /// Runs `work` under a worker permit with priority scheduling and
    /// retry-on-failure up to `max_retries`, re-enqueueing at the back of
    /// its priority tier on each failed attempt. `work` is re-invoked for
    /// each retry — callers should keep it cheap to reconstruct or clone
    /// the closure's captured state.
    pub async fn run<F, Fut, T, E>(
        &self,
        kind: TaskKind,
        priority: Priority,
        max_retries: u32,
        timeout: Duration,
        mut work: F,
    ) -> Result<T, TaskFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let id = self.enqueue(kind, priority, max_retries, timeout);
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("task queue semaphore closed");
        self.pop_matching(id);

        {
            let mut stats = self.stats.lock().expect("task stats mutex poisoned");
            stats.in_flight += 1;
        }

        let mut attempt = 0;
        let result = loop {
            let started = Instant::now();
            let attempt_result = tokio::time::timeout(timeout, work()).await;
            let elapsed = started.elapsed();

            match attempt_result {
                Ok(Ok(value)) => {
                    self.record_execution(elapsed, TaskOutcome::Completed);
                    break Ok(value);
                }
                Ok(Err(err)) => {
                    attempt += 1;
                    if attempt > max_retries {
                        self.record_execution(elapsed, TaskOutcome::Failed);
                        break Err(TaskFailure::Failed(err));
                    }
                    self.record_execution(elapsed, TaskOutcome::Retried);
                }
                Err(_elapsed) => {
                    attempt += 1;
                    if attempt > max_retries {
                        self.record_execution(elapsed, TaskOutcome::TimedOut);
                        break Err(TaskFailure::TimedOut);
                    }
                    self.record_execution(elapsed, TaskOutcome::Retried);
                }
            }
        };

        {
            let mut stats = self.stats.lock().expect("task stats mutex poisoned");
            stats.in_flight = stats.in_flight.saturating_sub(1);
        }

        result
    }

    fn pop_matching(&self, id: u64) {
        let mut heap = self.heap.lock().expect("task queue mutex poisoned");
        let mut rest: Vec<QueuedTask> = Vec::new();
        while let Some(task) = heap.pop() {
            if task.id == id {
                break;
            }
            rest.push(task);
        }
        for task in rest {
            heap.push(task);
        }
    }

    fn record_execution(&self, elapsed: Duration, outcome: TaskOutcome) {
        let mut stats = self.stats.lock().expect("task stats mutex poisoned");
        stats.execution_samples += 1;
        let millis = elapsed.as_secs_f64() * 1000.0;
        stats.total_execution_millis += millis;
        match outcome {
            TaskOutcome::Completed => stats.completed_total += 1,
            TaskOutcome::Failed | TaskOutcome::TimedOut => stats.failed_total += 1,
            TaskOutcome::Retried => {}
        }
    }

    pub fn stats(&self) -> QueueStats {
        let stats = self.stats.lock().expect("task stats mutex poisoned");
        let queue_depth = self.heap.lock().expect("task queue mutex poisoned").len();
        let average_execution_millis = if stats.execution_samples == 0 {
            0.0
        } else {
            stats.total_execution_millis / stats.execution_samples as f64
        };
        QueueStats {
            queue_depth,
            in_flight: stats.in_flight,
            completed_total: stats.completed_total,
            failed_total: stats.failed_total,
            average_execution_millis,
        }
    }
}

#[derive(Debug)]
pub enum TaskFailure<E> {
    Failed(E),
    TimedOut,
}
