use std::{
    any::Any,
    cell::Cell,
    io,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, SendError, Sender, unbounded};
use log::{debug, trace, warn};

use crate::support::constraint::{Constrained, StrictlyPositive};

use super::{BoxError, CancelToken, Job, JobContext, JobError, TileAssignment};

/// Interval at which a join wait re-checks the caller's cancel token.
const JOIN_POLL: Duration = Duration::from_millis(5);

type Task = Box<dyn FnOnce() + Send>;

static NEXT_SCHEDULER_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Id of the scheduler owning the current thread, if it is a worker.
    static WORKER_OF: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Effective parallelism cap.
    ///
    /// `None` uses the host's available parallelism; larger values are
    /// clamped to it.
    pub parallelism: Option<Constrained<usize, StrictlyPositive>>,

    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallelism: None,
            thread_name_prefix: "uv-worker".to_string(),
        }
    }
}

/// Lifecycle of a [`Scheduler`]. The transition is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Ready,
    Shutdown,
}

/// Observable state of a forked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Fixed-size pool of worker threads with fork/join submission.
///
/// The pool is sized once at construction and started eagerly. One pool is
/// meant to be shared by every service of a process: construct it at the
/// composition root and hand out `Arc<Scheduler>`.
///
/// A job may fork onto the scheduler running it; such nested batches run on
/// the worker itself, since blocking it on the shared queue could starve the
/// pool.
///
/// Dropping the scheduler shuts it down. [`Scheduler::shutdown`] must not
/// be called from inside one of its own jobs.
pub struct Scheduler {
    id: usize,
    parallelism: usize,
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    submitted: AtomicUsize,
}

impl Scheduler {
    /// Starts a pool sized by `config`.
    ///
    /// With an effective parallelism of one no thread is spawned and every
    /// job runs on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn a worker thread.
    pub fn new(config: SchedulerConfig) -> io::Result<Self> {
        let hardware = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let parallelism = config
            .parallelism
            .map_or(hardware, |cap| cap.into_inner().min(hardware));
        debug!("host reports a parallelism of {hardware}");
        Self::with_workers(parallelism, &config.thread_name_prefix)
    }

    /// Starts a pool of exactly `workers` threads, whatever the host
    /// reports.
    pub(crate) fn with_workers(threads: usize, thread_name_prefix: &str) -> io::Result<Self> {
        let id = NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed);
        let parallelism = threads.max(1);

        let (sender, receiver) = unbounded::<Task>();
        let mut workers = Vec::new();
        if parallelism > 1 {
            for index in 0..parallelism {
                let receiver = receiver.clone();
                let handle = thread::Builder::new()
                    .name(format!("{thread_name_prefix}-{index}"))
                    .spawn(move || worker_loop(id, &receiver))?;
                workers.push(handle);
            }
        }
        debug!("scheduler started with {parallelism} worker(s)");

        Ok(Self {
            id,
            parallelism,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
            submitted: AtomicUsize::new(0),
        })
    }

    /// Number of workers jobs can run on concurrently.
    #[must_use]
    pub fn max_parallelism(&self) -> usize {
        self.parallelism
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.shutdown.load(Ordering::Acquire) {
            SchedulerState::Shutdown
        } else {
            SchedulerState::Ready
        }
    }

    /// Returns `true` if batches may actually run in parallel.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.parallelism > 1 && self.state() == SchedulerState::Ready
    }

    /// Total number of jobs handed to the worker threads so far.
    #[must_use]
    pub fn submitted_jobs(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Submits a single job and returns immediately.
    ///
    /// The job's cancel token is a child of `cancel`. Once the pool is shut
    /// down (or disabled), or when called from one of its own workers, the
    /// job runs on the calling thread before this returns.
    pub fn fork<T: Send + 'static>(&self, job: Job<T>, cancel: &CancelToken) -> JobHandle<T> {
        self.submit(job, cancel, TileAssignment::WHOLE)
    }

    /// Runs `jobs` and returns their results in submission order.
    ///
    /// Jobs run on the calling thread, one after the other, when
    /// `use_threads` is `false`, when there is a single job, when the pool
    /// is disabled, or when the caller is itself one of the pool's workers. Both paths hand job `i` of `n` the assignment
    /// `TileAssignment::new(i, n)`, so results do not depend on the mode.
    ///
    /// # Errors
    ///
    /// - [`JobError::Interrupted`] if `cancel` is tripped before submission
    ///   (nothing is submitted), during the join wait, or by the time the
    ///   batch finishes.
    /// - [`JobError::Failed`] for the first failing job in submission order;
    ///   the jobs after it are cancelled, last first.
    pub fn fork_and_join<T: Send + 'static>(
        &self,
        jobs: Vec<Job<T>>,
        use_threads: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<T>, JobError> {
        if cancel.is_cancelled() {
            debug!("batch of {} job(s) cancelled before submission", jobs.len());
            return Err(JobError::Interrupted);
        }

        let count = jobs.len();
        if !use_threads || count <= 1 || !self.is_enabled() {
            return run_sequential(jobs, cancel);
        }
        if self.on_own_worker() {
            trace!("nested batch of {count} job(s) runs on its worker");
            return run_sequential(jobs, cancel);
        }

        let batch = cancel.child();
        let handles: Vec<_> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| self.submit(job, &batch, TileAssignment::new(index, count)))
            .collect();

        let mut results = Vec::with_capacity(count);
        for (index, handle) in handles.iter().enumerate() {
            match handle.join(cancel) {
                Ok(value) => results.push(value),
                Err(err) => {
                    // Cancel from the back so no queued job starts while the
                    // earlier ones are being cancelled.
                    for pending in handles[index + 1..].iter().rev() {
                        pending.cancel();
                    }
                    batch.cancel();
                    match &err {
                        JobError::Interrupted => {
                            debug!("batch interrupted while joining job {index} of {count}");
                        }
                        JobError::Failed { job, .. } => {
                            warn!("job `{job}` failed; cancelled the rest of its {count}-job batch");
                        }
                    }
                    return Err(err);
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(JobError::Interrupted);
        }
        Ok(results)
    }

    /// Stops accepting work and joins the worker threads.
    ///
    /// Jobs already queued still run. Later submissions run inline.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(lock(&self.sender).take());
        for handle in lock(&self.workers).drain(..) {
            if handle.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
        debug!("scheduler shut down");
    }

    fn on_own_worker(&self) -> bool {
        WORKER_OF.with(|owner| owner.get() == Some(self.id))
    }

    fn submit<T: Send + 'static>(
        &self,
        job: Job<T>,
        parent: &CancelToken,
        assignment: TileAssignment,
    ) -> JobHandle<T> {
        let Job { name, task } = job;
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Submitted),
            done: Condvar::new(),
            cancel: parent.child(),
        });
        let handle = JobHandle {
            name: name.clone(),
            shared: Arc::clone(&shared),
        };

        let runner: Task = Box::new(move || execute(&name, task, &shared, assignment));
        let sender = if self.parallelism > 1 && !self.on_own_worker() {
            lock(&self.sender).clone()
        } else {
            None
        };

        match sender {
            Some(sender) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                trace!("submitted job `{}` ({assignment:?})", handle.name);
                if let Err(SendError(runner)) = sender.send(runner) {
                    runner();
                }
            }
            None => runner(),
        }
        handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.id)
            .field("parallelism", &self.parallelism)
            .field("state", &self.state())
            .field("submitted", &self.submitted_jobs())
            .finish_non_exhaustive()
    }
}

/// Handle on a forked job.
pub struct JobHandle<T> {
    name: String,
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    done: Condvar,
    cancel: CancelToken,
}

enum State<T> {
    Submitted,
    Running,
    Completed(T),
    Failed(BoxError),
    Cancelled,
    Taken,
}

impl<T> JobHandle<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn status(&self) -> JobStatus {
        match &*lock(&self.shared.state) {
            State::Submitted => JobStatus::Submitted,
            State::Running => JobStatus::Running,
            State::Completed(_) | State::Taken => JobStatus::Completed,
            State::Failed(_) => JobStatus::Failed,
            State::Cancelled => JobStatus::Cancelled,
        }
    }

    /// Requests cancellation.
    ///
    /// A job that has not started yet is skipped; a running job sees its
    /// token tripped and is expected to return early.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
        let mut state = lock(&self.shared.state);
        if matches!(*state, State::Submitted) {
            *state = State::Cancelled;
            self.shared.done.notify_all();
        }
    }

    /// Waits for the job and takes its result.
    ///
    /// # Errors
    ///
    /// - [`JobError::Interrupted`] if `waiter` is cancelled while waiting or
    ///   the job itself was cancelled.
    /// - [`JobError::Failed`] if the job returned an error or panicked.
    pub fn join(&self, waiter: &CancelToken) -> Result<T, JobError> {
        let mut state = lock(&self.shared.state);
        loop {
            match std::mem::replace(&mut *state, State::Taken) {
                State::Completed(value) => return Ok(value),
                State::Failed(source) => {
                    return Err(JobError::Failed {
                        job: self.name.clone(),
                        source,
                    });
                }
                State::Cancelled => {
                    *state = State::Cancelled;
                    return Err(JobError::Interrupted);
                }
                State::Taken => {
                    return Err(JobError::Failed {
                        job: self.name.clone(),
                        source: "job result already taken".into(),
                    });
                }
                pending @ (State::Submitted | State::Running) => {
                    *state = pending;
                    if waiter.is_cancelled() {
                        return Err(JobError::Interrupted);
                    }
                    state = self
                        .shared
                        .done
                        .wait_timeout(state, JOIN_POLL)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}

impl<T> std::fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

fn worker_loop(scheduler: usize, receiver: &Receiver<Task>) {
    WORKER_OF.with(|owner| owner.set(Some(scheduler)));
    while let Ok(task) = receiver.recv() {
        task();
    }
}

fn execute<T>(
    name: &str,
    task: Box<dyn FnOnce(&JobContext) -> Result<T, BoxError> + Send>,
    shared: &Shared<T>,
    assignment: TileAssignment,
) {
    {
        let mut state = lock(&shared.state);
        if matches!(*state, State::Cancelled) || shared.cancel.is_cancelled() {
            trace!("skipping cancelled job `{name}`");
            *state = State::Cancelled;
            shared.done.notify_all();
            return;
        }
        *state = State::Running;
    }

    let context = JobContext::new(shared.cancel.clone(), assignment);
    let next = match run_guarded(task, &context) {
        Ok(value) => State::Completed(value),
        Err(source) => State::Failed(source),
    };
    *lock(&shared.state) = next;
    shared.done.notify_all();
}

fn run_sequential<T>(jobs: Vec<Job<T>>, cancel: &CancelToken) -> Result<Vec<T>, JobError> {
    let count = jobs.len();
    let batch = cancel.child();
    let mut results = Vec::with_capacity(count);

    for (index, Job { name, task }) in jobs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(JobError::Interrupted);
        }
        let context = JobContext::new(batch.child(), TileAssignment::new(index, count));
        match run_guarded(task, &context) {
            Ok(value) => results.push(value),
            Err(source) => {
                warn!("job `{name}` failed");
                return Err(JobError::Failed { job: name, source });
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(JobError::Interrupted);
    }
    Ok(results)
}

/// Runs a task, turning a panic into an ordinary failure.
fn run_guarded<T>(
    task: Box<dyn FnOnce(&JobContext) -> Result<T, BoxError> + Send>,
    context: &JobContext,
) -> Result<T, BoxError> {
    match panic::catch_unwind(AssertUnwindSafe(|| task(context))) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload).into()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("job panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("job panicked: {msg}")
    } else {
        "job panicked".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    fn pool(workers: usize) -> Scheduler {
        let scheduler = Scheduler::with_workers(workers, "test-pool").unwrap();
        assert_eq!(scheduler.is_enabled(), workers > 1);
        scheduler
    }

    fn squares(n: usize) -> Vec<Job<usize>> {
        (0..n)
            .map(|i| Job::new(format!("square-{i}"), move |_: &JobContext| Ok(i * i)))
            .collect()
    }

    #[test_log::test]
    fn results_keep_submission_order() {
        let scheduler = pool(4);
        let cancel = CancelToken::new();

        let jobs = (0..16_u64)
            .map(|i| {
                Job::new(format!("sleepy-{i}"), move |_: &JobContext| {
                    // Later jobs finish first.
                    thread::sleep(Duration::from_millis(16 - i));
                    Ok(i)
                })
            })
            .collect();

        let results = scheduler.fork_and_join(jobs, true, &cancel).unwrap();
        assert_eq!(results, (0..16).collect::<Vec<_>>());
        assert_eq!(scheduler.submitted_jobs(), 16);
    }

    #[test]
    fn sequential_and_threaded_agree() {
        let scheduler = pool(4);
        let cancel = CancelToken::new();
        let threaded = scheduler.fork_and_join(squares(10), true, &cancel).unwrap();
        assert_eq!(scheduler.submitted_jobs(), 10);
        let sequential = scheduler.fork_and_join(squares(10), false, &cancel).unwrap();
        assert_eq!(scheduler.submitted_jobs(), 10);
        assert_eq!(threaded, sequential);
    }

    #[test]
    fn assignments_are_explicit() {
        let scheduler = pool(3);
        let cancel = CancelToken::new();
        let jobs = (0..5)
            .map(|i| Job::new(format!("band-{i}"), |ctx: &JobContext| Ok(ctx.assignment())))
            .collect();
        let bands = scheduler.fork_and_join(jobs, true, &cancel).unwrap();
        assert_eq!(scheduler.submitted_jobs(), 5);
        for (i, band) in bands.into_iter().enumerate() {
            assert_eq!(band, TileAssignment::new(i, 5));
        }
    }

    #[test]
    fn cancelled_before_submission_submits_nothing() {
        let scheduler = pool(4);
        let cancel = CancelToken::new();
        cancel.cancel();

        let ran = Arc::new(AtomicUsize::new(0));
        let jobs = (0..4)
            .map(|i| {
                let ran = Arc::clone(&ran);
                Job::new(format!("never-{i}"), move |_: &JobContext| {
                    ran.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
            })
            .collect();

        let result = scheduler.fork_and_join(jobs, true, &cancel);
        assert!(matches!(result, Err(JobError::Interrupted)));
        assert_eq!(scheduler.submitted_jobs(), 0);
        assert_eq!(ran.load(Ordering::Relaxed), 0);
    }

    #[test_log::test]
    fn failure_is_wrapped_with_job_name_and_cancels_the_rest() {
        let scheduler = pool(2);
        let cancel = CancelToken::new();

        let mut jobs: Vec<Job<u32>> = vec![Job::new("broken", |_: &JobContext| {
            Err("bad input".into())
        })];
        for i in 0..6 {
            jobs.push(Job::new(format!("slow-{i}"), |ctx: &JobContext| {
                while !ctx.is_cancelled() {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok(0)
            }));
        }

        match scheduler.fork_and_join(jobs, true, &cancel) {
            Err(JobError::Failed { job, source }) => {
                assert_eq!(job, "broken");
                assert_eq!(source.to_string(), "bad input");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(scheduler.submitted_jobs(), 7);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn panics_become_failures() {
        let scheduler = pool(2);
        let cancel = CancelToken::new();
        for use_threads in [true, false] {
            let jobs: Vec<Job<()>> = vec![
                Job::new("fine", |_: &JobContext| Ok(())),
                Job::new("panicky", |_: &JobContext| panic!("kaboom")),
            ];
            match scheduler.fork_and_join(jobs, use_threads, &cancel) {
                Err(JobError::Failed { job, source }) => {
                    assert_eq!(job, "panicky");
                    assert!(source.to_string().contains("kaboom"));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn cancellation_during_join_interrupts() {
        let scheduler = pool(2);
        let cancel = CancelToken::new();

        let jobs: Vec<Job<()>> = (0..4)
            .map(|i| {
                Job::new(format!("spin-{i}"), |ctx: &JobContext| {
                    while !ctx.is_cancelled() {
                        thread::sleep(Duration::from_millis(1));
                    }
                    Ok(())
                })
            })
            .collect();

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                cancel.cancel();
            })
        };

        let result = scheduler.fork_and_join(jobs, true, &cancel);
        canceller.join().unwrap();
        assert!(matches!(result, Err(JobError::Interrupted)));
        assert_eq!(scheduler.submitted_jobs(), 4);
    }

    #[test]
    fn fork_returns_a_joinable_handle() {
        let scheduler = pool(2);
        let cancel = CancelToken::new();
        let handle = scheduler.fork(Job::new("answer", |_: &JobContext| Ok(42)), &cancel);
        assert_eq!(handle.name(), "answer");
        assert_eq!(handle.join(&cancel).unwrap(), 42);
        assert_eq!(handle.status(), JobStatus::Completed);
    }

    #[test]
    fn shutdown_is_one_way_and_falls_back_inline() {
        let scheduler = pool(2);
        scheduler.shutdown();
        scheduler.shutdown();
        assert_eq!(scheduler.state(), SchedulerState::Shutdown);
        assert!(!scheduler.is_enabled());

        let cancel = CancelToken::new();
        let handle = scheduler.fork(Job::new("late", |_: &JobContext| Ok("ran")), &cancel);
        assert_eq!(handle.join(&cancel).unwrap(), "ran");

        let results = scheduler.fork_and_join(squares(3), true, &cancel).unwrap();
        assert_eq!(results, vec![0, 1, 4]);
    }

    #[test]
    fn single_worker_pool_is_disabled() {
        let scheduler = pool(1);
        assert_eq!(scheduler.max_parallelism(), 1);
        assert!(!scheduler.is_enabled());

        let cancel = CancelToken::new();
        let results = scheduler.fork_and_join(squares(4), true, &cancel).unwrap();
        assert_eq!(results, vec![0, 1, 4, 9]);
        assert_eq!(scheduler.submitted_jobs(), 0);
    }

    #[test]
    fn configured_parallelism_is_capped_by_the_host() {
        let hardware = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let scheduler = Scheduler::new(SchedulerConfig {
            parallelism: Some(StrictlyPositive::new(usize::MAX).unwrap()),
            ..SchedulerConfig::default()
        })
        .unwrap();
        assert_eq!(scheduler.max_parallelism(), hardware);
    }

    #[test_log::test]
    fn nested_batches_run_on_the_worker() {
        let scheduler = Arc::new(pool(2));
        let cancel = CancelToken::new();

        let outer: Vec<Job<Vec<usize>>> = (0..2)
            .map(|i| {
                let scheduler = Arc::clone(&scheduler);
                Job::new(format!("outer-{i}"), move |ctx: &JobContext| {
                    let inner = scheduler.fork_and_join(squares(3), true, ctx.cancel_token())?;
                    let forked = scheduler.fork(
                        Job::new("inner-fork", move |_: &JobContext| Ok(i)),
                        ctx.cancel_token(),
                    );
                    let mut values = inner;
                    values.push(forked.join(ctx.cancel_token())?);
                    Ok(values)
                })
            })
            .collect();

        let (done, finished) = crossbeam_channel::bounded(1);
        let runner = {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                let result = scheduler.fork_and_join(outer, true, &cancel);
                done.send(()).unwrap();
                result
            })
        };
        finished
            .recv_timeout(Duration::from_secs(10))
            .expect("nested batches should not block the pool");

        let results = runner.join().unwrap().unwrap();
        assert_eq!(results, vec![vec![0, 1, 4, 0], vec![0, 1, 4, 1]]);
        assert_eq!(scheduler.submitted_jobs(), 2);
    }
}
