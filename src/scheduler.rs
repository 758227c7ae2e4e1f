//! Work-stealing thread pool. External submissions go through a shared
//! `crossbeam_deque::Injector`; each worker also owns a local `Worker`/
//! `Stealer` pair so sibling threads can steal from each other once a batch
//! has been claimed off the injector — the same "try every sibling deque
//! before blocking" shape as the source's round-robin `TaskQueue` array,
//! adapted to `crossbeam-deque`'s push-only-by-owner model (a caller thread
//! can't push directly into an arbitrary worker's local deque, only into the
//! shared injector).
//!
//! `request(task)` with zero worker threads runs `task` inline and
//! synchronously, matching the source's "Sync" branch.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crossbeam_deque::{Injector, Steal, Stealer, Worker};

type Job = Box<dyn FnOnce(usize) + Send + 'static>;

struct ScheduledJob {
    job: Job,
    signal: Arc<(Mutex<bool>, Condvar)>,
}

/// A handle a caller can block on until its task has run, mirroring the
/// source's `Task::done()`.
#[derive(Clone)]
pub struct TaskHandle {
    signal: Arc<(Mutex<bool>, Condvar)>,
}

impl TaskHandle {
    fn new() -> Self {
        TaskHandle { signal: Arc::new((Mutex::new(false), Condvar::new())) }
    }

    fn ready() -> Self {
        let h = Self::new();
        *h.signal.0.lock().unwrap() = true;
        h
    }

    pub fn wait(&self) {
        let (lock, cvar) = &*self.signal;
        let mut done = lock.lock().unwrap();
        while !*done {
            done = cvar.wait(done).unwrap();
        }
    }
}

struct Shared {
    injector: Injector<ScheduledJob>,
    stealers: Vec<Stealer<ScheduledJob>>,
    wake: Condvar,
    wake_lock: Mutex<()>,
    shutdown: Mutex<bool>,
}

/// The task scheduler itself. `thread_count == 0` runs every task inline on
/// the caller's thread ("zero-thread mode").
pub struct Scheduler {
    thread_count: usize,
    shared: Option<Arc<Shared>>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(thread_count: usize) -> Self {
        if thread_count == 0 {
            return Scheduler { thread_count: 0, shared: None, handles: Vec::new() };
        }

        let workers: Vec<Worker<ScheduledJob>> = (0..thread_count).map(|_| Worker::new_fifo()).collect();
        let stealers = workers.iter().map(Worker::stealer).collect();
        let shared = Arc::new(Shared {
            injector: Injector::new(),
            stealers,
            wake: Condvar::new(),
            wake_lock: Mutex::new(()),
            shutdown: Mutex::new(false),
        });

        let mut handles = Vec::with_capacity(thread_count);
        for (tid, local) in workers.into_iter().enumerate() {
            let shared = Arc::clone(&shared);
            handles.push(std::thread::spawn(move || worker_loop(tid, local, shared)));
        }

        Scheduler { thread_count, shared: Some(shared), handles }
    }

    /// Submits `job` for execution, returning a handle to wait on its
    /// completion. In zero-thread mode `job` already ran by the time this
    /// returns, and the returned handle is pre-signaled.
    pub fn request(&self, job: impl FnOnce(usize) + Send + 'static) -> TaskHandle {
        if self.thread_count == 0 {
            job(0);
            return TaskHandle::ready();
        }
        let handle = TaskHandle::new();
        let scheduled = ScheduledJob { job: Box::new(job), signal: handle.signal.clone() };
        let shared = self.shared.as_ref().unwrap();
        shared.injector.push(scheduled);
        shared.wake.notify_one();
        handle
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(shared) = &self.shared {
            *shared.shutdown.lock().unwrap() = true;
            shared.wake.notify_all();
        }
        for h in self.handles.drain(..) {
            let _ = h.join();
        }
    }
}

fn worker_loop(tid: usize, local: Worker<ScheduledJob>, shared: Arc<Shared>) {
    loop {
        let task = find_task(tid, &local, &shared);
        let Some(scheduled) = task else {
            if *shared.shutdown.lock().unwrap() {
                return;
            }
            let guard = shared.wake_lock.lock().unwrap();
            let _ = shared.wake.wait_timeout(guard, std::time::Duration::from_millis(50));
            continue;
        };
        (scheduled.job)(tid);
        *scheduled.signal.0.lock().unwrap() = true;
        scheduled.signal.1.notify_all();
    }
}

/// Tries the local deque, then the injector, then every sibling's deque —
/// the `2*N` sweep the source performs before giving up and blocking.
fn find_task(tid: usize, local: &Worker<ScheduledJob>, shared: &Shared) -> Option<ScheduledJob> {
    if let Some(t) = local.pop() {
        return Some(t);
    }
    loop {
        match shared.injector.steal_batch_and_pop(local) {
            Steal::Success(t) => return Some(t),
            Steal::Retry => continue,
            Steal::Empty => break,
        }
    }
    for n in 0..shared.stealers.len() * 2 {
        let idx = n % shared.stealers.len();
        if idx == tid {
            continue;
        }
        if let Steal::Success(t) = shared.stealers[idx].steal() {
            return Some(t);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_thread_mode_runs_inline() {
        let scheduler = Scheduler::new(0);
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let handle = scheduler.request(move |_tid| {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        handle.wait();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn threaded_mode_completes_all_tasks() {
        let scheduler = Scheduler::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let counter = counter.clone();
                scheduler.request(move |_tid| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.wait();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }
}
