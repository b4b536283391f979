use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tagcal_core::reminder::ports::{Timer, TimerCallback, TimerHandle};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Timers backed by tokio tasks. Cancelling aborts the task.
pub struct TokioTimer {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        TokioTimer {
            runtime,
            next_id: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Panics outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    #[cfg(test)]
    fn armed(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Timer for TokioTimer {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);

        // Held across the spawn so the task can't deregister before it is registered.
        let mut registered = self.tasks.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tasks.lock().remove(&id);
            callback();
        });
        registered.insert(id, task);

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.lock().remove(&handle.0) {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn flag() -> (Arc<AtomicBool>, TimerCallback) {
        let fired = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&fired);
        (fired, Box::new(move || setter.store(true, Ordering::SeqCst)))
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_the_delay_has_passed() {
        let timer = TokioTimer::current();
        let (fired, callback) = flag();

        timer.after(Duration::from_secs(60), callback);
        assert!(!fired.load(Ordering::SeqCst), "callback ran inside after()");

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(timer.armed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let timer = TokioTimer::current();
        let (fired, callback) = flag();

        let handle = timer.after(Duration::from_secs(60), callback);
        timer.cancel(handle);
        assert_eq!(timer.armed(), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!fired.load(Ordering::SeqCst));

        // Cancelling again is harmless.
        timer.cancel(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_aborts_pending_work() {
        let timer = TokioTimer::current();
        let (fired, callback) = flag();

        timer.after(Duration::from_secs(5), callback);
        drop(timer);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
