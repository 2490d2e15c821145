use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Identity of a pending delayed action. At most one timer is live per key:
/// scheduling again supersedes the previous one, cancelling with nothing
/// pending is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKey {
    HomeOff,
    RecentsOn,
    GestureAutoHide,
}

/// Single-slot keyed scheduling, consumed by the aggregator and the overlay
/// state machine. Implemented by [`TimerEngine`] and by the recording stub
/// used in tests.
pub trait DebounceScheduler: Send + Sync {
    fn schedule(&self, key: TimerKey, delay: Duration);
    fn cancel(&self, key: TimerKey);
}

struct EngineState {
    heap: BinaryHeap<Reverse<(Instant, u64, TimerKey)>>,
    generations: HashMap<TimerKey, u64>,
    shutdown: bool,
}

struct Inner {
    state: Mutex<EngineState>,
    condvar: Condvar,
}

/// Keyed one-shot timer engine. Expired keys are posted into the control
/// loop's channel; the worker thread never runs subscriber logic itself, so
/// timer bodies cannot race event processing.
///
/// A heap entry carries the generation its key had when it was scheduled.
/// Superseding or cancelling bumps the generation, turning any still-queued
/// entry into a silent no-op when it pops.
pub struct TimerEngine<M: Send + 'static> {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M: Send + 'static> TimerEngine<M> {
    pub fn new(tx: Sender<M>, wrap: impl Fn(TimerKey) -> M + Send + 'static) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(EngineState {
                heap: BinaryHeap::new(),
                generations: HashMap::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = thread::spawn(move || run(worker_inner, tx, wrap));
        Self {
            inner,
            worker: Some(worker),
            _marker: std::marker::PhantomData,
        }
    }
}

fn run<M: Send>(inner: Arc<Inner>, tx: Sender<M>, wrap: impl Fn(TimerKey) -> M) {
    let mut state = inner.state.lock().unwrap();
    loop {
        if state.shutdown {
            break;
        }
        let head = state.heap.peek().map(|Reverse(entry)| *entry);
        match head {
            None => {
                state = inner.condvar.wait(state).unwrap();
            }
            Some((deadline, generation, key)) => {
                let now = Instant::now();
                if deadline <= now {
                    state.heap.pop();
                    let live = state.generations.get(&key).copied() == Some(generation);
                    if live {
                        drop(state);
                        if tx.send(wrap(key)).is_err() {
                            // Control loop is gone; nothing left to deliver to.
                            return;
                        }
                        state = inner.state.lock().unwrap();
                    }
                } else {
                    let wait = deadline.saturating_duration_since(now);
                    let (guard, _) = inner.condvar.wait_timeout(state, wait).unwrap();
                    state = guard;
                }
            }
        }
    }
}

impl<M: Send + 'static> DebounceScheduler for TimerEngine<M> {
    fn schedule(&self, key: TimerKey, delay: Duration) {
        let mut state = self.inner.state.lock().unwrap();
        let generation = state.generations.entry(key).or_insert(0);
        *generation += 1;
        let generation = *generation;
        state.heap.push(Reverse((Instant::now() + delay, generation, key)));
        drop(state);
        self.inner.condvar.notify_one();
    }

    fn cancel(&self, key: TimerKey) {
        let mut state = self.inner.state.lock().unwrap();
        // Bumping the generation orphans any queued entry for this key.
        *state.generations.entry(key).or_insert(0) += 1;
        drop(state);
        self.inner.condvar.notify_one();
    }
}

impl<M: Send + 'static> Drop for TimerEngine<M> {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.shutdown = true;
            state.heap.clear();
        }
        self.inner.condvar.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Scheduler stub that records calls instead of arming timers. Lets unit
/// tests drive debounce expiry by hand with explicit `now` values.
#[derive(Clone, Default)]
pub struct RecordingScheduler {
    ops: Arc<Mutex<Vec<SchedulerOp>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerOp {
    Schedule(TimerKey, Duration),
    Cancel(TimerKey),
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_ops(&self) -> Vec<SchedulerOp> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }
}

impl DebounceScheduler for RecordingScheduler {
    fn schedule(&self, key: TimerKey, delay: Duration) {
        self.ops.lock().unwrap().push(SchedulerOp::Schedule(key, delay));
    }

    fn cancel(&self, key: TimerKey) {
        self.ops.lock().unwrap().push(SchedulerOp::Cancel(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn fires_once_after_the_delay() {
        let (tx, rx) = mpsc::channel();
        let engine = TimerEngine::new(tx, |key| key);

        let started = Instant::now();
        engine.schedule(TimerKey::HomeOff, Duration::from_millis(50));

        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, TimerKey::HomeOff);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(rx.recv_timeout(Duration::from_millis(120)).is_err());
    }

    #[test]
    fn rescheduling_supersedes_the_pending_timer() {
        let (tx, rx) = mpsc::channel();
        let engine = TimerEngine::new(tx, |key| key);

        engine.schedule(TimerKey::HomeOff, Duration::from_millis(40));
        engine.schedule(TimerKey::HomeOff, Duration::from_millis(120));

        let started = Instant::now();
        let _ = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(80));
        // The superseded entry must not deliver a second fire.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn cancel_discards_the_pending_timer() {
        let (tx, rx) = mpsc::channel();
        let engine = TimerEngine::new(tx, |key| key);

        engine.schedule(TimerKey::RecentsOn, Duration::from_millis(40));
        engine.cancel(TimerKey::RecentsOn);

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn cancel_without_pending_timer_is_a_no_op() {
        let (tx, rx) = mpsc::channel();
        let engine = TimerEngine::new(tx, |key| key);

        engine.cancel(TimerKey::GestureAutoHide);
        engine.schedule(TimerKey::GestureAutoHide, Duration::from_millis(30));

        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, TimerKey::GestureAutoHide);
    }

    #[test]
    fn independent_keys_fire_independently() {
        let (tx, rx) = mpsc::channel();
        let engine = TimerEngine::new(tx, |key| key);

        engine.schedule(TimerKey::HomeOff, Duration::from_millis(60));
        engine.schedule(TimerKey::RecentsOn, Duration::from_millis(20));

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, TimerKey::RecentsOn);
        assert_eq!(second, TimerKey::HomeOff);
    }

    #[test]
    fn shutdown_drops_pending_timers() {
        let (tx, rx) = mpsc::channel();
        let engine: TimerEngine<TimerKey> = TimerEngine::new(tx, |key| key);

        engine.schedule(TimerKey::HomeOff, Duration::from_millis(30));
        drop(engine);

        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }
}
