//! Passive window monitor: poll a target window and emit new codes
//!
//! A session is Idle or Active. While Active a dedicated thread repeats:
//! find the first window whose title contains the matcher, capture it, run
//! the detector, and emit the result when its text differs from the last
//! emission. The sleep between ticks wakes early on `stop()`.
//!
//! Each `start()` opens a new generation. A loop only emits while its
//! generation is current. The sink runs outside the session lock, so it may
//! call back into the session; `stop()` from any other thread waits for an
//! in-flight emission, so nothing is emitted once it has returned.

use crate::capture::{ResultSink, ScreenCapture};
use crate::config::MonitorConfig;
use crate::error::{FrameError, MonitorError};
use crate::models::{DetectionResult, Frame};
use crate::pipeline::Detect;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

type DetectOutcome = Result<Option<DetectionResult>, FrameError>;

#[derive(Debug, Default)]
struct State {
    active: bool,
    generation: u64,
    last_emitted: Option<String>,
    ticks: u64,
    // Thread currently inside the sink
    emitting: Option<ThreadId>,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the state consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A cancellable polling loop over one target window
pub struct MonitorSession {
    capture: Arc<dyn ScreenCapture>,
    detector: Arc<dyn Detect>,
    sink: Arc<dyn ResultSink>,
    detect_timeout: Option<Duration>,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorSession {
    /// Idle session over the given collaborators
    pub fn new(
        capture: Arc<dyn ScreenCapture>,
        detector: Arc<dyn Detect>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            capture,
            detector,
            sink,
            detect_timeout: None,
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                wake: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Treat a detect that outlasts `timeout` as finding nothing
    pub fn with_detect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.detect_timeout = timeout;
        self
    }

    /// Start polling `matcher` every `poll_interval`
    ///
    /// Returns `Ok(false)` without side effects when already active.
    pub fn start(&self, matcher: &str, poll_interval: Duration) -> Result<bool, MonitorError> {
        let generation = {
            let mut state = self.shared.lock();
            if state.active {
                return Ok(false);
            }
            state.active = true;
            state.generation += 1;
            state.generation
        };

        let worker = Worker {
            capture: Arc::clone(&self.capture),
            detector: Arc::clone(&self.detector),
            sink: Arc::clone(&self.sink),
            shared: Arc::clone(&self.shared),
            matcher: matcher.to_string(),
            poll_interval,
            detect_timeout: self.detect_timeout,
            generation,
            pending: None,
        };
        let spawned = thread::Builder::new()
            .name(format!("monitor-{}", generation))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                info!("monitoring windows matching {:?} every {:?}", matcher, poll_interval);
                *self.handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
                Ok(true)
            }
            Err(err) => {
                let mut state = self.shared.lock();
                state.active = false;
                state.generation += 1;
                Err(err.into())
            }
        }
    }

    /// Start with the target and interval of a monitor configuration
    pub fn start_with(&self, config: &MonitorConfig) -> Result<bool, MonitorError> {
        self.start(&config.target, config.poll_interval())
    }

    /// Return to Idle; the loop exits at its next boundary
    ///
    /// Also forgets the last emission, so a restarted session emits the
    /// first code it sees again.
    ///
    /// Blocks until an emission running on another thread has finished. A
    /// sink may call this from inside `emit`.
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        if state.active {
            state.active = false;
            state.generation += 1;
            state.last_emitted = None;
            self.shared.wake.notify_all();
            info!("monitor stopped");
        }

        let me = thread::current().id();
        while matches!(state.emitting, Some(id) if id != me) {
            state = match self.shared.wake.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Wait for the most recently started loop thread to exit
    pub fn join(&self) {
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("monitor thread panicked");
            }
        }
    }

    /// True between `start()` and `stop()`
    pub fn is_active(&self) -> bool {
        self.shared.lock().active
    }

    /// Text of the last emitted result
    pub fn last_emitted(&self) -> Option<String> {
        self.shared.lock().last_emitted.clone()
    }

    /// Ticks completed over the session's lifetime
    pub fn ticks(&self) -> u64 {
        self.shared.lock().ticks
    }

    /// Block until at least `count` ticks completed or `timeout` passed
    pub fn wait_for_ticks(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.ticks < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = match self.shared.wake.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    capture: Arc<dyn ScreenCapture>,
    detector: Arc<dyn Detect>,
    sink: Arc<dyn ResultSink>,
    shared: Arc<Shared>,
    matcher: String,
    poll_interval: Duration,
    detect_timeout: Option<Duration>,
    generation: u64,
    // A timed-out detect that has not finished yet
    pending: Option<Receiver<DetectOutcome>>,
}

impl Worker {
    fn run(mut self) {
        debug!("monitor loop {} running", self.generation);
        while self.is_current() {
            if let Some(hit) = self.tick() {
                self.emit(hit);
            }
            {
                let mut state = self.shared.lock();
                state.ticks += 1;
                self.shared.wake.notify_all();
            }
            if !self.sleep() {
                break;
            }
        }
        debug!("monitor loop {} exited", self.generation);
    }

    fn is_current(&self) -> bool {
        self.shared.lock().generation == self.generation
    }

    fn tick(&mut self) -> Option<DetectionResult> {
        if !self.previous_detect_finished() {
            debug!("previous detect still running; skipping tick");
            return None;
        }

        let windows = match self.capture.enumerate_windows(&self.matcher) {
            Ok(windows) => windows,
            Err(err) => {
                warn!("window enumeration failed: {}", err);
                return None;
            }
        };
        let Some(&window) = windows.first() else {
            debug!("no window matches {:?}", self.matcher);
            return None;
        };
        let frame = match self.capture.capture_window(window) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("capture of window {} failed: {}", window, err);
                return None;
            }
        };

        match self.detect(frame) {
            Ok(hit) => hit,
            Err(err) => {
                warn!("detect rejected captured frame: {}", err);
                None
            }
        }
    }

    fn detect(&mut self, frame: Frame) -> DetectOutcome {
        let Some(timeout) = self.detect_timeout else {
            return self.detector.detect(&frame);
        };

        let (tx, rx) = mpsc::channel();
        let detector = Arc::clone(&self.detector);
        let spawned = thread::Builder::new()
            .name(format!("monitor-{}-detect", self.generation))
            .spawn(move || {
                let _ = tx.send(detector.detect(&frame));
            });
        if let Err(err) = spawned {
            warn!("failed to spawn detect thread: {}", err);
            return Ok(None);
        }

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                debug!("detect exceeded {:?}; treating as not found", timeout);
                self.pending = Some(rx);
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("detect thread ended without a result");
                Ok(None)
            }
        }
    }

    /// A late result is discarded once it lands
    fn previous_detect_finished(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return true;
        };
        match rx.try_recv() {
            Err(TryRecvError::Empty) => false,
            Ok(_) | Err(TryRecvError::Disconnected) => {
                self.pending = None;
                true
            }
        }
    }

    fn emit(&self, hit: DetectionResult) {
        {
            let mut state = self.shared.lock();
            if state.generation != self.generation {
                return;
            }
            if state.last_emitted.as_deref() == Some(hit.text()) {
                debug!("suppressing repeat of {}", hit.attempt_id());
                return;
            }
            info!("new code via {}", hit.attempt_id());
            state.last_emitted = Some(hit.text().to_string());
            state.emitting = Some(thread::current().id());
        }

        self.sink.emit(&hit);

        let mut state = self.shared.lock();
        state.emitting = None;
        self.shared.wake.notify_all();
    }

    /// Interruptible pause; false when the generation changed
    fn sleep(&self) -> bool {
        let deadline = Instant::now() + self.poll_interval;
        let mut state = self.shared.lock();
        loop {
            if state.generation != self.generation {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = match self.shared.wake.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ImageFileCapture;
    use crate::models::{EngineKind, Stage};
    use std::sync::{OnceLock, Weak};

    fn session(detector: Arc<dyn Detect>, sink: Arc<dyn ResultSink>) -> MonitorSession {
        let capture = Arc::new(ImageFileCapture::from_frame(
            "WhatsApp",
            Frame::filled(8, 8, 0).unwrap(),
        ));
        MonitorSession::new(capture, detector, sink)
    }

    fn constant(text: &'static str) -> Arc<dyn Detect> {
        Arc::new(move |_: &Frame| {
            Ok::<_, FrameError>(DetectionResult::new(text, EngineKind::Linear, Stage::Raw))
        })
    }

    #[test]
    fn test_start_is_idempotent() {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&emitted);
        let sink = Arc::new(move |r: &DetectionResult| {
            log.lock().unwrap().push(r.text().to_string())
        });
        let session = session(constant("A"), sink);

        assert!(session.start("whatsapp", Duration::from_millis(5)).unwrap());
        assert!(!session.start("whatsapp", Duration::from_millis(5)).unwrap());
        assert!(session.wait_for_ticks(5, Duration::from_secs(5)));
        session.stop();
        session.join();

        // Same text every tick: one emission
        assert_eq!(emitted.lock().unwrap().as_slice(), ["A"]);
        assert!(!session.is_active());
        assert_eq!(session.last_emitted(), None);
    }

    #[test]
    fn test_restart_emits_again() {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&emitted);
        let sink = Arc::new(move |r: &DetectionResult| {
            log.lock().unwrap().push(r.text().to_string())
        });
        let session = session(constant("A"), sink);

        for round in 1..=2 {
            session.start("WHATSAPP", Duration::from_millis(5)).unwrap();
            assert!(session.wait_for_ticks(session.ticks() + 2, Duration::from_secs(5)));
            session.stop();
            session.join();
            assert_eq!(emitted.lock().unwrap().len(), round);
        }
    }

    #[test]
    fn test_no_matching_window_skips() {
        let emitted = Arc::new(Mutex::new(0));
        let count = Arc::clone(&emitted);
        let sink = Arc::new(move |_: &DetectionResult| *count.lock().unwrap() += 1);
        let session = session(constant("A"), sink);

        session.start("telegram", Duration::from_millis(5)).unwrap();
        assert!(session.wait_for_ticks(3, Duration::from_secs(5)));
        session.stop();
        session.join();
        assert_eq!(*emitted.lock().unwrap(), 0);
    }

    #[test]
    fn test_detect_timeout_counts_as_empty() {
        let slow: Arc<dyn Detect> = Arc::new(|_: &Frame| {
            thread::sleep(Duration::from_millis(200));
            Ok::<_, FrameError>(DetectionResult::new("late", EngineKind::Linear, Stage::Raw))
        });
        let emitted = Arc::new(Mutex::new(0));
        let count = Arc::clone(&emitted);
        let sink = Arc::new(move |_: &DetectionResult| *count.lock().unwrap() += 1);
        let session = session(slow, sink).with_detect_timeout(Some(Duration::from_millis(10)));

        session.start("whatsapp", Duration::from_millis(5)).unwrap();
        assert!(session.wait_for_ticks(3, Duration::from_secs(5)));
        session.stop();
        session.join();
        assert_eq!(*emitted.lock().unwrap(), 0);
    }

    #[test]
    fn test_sink_may_stop_the_session() {
        let slot: Arc<OnceLock<Weak<MonitorSession>>> = Arc::new(OnceLock::new());
        let emitted = Arc::new(Mutex::new(0));
        let (count, target) = (Arc::clone(&emitted), Arc::clone(&slot));
        let sink = Arc::new(move |_: &DetectionResult| {
            *count.lock().unwrap() += 1;
            if let Some(session) = target.get().and_then(Weak::upgrade) {
                session.stop();
            }
        });
        let session = Arc::new(session(constant("A"), sink));
        slot.set(Arc::downgrade(&session)).unwrap();

        session.start("whatsapp", Duration::from_millis(5)).unwrap();
        assert!(session.wait_for_ticks(1, Duration::from_secs(5)));
        session.join();

        assert!(!session.is_active());
        assert_eq!(*emitted.lock().unwrap(), 1);
    }

    #[test]
    fn test_stop_waits_for_running_emission() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let finished = Arc::new(Mutex::new(false));
        let done = Arc::clone(&finished);
        let entered_tx = Mutex::new(entered_tx);
        let sink = Arc::new(move |_: &DetectionResult| {
            let _ = entered_tx.lock().unwrap().send(());
            thread::sleep(Duration::from_millis(100));
            *done.lock().unwrap() = true;
        });
        let session = session(constant("A"), sink);

        session.start("whatsapp", Duration::from_millis(5)).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        session.stop();
        assert!(*finished.lock().unwrap());
        session.join();
    }
}
