//! Tick producer - 20Hz action loop
//!
//! Drains queued action requests once per tick and feeds them to the
//! engine strictly in admission order. Subscribers receive a `TickUpdate`
//! per tick with the outcome of every request processed in it.

use crate::{
    engine::{ActionRequest, Engine},
    error::EngineError,
    keys::Address,
    store::RecordStore,
    tokens::TokenLedger,
    MAX_ACTIONS_PER_TICK, TICK_TIME_MS,
};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::sync::broadcast;

/// Outcome of one action request
#[derive(Clone, Debug)]
pub struct ActionStatus {
    /// Identifier handed out at submission time
    pub request_id: u64,
    /// Identity that signed the request
    pub signer: Address,
    /// Whether the request committed
    pub success: bool,
    /// Rendered error when the request was discarded
    pub error: Option<String>,
}

/// Tick update event sent to subscribers
#[derive(Clone, Debug)]
pub struct TickUpdate {
    /// Tick height after processing
    pub tick: u64,
    /// Number of requests processed this tick
    pub action_count: usize,
    /// Per-request outcomes, in admission order
    pub statuses: Vec<ActionStatus>,
    /// Tick production time in microseconds
    pub processing_time_us: u64,
}

/// Tick producer configuration
#[derive(Clone, Debug)]
pub struct TickConfig {
    /// Tick time in milliseconds (default: 50ms for 20Hz)
    pub tick_time_ms: u64,
    /// Maximum action requests per tick
    pub max_actions_per_tick: usize,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_time_ms: TICK_TIME_MS,
            max_actions_per_tick: MAX_ACTIONS_PER_TICK,
            verbose: false,
        }
    }
}

struct Submitted {
    id: u64,
    request: ActionRequest,
}

/// Handle for submitting action requests to the tick producer
#[derive(Clone)]
pub struct SubmitHandle {
    sender: Sender<Submitted>,
    next_id: Arc<AtomicU64>,
}

impl SubmitHandle {
    /// Queue a request for the next tick and return its id.
    ///
    /// Fails with `QueueFull` under backpressure and `Shutdown` once the
    /// producer is gone; it never blocks.
    pub fn submit(&self, request: ActionRequest) -> Result<u64, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sender
            .try_send(Submitted { id, request })
            .map_err(|e| match e {
                TrySendError::Full(_) => EngineError::QueueFull,
                TrySendError::Disconnected(_) => EngineError::Shutdown,
            })?;
        Ok(id)
    }
}

/// Tick producer
///
/// Runs the 20Hz action loop, executing queued requests and advancing
/// the engine clock.
pub struct TickProducer {
    /// Execution engine; owned exclusively, so ticks never interleave
    engine: Engine,
    /// Action request receiver
    action_receiver: Receiver<Submitted>,
    /// Action request sender (for cloning into handles)
    action_sender: Sender<Submitted>,
    /// Tick update broadcaster
    update_sender: broadcast::Sender<TickUpdate>,
    /// Request id counter shared with submit handles
    next_request_id: Arc<AtomicU64>,
    /// Configuration
    config: TickConfig,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl TickProducer {
    /// Create a new tick producer
    pub fn new(engine: Engine, config: TickConfig) -> Self {
        // Bounded intake: submitters see backpressure instead of latency
        let (action_sender, action_receiver) = bounded(1024);

        let (update_sender, _) = broadcast::channel(64);

        Self {
            engine,
            action_receiver,
            action_sender,
            update_sender,
            next_request_id: Arc::new(AtomicU64::new(0)),
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle for submitting action requests
    pub fn submit_handle(&self) -> SubmitHandle {
        SubmitHandle {
            sender: self.action_sender.clone(),
            next_id: Arc::clone(&self.next_request_id),
        }
    }

    /// Subscribe to tick updates
    pub fn subscribe(&self) -> broadcast::Receiver<TickUpdate> {
        self.update_sender.subscribe()
    }

    /// Check if the tick producer is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the tick producer
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get current tick
    pub fn current_tick(&self) -> u64 {
        self.engine.tick()
    }

    pub fn store(&self) -> Arc<RecordStore> {
        self.engine.store()
    }

    pub fn tokens(&self) -> Arc<TokenLedger> {
        self.engine.tokens()
    }

    /// Drain the queue and produce exactly one tick.
    ///
    /// Embedders that drive time themselves call this directly; `run`
    /// and `run_async` call it on a timer.
    pub fn tick_once(&mut self) -> TickUpdate {
        let mut pending = Vec::with_capacity(self.config.max_actions_per_tick);
        self.produce_tick(&mut pending)
    }

    fn produce_tick(&mut self, pending: &mut Vec<Submitted>) -> TickUpdate {
        let tick_start = Instant::now();

        // Drain the action queue up to the per-tick cap
        loop {
            match self.action_receiver.try_recv() {
                Ok(submitted) => {
                    pending.push(submitted);
                    if pending.len() >= self.config.max_actions_per_tick {
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("Action channel disconnected");
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }

        // Execute in admission order; each request commits or is discarded
        let mut statuses = Vec::with_capacity(pending.len());
        for submitted in pending.drain(..) {
            let status = match self.engine.execute(&submitted.request) {
                Ok(()) => ActionStatus {
                    request_id: submitted.id,
                    signer: submitted.request.signer,
                    success: true,
                    error: None,
                },
                Err(err) => {
                    tracing::debug!("request {} discarded: {err}", submitted.id);
                    ActionStatus {
                        request_id: submitted.id,
                        signer: submitted.request.signer,
                        success: false,
                        error: Some(err.to_string()),
                    }
                }
            };
            statuses.push(status);
        }

        self.engine.advance_tick();

        let processing_time = tick_start.elapsed();
        let update = TickUpdate {
            tick: self.engine.tick(),
            action_count: statuses.len(),
            statuses,
            processing_time_us: processing_time.as_micros() as u64,
        };

        // Broadcast to subscribers (ignore errors if no subscribers)
        let _ = self.update_sender.send(update.clone());

        update
    }

    /// Run the tick producer (blocking)
    ///
    /// This should be spawned on a dedicated thread.
    pub fn run(&mut self) {
        self.running.store(true, Ordering::SeqCst);

        let tick_duration = Duration::from_millis(self.config.tick_time_ms);
        let mut pending = Vec::with_capacity(self.config.max_actions_per_tick);
        let mut last_log_tick = 0;

        tracing::info!(
            "Tick producer started ({}ms ticks, {}Hz)",
            self.config.tick_time_ms,
            1000 / self.config.tick_time_ms
        );

        while self.running.load(Ordering::SeqCst) {
            let update = self.produce_tick(&mut pending);

            // Log periodically
            if self.config.verbose || (update.tick - last_log_tick >= 200) {
                // Every ~10 seconds
                if update.action_count > 0 || self.config.verbose {
                    tracing::debug!(
                        "Tick {} | {} actions | {:.2}ms",
                        update.tick,
                        update.action_count,
                        update.processing_time_us as f64 / 1000.0
                    );
                }
                last_log_tick = update.tick;
            }

            // Warn if we're falling behind
            let processing_time = Duration::from_micros(update.processing_time_us);
            if processing_time > tick_duration {
                tracing::warn!(
                    "Tick {} took {:.2}ms (target: {}ms)",
                    update.tick,
                    update.processing_time_us as f64 / 1000.0,
                    self.config.tick_time_ms
                );
            }

            // Sleep for remaining time
            if let Some(sleep_time) = tick_duration.checked_sub(processing_time) {
                std::thread::sleep(sleep_time);
            }
        }

        tracing::info!("Tick producer stopped at tick {}", self.engine.tick());
    }

    /// Run the tick producer asynchronously (tokio)
    pub async fn run_async(mut self) {
        self.running.store(true, Ordering::SeqCst);

        let tick_duration = Duration::from_millis(self.config.tick_time_ms);
        let mut interval = tokio::time::interval(tick_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut pending = Vec::with_capacity(self.config.max_actions_per_tick);

        tracing::info!(
            "Tick producer started ({}ms ticks, {}Hz)",
            self.config.tick_time_ms,
            1000 / self.config.tick_time_ms
        );

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;

            let update = self.produce_tick(&mut pending);

            let processing_time = Duration::from_micros(update.processing_time_us);
            if processing_time > tick_duration {
                tracing::warn!(
                    "Tick {} took {:.2}ms (target: {}ms)",
                    update.tick,
                    update.processing_time_us as f64 / 1000.0,
                    self.config.tick_time_ms
                );
            }
        }

        tracing::info!("Tick producer stopped at tick {}", self.engine.tick());
    }
}
