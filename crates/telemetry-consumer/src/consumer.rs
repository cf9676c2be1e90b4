//! The polling worker and its service surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use simmotion_telemetry_config::ConsumerConfig;
use simmotion_telemetry_record::{PacketSchema, RECORD_SIZE};
use simmotion_telemetry_transport::{
    SharedTelemetryRegion, TransportError, UdpTelemetryReceiver, MAPPING_NAME, MAPPING_SIZE,
    MUTEX_NAME,
};

use crate::error::ConsumerError;
use crate::event::{TelemetryEvent, TelemetryInfo};
use crate::fade::StartupFade;

/// Event channel handed to the platform host.
pub type TelemetryReceiver = mpsc::Receiver<TelemetryEvent>;

/// Producer silence beyond this marks the stream as not running.
const LIVENESS_TIMEOUT: Duration = Duration::from_millis(500);

/// Back-off while the producer is absent or silent.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Target dispatch period.
const DISPATCH_PERIOD: Duration = Duration::from_millis(10);

/// Longest single blocking wait for a UDP datagram.
const UDP_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Service surface of a telemetry consumer, mirrored on the producer's
/// adapter seam so hosts can treat either end uniformly.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Spawn the ingest worker and return the event stream.
    async fn start_monitoring(&self) -> Result<TelemetryReceiver>;

    /// Signal the worker to exit.
    async fn stop_monitoring(&self) -> Result<()>;

    /// Whether the transport endpoint is currently open.
    fn is_connected(&self) -> bool;

    /// Whether fresh samples arrived within the liveness window.
    fn is_running(&self) -> bool;
}

/// Consumer service: opens the configured transport, applies the start-up
/// fade, and dispatches [`TelemetryEvent`]s.
#[derive(Debug)]
pub struct MotionConsumer {
    config: ConsumerConfig,
    region_name: String,
    lock_name: String,
    started: AtomicBool,
    stop: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl MotionConsumer {
    /// A consumer for the given configuration and the default region
    /// names.
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            region_name: MAPPING_NAME.to_string(),
            lock_name: MUTEX_NAME.to_string(),
            started: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the shared-memory object names. Tests use this to keep
    /// parallel runs out of each other's regions.
    pub fn with_region_names(
        mut self,
        region_name: impl Into<String>,
        lock_name: impl Into<String>,
    ) -> Self {
        self.region_name = region_name.into();
        self.lock_name = lock_name.into();
        self
    }
}

#[async_trait]
impl TelemetrySource for MotionConsumer {
    async fn start_monitoring(&self) -> Result<TelemetryReceiver> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ConsumerError::AlreadyStarted.into());
        }
        let (tx, rx) = mpsc::channel(100);
        let worker = Worker {
            config: self.config,
            region_name: self.region_name.clone(),
            lock_name: self.lock_name.clone(),
            stop: Arc::clone(&self.stop),
            connected: Arc::clone(&self.connected),
            running: Arc::clone(&self.running),
            tx,
        };
        // The worker is detached; it winds down when the stop flag flips
        // or the receiver is dropped.
        let _ = thread::Builder::new()
            .name("telemetry-consumer".into())
            .spawn(move || worker.run())?;
        Ok(rx)
    }

    async fn stop_monitoring(&self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

enum Ingest {
    Udp(UdpTelemetryReceiver),
    SharedMemory(SharedTelemetryRegion),
}

struct Worker {
    config: ConsumerConfig,
    region_name: String,
    lock_name: String,
    stop: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    tx: mpsc::Sender<TelemetryEvent>,
}

impl Worker {
    fn run(self) {
        info!(
            udp = self.config.receive_udp,
            port = self.config.udp_port,
            "telemetry consumer worker running"
        );
        let mut ingest: Option<Ingest> = None;
        let mut fade = StartupFade::new();
        let mut last_sample = Instant::now();
        let mut last_dispatch = Instant::now();

        while !self.stop.load(Ordering::Relaxed) {
            let tick_started = Instant::now();

            let active = match &ingest {
                Some(active) => active,
                None => {
                    match self.open_ingest() {
                        Ok(opened) => {
                            info!("telemetry stream connected");
                            self.connected.store(true, Ordering::Relaxed);
                            fade.reset();
                            last_sample = Instant::now();
                            // The fade clock must not see the pre-connect
                            // back-off as elapsed time.
                            last_dispatch = Instant::now();
                            ingest = Some(opened);
                        }
                        Err(TransportError::NotFound { .. }) => {
                            // Producer not up yet; quiet retry.
                            thread::sleep(RETRY_DELAY);
                        }
                        Err(e) => {
                            warn!("telemetry stream open failed: {e}");
                            thread::sleep(RETRY_DELAY);
                        }
                    }
                    continue;
                }
            };

            match self.ingest_tick(active, &mut fade, &mut last_dispatch) {
                Ok(true) => {
                    last_sample = Instant::now();
                    self.running.store(true, Ordering::Relaxed);
                }
                Ok(false) => {
                    if last_sample.elapsed() > LIVENESS_TIMEOUT {
                        self.running.store(false, Ordering::Relaxed);
                        thread::sleep(RETRY_DELAY);
                    }
                }
                Err(WorkerExit::ReceiverGone) => break,
                Err(WorkerExit::Transport(e)) => {
                    warn!("telemetry ingest failed, reconnecting: {e}");
                    ingest = None;
                    self.connected.store(false, Ordering::Relaxed);
                    self.running.store(false, Ordering::Relaxed);
                    thread::sleep(RETRY_DELAY);
                    continue;
                }
            }

            let elapsed = tick_started.elapsed();
            if elapsed < DISPATCH_PERIOD {
                thread::sleep(DISPATCH_PERIOD - elapsed);
            }
        }
        self.connected.store(false, Ordering::Relaxed);
        self.running.store(false, Ordering::Relaxed);
        info!("telemetry consumer worker exited");
    }

    fn open_ingest(&self) -> Result<Ingest, TransportError> {
        if self.config.receive_udp {
            Ok(Ingest::Udp(UdpTelemetryReceiver::bind(
                self.config.udp_port,
            )?))
        } else {
            Ok(Ingest::SharedMemory(
                SharedTelemetryRegion::open_existing_named(
                    &self.region_name,
                    &self.lock_name,
                    MAPPING_SIZE,
                )?,
            ))
        }
    }

    /// Ingest and dispatch whatever the transport has for this tick.
    /// Returns whether at least one record was dispatched.
    fn ingest_tick(
        &self,
        ingest: &Ingest,
        fade: &mut StartupFade,
        last_dispatch: &mut Instant,
    ) -> Result<bool, WorkerExit> {
        let mut buf = [0u8; RECORD_SIZE];
        match ingest {
            Ingest::Udp(receiver) => {
                let Some(len) = receiver
                    .recv_timeout(&mut buf, UDP_READ_TIMEOUT)
                    .map_err(WorkerExit::Transport)?
                else {
                    return Ok(false);
                };
                self.dispatch(&buf[..len], fade, last_dispatch)?;
                // Drain mode: everything already queued goes out without
                // pacing sleeps in between.
                while let Some(len) = receiver
                    .try_recv(&mut buf)
                    .map_err(WorkerExit::Transport)?
                {
                    self.dispatch(&buf[..len], fade, last_dispatch)?;
                }
                Ok(true)
            }
            Ingest::SharedMemory(region) => {
                region
                    .read_record(&mut buf)
                    .map_err(WorkerExit::Transport)?;
                self.dispatch(&buf, fade, last_dispatch)?;
                Ok(true)
            }
        }
    }

    fn dispatch(
        &self,
        bytes: &[u8],
        fade: &mut StartupFade,
        last_dispatch: &mut Instant,
    ) -> Result<(), WorkerExit> {
        let mut record = match PacketSchema::shared().decode(bytes) {
            Ok(record) => record,
            Err(e) => {
                // Malformed datagram (wrong size); skip it.
                debug!("ignoring undecodable record: {e}");
                return Ok(());
            }
        };

        let now = Instant::now();
        let dt = now.duration_since(*last_dispatch).as_secs_f32();
        *last_dispatch = now;
        fade.apply(&mut record, dt);

        self.tx
            .blocking_send(TelemetryEvent::Updated(TelemetryInfo::new(record)))
            .map_err(|_| WorkerExit::ReceiverGone)
    }
}

enum WorkerExit {
    /// The host dropped the event receiver; the worker winds down.
    ReceiverGone,
    /// The transport failed mid-stream; reconnect with back-off.
    Transport(TransportError),
}
