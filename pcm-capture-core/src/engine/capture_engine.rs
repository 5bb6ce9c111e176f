use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::{CaptureConfig, TaskOptions};
use crate::models::error::CaptureError;
use crate::models::sample_buffer::SampleBuffer;
use crate::models::state::{EngineDiagnostics, EngineState};
use crate::processing::converter::SampleConverter;
use crate::processing::handoff::{
    handoff_queue, stop_signal, BufferConsumer, BufferProducer, PushOutcome, QueueClosed,
    StopHandle, StopToken,
};
use crate::processing::wav_format::{WavHeaderBuilder, WAV_HEADER_SIZE};
use crate::traits::engine_observer::EngineObserver;
use crate::traits::frame_source::FrameSource;

/// State shared between the owner and the acquisition thread.
#[derive(Debug, Default)]
struct EngineShared {
    state: EngineState,
    diagnostics: EngineDiagnostics,
}

/// Real-time acquisition engine.
///
/// Owns one hardware source and one bounded hand-off queue. Data flow:
/// ```text
/// [FrameSource] → raw u32 block → [SampleConverter] → SampleBuffer → [queue] → pop()
/// ```
/// The acquisition thread blocks on the hardware read and on a full queue;
/// it never drops a buffer. A hardware error ends acquisition and is reported
/// to the owner through `pop`, `stop` and the observer. The engine does not
/// retry.
pub struct CaptureEngine<S: FrameSource + 'static> {
    config: CaptureConfig,
    converter: SampleConverter,
    source: Option<S>,
    source_name: String,
    max_frame_len: usize,
    producer: Option<BufferProducer>,
    consumer: BufferConsumer,
    stop: StopHandle,
    stop_token: StopToken,
    shared: Arc<Mutex<EngineShared>>,
    transitions: Arc<Mutex<()>>,
    observer: Option<Arc<dyn EngineObserver>>,
    task_handle: Option<thread::JoinHandle<()>>,
}

impl<S: FrameSource + 'static> CaptureEngine<S> {
    /// Validate `config` against the source and build an idle engine.
    pub fn new(
        config: CaptureConfig,
        converter: SampleConverter,
        source: S,
    ) -> Result<Self, CaptureError> {
        let max_frame_len = source.max_frame_len();
        if let Err(e) = config.validate_for_source(max_frame_len) {
            log::error!("Rejected capture config for {}: {}", source.name(), e);
            return Err(e);
        }

        log::info!(
            "Sample rate: {} Hz. Seconds per buffer: {}. Channels: {}. Bits per sample: {}.",
            config.sample_rate,
            config.seconds_per_buffer,
            config.channels,
            config.bits_per_sample_out
        );
        log::info!(
            "Calculated samples per buffer: {} (source max {})",
            config.samples_per_buffer(),
            max_frame_len
        );

        let (producer, consumer) = handoff_queue(config.queue_capacity);
        let (stop, stop_token) = stop_signal();

        Ok(Self {
            source_name: source.name().to_string(),
            config,
            converter,
            source: Some(source),
            max_frame_len,
            producer: Some(producer),
            consumer,
            stop,
            stop_token,
            shared: Arc::new(Mutex::new(EngineShared::default())),
            transitions: Arc::new(Mutex::new(())),
            observer: None,
            task_handle: None,
        })
    }

    /// Register an observer. Only observed by an acquisition thread started
    /// after this call.
    pub fn set_observer(&mut self, observer: Arc<dyn EngineObserver>) {
        self.observer = Some(observer);
    }

    /// Spawn the acquisition thread. Transitions: idle → running.
    ///
    /// Accepted once per engine; later calls return `AlreadyStarted`.
    pub fn start(&mut self, options: TaskOptions) -> Result<(), CaptureError> {
        if !self.shared.lock().state.is_idle() {
            return Err(CaptureError::AlreadyStarted);
        }
        let (Some(mut source), Some(producer)) = (self.source.take(), self.producer.take()) else {
            return Err(CaptureError::AlreadyStarted);
        };

        log::info!(
            "Starting acquisition task {} (stack {} bytes, priority {})",
            options.name,
            options.stack_size,
            options.priority
        );

        set_state(
            &self.shared,
            &self.transitions,
            self.observer.as_deref(),
            EngineState::Running,
        );

        let converter = self.converter;
        let samples_per_buffer = self.config.samples_per_buffer();
        let stop = self.stop_token.clone();
        let shared = Arc::clone(&self.shared);
        let transitions = Arc::clone(&self.transitions);
        let observer = self.observer.clone();

        let spawned = thread::Builder::new()
            .name(options.name)
            .stack_size(options.stack_size)
            .spawn(move || {
                let result = acquisition_loop(
                    &mut source,
                    converter,
                    samples_per_buffer,
                    &producer,
                    &stop,
                    &shared,
                );
                finish_task(&shared, &transitions, observer.as_deref(), result);
                // State is final before the queue closes, so a consumer that
                // sees the close also sees the reason.
                drop(producer);
                drop(source);
                log::info!("Acquisition task stopped");
            });

        match spawned {
            Ok(handle) => {
                self.task_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                let err = CaptureError::Unknown(format!("failed to spawn acquisition thread: {}", e));
                set_state(
                    &self.shared,
                    &self.transitions,
                    self.observer.as_deref(),
                    EngineState::Faulted(err.clone()),
                );
                Err(err)
            }
        }
    }

    /// Wait up to `timeout` for the oldest captured buffer.
    ///
    /// `Ok(None)` means no buffer arrived in time. Once acquisition has ended
    /// and the queue is drained, returns the fault that ended it or `Stopped`.
    pub fn pop(&self, timeout: Duration) -> Result<Option<SampleBuffer>, CaptureError> {
        match self.consumer.pop(timeout) {
            Ok(Some(buffer)) => {
                log::trace!(
                    "Retrieved {} samples from queue. ts={}",
                    buffer.len(),
                    buffer.timestamp()
                );
                Ok(Some(buffer))
            }
            Ok(None) => {
                log::debug!("No samples within {:?}", timeout);
                Ok(None)
            }
            Err(QueueClosed) => Err(self.closed_reason()),
        }
    }

    /// Wait for the oldest captured buffer without a deadline.
    pub fn pop_blocking(&self) -> Result<SampleBuffer, CaptureError> {
        if self.shared.lock().state.is_idle() {
            return Err(CaptureError::NotStarted);
        }
        self.consumer
            .pop_blocking()
            .map_err(|QueueClosed| self.closed_reason())
    }

    /// Request shutdown and wait for the acquisition thread to exit.
    ///
    /// A thread blocked on a full queue wakes immediately; one blocked in a
    /// hardware read exits once that read returns. Buffers already queued
    /// remain available to `pop`. Returns the fault if acquisition had failed.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        let previous = {
            let _order = self.transitions.lock();
            let (previous, next) = {
                let mut shared = self.shared.lock();
                let previous = shared.state.clone();
                let next = match previous {
                    EngineState::Idle => Some(EngineState::Stopped),
                    EngineState::Running => Some(EngineState::Stopping),
                    _ => None,
                };
                if let Some(next) = &next {
                    shared.state = next.clone();
                }
                (previous, next)
            };
            // A thread that already finished has reported its terminal state.
            if let Some(next) = &next {
                self.notify(next);
            }
            previous
        };

        if previous.is_idle() {
            self.source.take();
            self.producer.take();
            return Ok(());
        }

        self.stop.trigger();
        if let Some(handle) = self.task_handle.take() {
            if handle.join().is_err() {
                log::error!("Acquisition thread panicked");
                let err = CaptureError::Unknown("acquisition thread panicked".into());
                set_state(
                    &self.shared,
                    &self.transitions,
                    self.observer.as_deref(),
                    EngineState::Faulted(err),
                );
            }
        }

        match self.state() {
            EngineState::Faulted(e) => Err(e),
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> EngineState {
        self.shared.lock().state.clone()
    }

    pub fn diagnostics(&self) -> EngineDiagnostics {
        self.shared.lock().diagnostics.clone()
    }

    /// Buffers waiting in the hand-off queue.
    pub fn queued(&self) -> usize {
        self.consumer.len()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn converter(&self) -> SampleConverter {
        self.converter
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn seconds_per_buffer(&self) -> f64 {
        self.config.seconds_per_buffer
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn bits_per_sample_out(&self) -> u16 {
        self.config.bits_per_sample_out
    }

    pub fn samples_per_buffer(&self) -> usize {
        self.config.samples_per_buffer()
    }

    /// WAV header describing this engine's output stream.
    pub fn wav_header(&self, number_of_samples: u64) -> [u8; WAV_HEADER_SIZE] {
        WavHeaderBuilder::from_config(&self.config).build(number_of_samples)
    }

    // --- Internal helpers ---

    fn closed_reason(&self) -> CaptureError {
        match &self.shared.lock().state {
            EngineState::Faulted(e) => e.clone(),
            _ => CaptureError::Stopped,
        }
    }

    fn notify(&self, state: &EngineState) {
        if let Some(ref observer) = self.observer {
            observer.on_state_changed(state);
        }
    }
}

impl<S: FrameSource + 'static> Drop for CaptureEngine<S> {
    fn drop(&mut self) {
        self.stop.trigger();
        let dropped = self.consumer.drain();
        if dropped > 0 {
            log::debug!("Discarding {} unconsumed buffers", dropped);
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Update the state and notify the observer.
///
/// `transitions` is held across both steps so observers see states in the
/// order they were set. The state lock is released before the callback.
fn set_state(
    shared: &Mutex<EngineShared>,
    transitions: &Mutex<()>,
    observer: Option<&dyn EngineObserver>,
    new_state: EngineState,
) {
    let _order = transitions.lock();
    shared.lock().state = new_state.clone();
    if let Some(observer) = observer {
        observer.on_state_changed(&new_state);
    }
}

/// Record how the acquisition thread ended.
fn finish_task(
    shared: &Mutex<EngineShared>,
    transitions: &Mutex<()>,
    observer: Option<&dyn EngineObserver>,
    result: Result<(), CaptureError>,
) {
    match result {
        Ok(()) => set_state(shared, transitions, observer, EngineState::Stopped),
        Err(e) => {
            log::error!("Acquisition failed: {}", e);
            set_state(shared, transitions, observer, EngineState::Faulted(e.clone()));
            if let Some(observer) = observer {
                observer.on_fault(&e);
            }
        }
    }
}

/// Body of the acquisition thread.
///
/// Loop: stop check → blocking read → allocate and timestamp → convert →
/// blocking push. Returns `Ok` on stop or end of stream, `Err` on the first
/// hardware error.
fn acquisition_loop<S: FrameSource>(
    source: &mut S,
    converter: SampleConverter,
    samples_per_buffer: usize,
    producer: &BufferProducer,
    stop: &StopToken,
    shared: &Mutex<EngineShared>,
) -> Result<(), CaptureError> {
    let mut raw = vec![0u32; samples_per_buffer];

    log::info!("Starting loop for task {}", source.name());
    while !stop.is_stopped() {
        log::trace!("Reading samples from {}", source.name());
        let read = source.read_frame(&mut raw)?.min(raw.len());
        if read == 0 {
            log::info!("{} reached end of stream", source.name());
            return Ok(());
        }
        if stop.is_stopped() {
            break;
        }

        let mut buffer = SampleBuffer::allocate(read);
        converter.convert(&raw[..read], buffer.samples_mut());

        {
            let mut s = shared.lock();
            s.diagnostics.frames_read += 1;
            s.diagnostics.samples_captured += read as u64;
            if read < samples_per_buffer {
                s.diagnostics.short_reads += 1;
            }
        }

        let timestamp = buffer.timestamp();
        match producer.push(buffer, stop) {
            PushOutcome::Delivered => {
                shared.lock().diagnostics.buffers_published += 1;
                log::trace!("Sent {} samples to queue. ts={}", read, timestamp);
            }
            PushOutcome::Stopped => break,
            PushOutcome::ConsumerGone => {
                log::warn!("Consumer gone, ending acquisition");
                break;
            }
        }
    }
    Ok(())
}
