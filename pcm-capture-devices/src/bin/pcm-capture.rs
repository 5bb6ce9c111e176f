use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use pcm_capture_core::storage::metadata::write_metadata;
use pcm_capture_core::{
    CaptureConfig, CaptureEngine, CaptureError, EngineDiagnostics, FrameSource, StreamMetadata,
    StreamSummary, TaskOptions, WavHeaderBuilder, WavStreamWriter, STREAMING_SAMPLES,
};
use pcm_capture_devices::{DeviceProfile, RawStreamSource, ToneSource};

/// Delay before the first restart; each later restart waits one step longer.
const RESTART_BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Capture PCM from a raw front end into a WAV stream.
#[derive(Debug, Parser)]
#[command(name = "pcm-capture", about, version)]
struct Args {
    /// Front end producing the raw words (adc or mems)
    #[arg(long, default_value = "mems")]
    profile: DeviceProfile,

    /// Raw word stream to read: device node, pipe or recorded dump
    #[arg(long, conflicts_with = "tone", required_unless_present = "tone")]
    input: Option<PathBuf>,

    /// Generate a sine tone at this frequency instead of reading input
    #[arg(long, value_name = "HZ")]
    tone: Option<f64>,

    /// JSON capture config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    seconds_per_buffer: Option<f64>,

    /// Output WAV file, or `-` for a live stream on stdout
    #[arg(long, short, default_value = "-")]
    output: PathBuf,

    /// Stop after this many seconds of audio
    #[arg(long)]
    duration: Option<f64>,

    /// How long to wait for each buffer before logging a stall
    #[arg(long, default_value_t = 1000)]
    pop_timeout_ms: u64,

    /// Restarts allowed after a hardware fault
    #[arg(long, default_value_t = 0)]
    max_restarts: u32,
}

impl Args {
    fn capture_config(&self) -> Result<CaptureConfig> {
        let mut config = match &self.config {
            Some(path) => CaptureConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => self.profile.default_config(),
        };
        if let Some(rate) = self.sample_rate {
            config.sample_rate = rate;
        }
        if let Some(seconds) = self.seconds_per_buffer {
            config.seconds_per_buffer = seconds;
        }
        config
            .validate_for_source(self.profile.max_frame_len())
            .context("invalid capture config")?;
        Ok(config)
    }

    fn sample_limit(&self, config: &CaptureConfig) -> Result<Option<u64>> {
        match self.duration {
            Some(secs) if !(secs.is_finite() && secs > 0.0) => {
                bail!("--duration must be a positive number of seconds, got {}", secs)
            }
            Some(secs) => Ok(Some((secs * config.sample_rate as f64).round() as u64)),
            None => Ok(None),
        }
    }

    fn open_source(&self, config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        if let Some(frequency) = self.tone {
            return Ok(Box::new(ToneSource::new(self.profile, config.sample_rate, frequency)));
        }
        let Some(path) = &self.input else {
            bail!("either --input or --tone is required");
        };
        Ok(Box::new(RawStreamSource::open(path, self.profile)?))
    }

    fn session(&self, config: &CaptureConfig) -> Result<Session> {
        Ok(Session {
            config: config.clone(),
            profile: self.profile,
            limit: self.sample_limit(config)?,
            pop_timeout: Duration::from_millis(self.pop_timeout_ms),
            max_restarts: self.max_restarts,
            backoff_step: RESTART_BACKOFF_STEP,
        })
    }

    fn is_stdout(&self) -> bool {
        self.output == Path::new("-")
    }
}

/// Everything one capture run needs apart from the sources themselves.
struct Session {
    config: CaptureConfig,
    profile: DeviceProfile,
    /// Samples to write before stopping; `None` runs until end of stream.
    limit: Option<u64>,
    pop_timeout: Duration,
    max_restarts: u32,
    backoff_step: Duration,
}

/// How a capture run ended.
#[derive(Debug)]
struct CaptureOutcome {
    source_name: String,
    diagnostics: EngineDiagnostics,
    restarts: u32,
}

impl Session {
    /// Run engines until the source ends, the limit is reached, or faults
    /// exhaust the restart budget. `open_source` is called once per engine.
    fn capture<S, W>(
        &self,
        mut open_source: impl FnMut() -> Result<S>,
        writer: &mut WavStreamWriter<W>,
    ) -> Result<CaptureOutcome>
    where
        S: FrameSource + 'static,
        W: Write,
    {
        let mut diagnostics = EngineDiagnostics::default();
        let mut restarts = 0u32;

        loop {
            let source = open_source()?;
            let source_name = source.name().to_string();
            let mut engine = CaptureEngine::new(self.config.clone(), self.profile.converter(), source)?;
            engine.start(TaskOptions::named(self.profile.task_name()))?;

            let result = self.pump(&engine, writer);
            let stopped = engine.stop();
            diagnostics.accumulate(&engine.diagnostics());

            match result {
                Ok(()) => {
                    stopped?;
                    log::info!(
                        "Capture finished: {} frames read, {} short, {} buffers published, {} restarts",
                        diagnostics.frames_read,
                        diagnostics.short_reads,
                        diagnostics.buffers_published,
                        restarts
                    );
                    return Ok(CaptureOutcome {
                        source_name,
                        diagnostics,
                        restarts,
                    });
                }
                Err(err) if err.is_fault() && restarts < self.max_restarts => {
                    restarts += 1;
                    let backoff = self.backoff_step * restarts;
                    log::warn!(
                        "{} failed: {}. Restart {}/{} in {:?}",
                        source_name,
                        err,
                        restarts,
                        self.max_restarts,
                        backoff
                    );
                    drop(engine);
                    thread::sleep(backoff);
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("capture from {} failed", source_name))
                }
            }
        }
    }

    /// Move buffers from the engine to the writer, trimming the last one to
    /// the sample limit.
    fn pump<S: FrameSource + 'static, W: Write>(
        &self,
        engine: &CaptureEngine<S>,
        writer: &mut WavStreamWriter<W>,
    ) -> Result<(), CaptureError> {
        loop {
            let remaining = self.limit.map(|l| l.saturating_sub(writer.samples_written()));
            if remaining == Some(0) {
                return Ok(());
            }
            match engine.pop(self.pop_timeout) {
                Ok(Some(buffer)) => {
                    let samples = buffer.samples();
                    let take = remaining.map_or(samples.len(), |r| samples.len().min(r as usize));
                    writer.write_samples(&samples[..take])?;
                }
                Ok(None) => log::warn!(
                    "No buffer from {} within {:?}",
                    engine.source_name(),
                    self.pop_timeout
                ),
                Err(CaptureError::Stopped) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = args.capture_config()?;
    let session = args.session(&config)?;
    let declared = session.limit.unwrap_or(STREAMING_SAMPLES);
    let builder = WavHeaderBuilder::from_config(&config);
    let open_source = || args.open_source(&config);

    if args.is_stdout() {
        let stdout = io::stdout().lock();
        let mut writer = WavStreamWriter::new(BufWriter::new(stdout), builder, declared)?;
        session.capture(open_source, &mut writer)?;
        let (_, summary) = writer.finish()?;
        log_summary(&summary, &config);
        return Ok(());
    }

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = WavStreamWriter::new(file, builder, declared)?;
    let outcome = session.capture(open_source, &mut writer)?;
    let (_, summary) = writer.finalize()?;
    log_summary(&summary, &config);

    let metadata = StreamMetadata::new(
        &config,
        &outcome.source_name,
        args.profile.converter().name(),
        &summary,
    )
    .with_capture_stats(outcome.diagnostics, outcome.restarts);
    write_metadata(&metadata, &args.output).context("writing metadata sidecar")?;
    log::info!("Wrote {}", args.output.display());
    Ok(())
}

fn log_summary(summary: &StreamSummary, config: &CaptureConfig) {
    log::info!(
        "{} samples ({:.2} s), {} bytes, sha256 {}",
        summary.samples_written,
        summary.samples_written as f64 / config.sample_rate as f64,
        summary.bytes_written,
        summary.checksum
    );
}
