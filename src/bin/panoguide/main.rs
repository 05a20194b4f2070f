//! Headless runner for a capture session. Orientation comes from a simulated
//! phone, a recorded trace, or a sensor bridge on a serial port; frames come
//! from a synthetic camera that looks wherever the session thinks the phone
//! is pointing.

use clap::Parser;
use log::{debug, error, info, warn};
use panoguide::{
    args::{CommandTask, GuideArgs, LiveCommand, RecordCommand, ReplayCommand, SimulateCommand},
    audio_sonar::{AudioError, ToneSink},
    capture_sequencer::{Phase, SequencerEvent, TourCapture},
    config::GuideConfig,
    dummy_orientation::DummyOrientation,
    gui::{device_selector, fold_until_stop},
    orientation_source::{AlphaOnly, OrientationSource, SensorSample},
    sample_buffer::SampleBuffer,
    sensor_message_decoder::SensorMessage,
    sensor_trace::SensorTrace,
    session::CaptureSession,
    synthetic_camera::SyntheticCamera,
    tone_writer::WavToneSink,
};
use rand::prelude::*;
use serial2::SerialPort;
use std::{
    error::Error,
    io,
    path::PathBuf,
    process::ExitCode,
    str::{self, FromStr},
    sync::PoisonError,
    thread::spawn,
    time::{Duration, Instant},
};

// Example:
// cargo run --bin panoguide -- simulate --noise 0.2 --wav sonar.wav
// cargo run --bin panoguide -- record --out walk.trace --duration 30
// cargo run --bin panoguide -- replay --trace walk.trace

const PUMP_PERIOD: Duration = Duration::from_millis(5);
const STATUS_PERIOD: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    env_logger::init();
    let args = GuideArgs::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Could not load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        CommandTask::Simulate(cmd) => simulate(&config, cmd),
        CommandTask::Replay(cmd) => replay(&config, cmd),
        CommandTask::Record(cmd) => record(cmd),
        CommandTask::Live(cmd) => live(&config, cmd),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Open the WAV sink if one was asked for. The returned handle is kept to
/// finalize the file once the session is over.
fn open_audio(wav: &Option<String>) -> (Result<Box<dyn ToneSink>, AudioError>, Option<WavToneSink>) {
    match wav {
        Some(path) => {
            let sink = WavToneSink::new(path);
            (Ok(Box::new(sink.clone())), Some(sink))
        }
        None => (
            Err(AudioError::Unavailable("no output requested".to_string())),
            None,
        ),
    }
}

fn finish_audio(sink: Option<WavToneSink>) -> Result<(), Box<dyn Error>> {
    if let Some(sink) = sink {
        sink.finalize()?;
    }
    Ok(())
}

fn report(tour: Option<TourCapture>) {
    match tour {
        Some(tour) => {
            info!("Tour complete with {} frames.", tour.len());
            for (bearing, image) in tour.frames.iter() {
                info!("  {:>5.1}° : {}x{}", bearing, image.width, image.height);
            }
        }
        None => warn!("Session ended before the tour was complete."),
    }
}

/// Pump the session until review or timeout, keeping the synthetic camera
/// pointed where the phone is. `steer` runs once per pass.
fn drive<O, F>(
    session: &mut CaptureSession<O, SyntheticCamera>,
    timeout: Duration,
    mut steer: F,
) where
    O: OrientationSource,
    F: FnMut(&CaptureSession<O, SyntheticCamera>),
{
    let view = session.backend().view_heading();
    let started = Instant::now();
    let mut last_status = Instant::now();

    while session.phase() != Phase::Review {
        for event in session.pump() {
            match event {
                SequencerEvent::Captured { index } => info!("Captured node {}.", index + 1),
                SequencerEvent::CaptureDeferred { index } => {
                    debug!("Camera not ready at node {}, holding.", index + 1)
                }
                SequencerEvent::Completed => info!("All nodes captured."),
            }
        }

        let status = session.status();
        let offset = session.sequencer().calibration_offset();
        *view.lock().unwrap_or_else(PoisonError::into_inner) = offset + status.relative_heading_deg;
        steer(&*session);

        if last_status.elapsed() >= STATUS_PERIOD {
            info!(
                "node {}/6  error {:>6.1}°  lock {:>5.1}%  {}",
                status.active_index + 1,
                status.angular_error_deg,
                status.lock_progress,
                if status.steady { "steady" } else { "moving" }
            );
            last_status = Instant::now();
        }
        if started.elapsed() >= timeout {
            warn!("Timed out after {:?}.", timeout);
            break;
        }
        spin_sleep::sleep(PUMP_PERIOD);
    }
}

fn simulate(config: &GuideConfig, cmd: SimulateCommand) -> Result<(), Box<dyn Error>> {
    let start_heading = thread_rng().gen_range(-180.0..180.0);
    let source = DummyOrientation::builder()
        .rate_hz(cmd.rate_hz)
        .noise(cmd.noise)
        .start_heading(start_heading)
        .build();
    let camera = SyntheticCamera::builder().warmup_grabs(2).build();
    let (audio, wav) = open_audio(&cmd.wav);

    let mut session = CaptureSession::new(config, source, camera, audio);
    session.start()?;

    drive(
        &mut session,
        Duration::from_secs_f64(cmd.timeout_s),
        |session| {
            let offset = session.sequencer().calibration_offset();
            if let Some(node) = session.sequencer().active_node() {
                session.source().aim(offset + node.target_bearing_deg);
            }
        },
    );

    report(session.exit());
    finish_audio(wav)
}

fn replay(config: &GuideConfig, cmd: ReplayCommand) -> Result<(), Box<dyn Error>> {
    let trace = SensorTrace::from_path(&cmd.trace)?;
    info!(
        "Replaying {} samples recorded at {} Hz.",
        trace.samples().len(),
        trace.nominal_rate_hz()
    );
    let camera = SyntheticCamera::builder().build();
    let (audio, wav) = open_audio(&cmd.wav);

    let mut session = CaptureSession::new(config, trace.replay(), camera, audio);
    session.start()?;

    // One sample per pass so the camera follows the trace sample by sample.
    let view = session.backend().view_heading();
    while session.phase() != Phase::Review && session.source().remaining() > 0 {
        for event in session.pump_limited(1) {
            info!("{:?}", event);
        }
        let offset = session.sequencer().calibration_offset();
        *view.lock().unwrap_or_else(PoisonError::into_inner) =
            offset + session.status().relative_heading_deg;
    }

    report(session.exit());
    finish_audio(wav)
}

/// One slice of a recording sweep: collect what the simulated phone has
/// produced, then turn it on to the next 60° stop every three seconds.
fn record_step(
    (mut source, mut samples): (DummyOrientation, Vec<SensorSample>),
) -> (DummyOrientation, Vec<SensorSample>) {
    samples.extend(source.by_ref());
    let elapsed_ms = samples.last().map_or(0.0, |s| s.timestamp_ms);
    source.aim(60.0 * (elapsed_ms / 3000.0).floor());
    spin_sleep::sleep(Duration::from_millis(10));
    (source, samples)
}

fn record(cmd: RecordCommand) -> Result<(), Box<dyn Error>> {
    let source = DummyOrientation::builder().rate_hz(cmd.rate_hz).build();

    let (mut source, samples) = match cmd.seconds {
        Some(seconds) => {
            let deadline = Instant::now() + Duration::from_secs_f64(seconds);
            let mut state = (source, Vec::new());
            while Instant::now() < deadline {
                state = record_step(state);
            }
            state
        }
        None => fold_until_stop("Recording orientation", (source, Vec::new()), record_step)?,
    };
    source.stop();

    let trace = SensorTrace::new(cmd.rate_hz.round() as u64, samples);
    trace.to_path(&cmd.outfile)?;
    info!(
        "Wrote {} samples to {}.",
        trace.samples().len(),
        cmd.outfile
    );
    Ok(())
}

fn open_bridge(cmd: &LiveCommand) -> Result<Option<SerialPort>, Box<dyn Error>> {
    let path = match &cmd.device {
        Some(device) => PathBuf::from(device),
        None => match device_selector(SerialPort::available_ports()?)? {
            Some(path) => path,
            None => return Ok(None),
        },
    };
    let mut port = SerialPort::open(&path, cmd.baud)?;
    // Short timeout so the reader notices when the session lets go.
    port.set_read_timeout(Duration::from_millis(200))?;
    info!("Listening to {}.", path.display());
    Ok(Some(port))
}

fn live(config: &GuideConfig, cmd: LiveCommand) -> Result<(), Box<dyn Error>> {
    let Some(port) = open_bridge(&cmd)? else {
        info!("No device chosen.");
        return Ok(());
    };

    let buffer = if cmd.alpha_only {
        SampleBuffer::with_selector(AlphaOnly)
    } else {
        SampleBuffer::new()
    };
    let feed = buffer.clone();

    let reader = spawn(move || {
        let mut chunk = [0; 256];
        let mut line = Vec::new();

        while !feed.is_released() {
            let read_len = match port.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    warn!("Sensor bridge disconnected: {}", e);
                    break;
                }
            };

            for &c in chunk.iter().take(read_len) {
                line.push(c);
                if c != b'\n' {
                    continue;
                }
                match str::from_utf8(&line) {
                    Ok(s) => match SensorMessage::from_str(s) {
                        Ok(SensorMessage::Orient(event)) => feed.add_event(event),
                        Err(e) => warn!("Was unable to parse sensor message: {}", e),
                    },
                    // Often happens at the beginning of transmission when
                    // there is still garbage in the hardware buffer
                    Err(e) => warn!("Failed to decode utf-8: {:?}", e),
                }
                line.clear();
            }
        }
    });

    let camera = SyntheticCamera::builder().build();
    let mut session = CaptureSession::new(
        config,
        buffer,
        camera,
        Err(AudioError::Unavailable("no speaker on the host".to_string())),
    );
    session.start()?;
    drive(&mut session, Duration::from_secs_f64(cmd.timeout_s), |_| {});

    report(session.exit());
    if reader.join().is_err() {
        warn!("Sensor reader thread panicked.");
    }
    Ok(())
}
