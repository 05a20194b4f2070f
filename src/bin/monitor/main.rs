mod gui;

use clap::Parser;
use panoguide::{
    audio_sonar::{AudioError, Tone, ToneSink, CHIME_FIRST},
    config::GuideConfig,
    dummy_orientation::DummyOrientation,
    orientation_source::Millis,
    session::CaptureSession,
    synthetic_camera::SyntheticCamera,
};
use std::path::PathBuf;

use gui::engage_gui;

/// Interactive guide against a simulated phone: steer with the arrow keys
/// and watch the overlay, then look around the result.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct MonitorArgs {
    /// RON file overriding the default tuning
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Half-width of the heading jitter, in degrees
    #[arg(short = 'n', long = "noise", default_value_t = 0.05)]
    noise: f64,
}

fn main() {
    env_logger::init();
    let args = MonitorArgs::parse();

    let config = match &args.config {
        Some(path) => match GuideConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Could not load config: {}", e);
                return;
            }
        },
        None => GuideConfig::default(),
    };

    let source = DummyOrientation::builder().noise(args.noise).build();
    let camera = SyntheticCamera::builder().warmup_grabs(2).build();
    let session = CaptureSession::new(&config, source, camera, Ok(Box::new(TerminalBell)));

    if let Err(e) = engage_gui(config, session) {
        eprintln!("{}", e);
    }
}

/// The only speaker a terminal has. Rings once per chime, not per beep.
struct TerminalBell;

impl ToneSink for TerminalBell {
    fn play(&mut self, tone: &Tone, _at_ms: Millis) -> Result<(), AudioError> {
        if *tone == CHIME_FIRST {
            print!("\x07");
        }
        Ok(())
    }

    fn suspend(&mut self) {}
}
