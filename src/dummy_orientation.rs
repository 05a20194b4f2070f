//! A stand-in for a real phone: a background thread that produces noisy
//! orientation samples as if someone were holding the device and turning
//! towards an aim heading.

use crate::angle_math::{angular_diff, normalize, Degree};
use crate::orientation_source::{OrientationSource, SensorSample};
use log::debug;
use rand::prelude::*;
use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// A simulated hand-held device.
pub struct DummyOrientation {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    msgs: Arc<Mutex<VecDeque<SensorSample>>>,
}

enum Signal {
    Aim(Degree),
    Nudge(Degree),
    Noise(Degree),
    Tilt(Degree),
    Stop,
}

/// Builder for [`DummyOrientation`].
#[derive(Debug, Clone)]
pub struct DummyOrientationBuilder {
    rate_hz: f64,
    noise_deg: Degree,
    start_heading_deg: Degree,
    slew_dps: f64,
    tilt_deg: Degree,
}

impl DummyOrientationBuilder {
    /// Samples per second.
    pub fn rate_hz(self, rate_hz: f64) -> Self {
        Self { rate_hz, ..self }
    }

    /// Half-width of the uniform jitter added to each heading.
    pub fn noise(self, noise_deg: Degree) -> Self {
        Self { noise_deg, ..self }
    }

    /// Heading the device points at when the thread starts.
    pub fn start_heading(self, start_heading_deg: Degree) -> Self {
        Self {
            start_heading_deg,
            ..self
        }
    }

    /// How fast the simulated hand turns, in degrees per second.
    pub fn slew(self, slew_dps: f64) -> Self {
        Self { slew_dps, ..self }
    }

    /// Pitch offset from upright.
    pub fn tilt(self, tilt_deg: Degree) -> Self {
        Self { tilt_deg, ..self }
    }

    /// Start the generator thread.
    pub fn build(self) -> DummyOrientation {
        let (tx, rx) = mpsc::channel::<Signal>();
        let msgs = Arc::new(Mutex::new(VecDeque::new()));
        let th_msgs = Arc::clone(&msgs);

        let handle = thread::spawn(move || {
            let period = Duration::from_secs_f64(1.0 / self.rate_hz.max(1.0));
            let dt = period.as_secs_f64();
            let started = Instant::now();
            let mut rng = thread_rng();
            let mut heading = normalize(self.start_heading_deg);
            let mut aim = heading;
            let mut noise = self.noise_deg;
            let mut tilt = self.tilt_deg;

            loop {
                while let Ok(received) = rx.try_recv() {
                    match received {
                        Signal::Aim(new_aim) => aim = normalize(new_aim),
                        Signal::Nudge(by) => aim = normalize(aim + by),
                        Signal::Noise(new_noise) => noise = new_noise,
                        Signal::Tilt(new_tilt) => tilt = new_tilt,
                        Signal::Stop => return,
                    }
                }

                let max_step = self.slew_dps * dt;
                let to_go = angular_diff(aim, heading);
                heading = normalize(heading + to_go.clamp(-max_step, max_step));

                let jitter = if noise > 0.0 {
                    rng.gen_range(-noise..noise)
                } else {
                    0.0
                };
                let sample = SensorSample {
                    raw_heading_deg: normalize(heading + jitter),
                    raw_tilt_deg: 90.0 + tilt,
                    timestamp_ms: started.elapsed().as_secs_f64() * 1000.0,
                };
                th_msgs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(sample);

                spin_sleep::sleep(period);
            }
        });

        DummyOrientation {
            handle: Some(handle),
            tx,
            msgs,
        }
    }
}

impl DummyOrientation {
    /// Start configuring a generator. Defaults: 60 Hz, 0.05° jitter,
    /// heading 0°, turning at 90°/s, held upright.
    pub fn builder() -> DummyOrientationBuilder {
        DummyOrientationBuilder {
            rate_hz: 60.0,
            noise_deg: 0.05,
            start_heading_deg: 0.0,
            slew_dps: 90.0,
            tilt_deg: 0.0,
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<SensorSample>> {
        self.msgs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // A send only fails once the thread has stopped, and then there is
    // nobody left to steer.
    fn signal(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            debug!("DummyOrientation : generator already stopped.");
        }
    }

    /// Turn towards an absolute heading.
    pub fn aim(&self, heading: Degree) {
        self.signal(Signal::Aim(heading));
    }

    /// Shift the aim by a relative amount.
    pub fn nudge(&self, by: Degree) {
        self.signal(Signal::Nudge(by));
    }

    /// Change the jitter amplitude.
    pub fn set_noise(&self, noise: Degree) {
        self.signal(Signal::Noise(noise));
    }

    /// Change the pitch offset from upright.
    pub fn set_tilt(&self, tilt: Degree) {
        self.signal(Signal::Tilt(tilt));
    }

    /// Stop the generator thread and wait for it.
    pub fn stop(&mut self) {
        // `.join()` consumes the handle, so take it out of the struct first.
        if let Some(thread) = self.handle.take() {
            self.signal(Signal::Stop);
            if thread.join().is_err() {
                debug!("DummyOrientation : generator thread panicked.");
            }
        }
    }
}

impl Iterator for DummyOrientation {
    type Item = SensorSample;
    fn next(&mut self) -> Option<Self::Item> {
        self.queue().pop_front()
    }
}

impl OrientationSource for DummyOrientation {
    fn clear(&mut self) {
        self.queue().clear();
    }

    fn release(&mut self) {
        self.stop();
    }
}

impl Drop for DummyOrientation {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut DummyOrientation, wait: Duration) -> Vec<SensorSample> {
        thread::sleep(wait);
        source.by_ref().collect()
    }

    #[test]
    fn produces_samples_in_time_order() {
        let mut source = DummyOrientation::builder().rate_hz(200.0).build();
        let samples = drain(&mut source, Duration::from_millis(100));
        assert!(samples.len() > 5);
        assert!(samples
            .windows(2)
            .all(|w| w[1].timestamp_ms >= w[0].timestamp_ms));
        source.stop();
    }

    #[test]
    fn turns_towards_aim() {
        let mut source = DummyOrientation::builder()
            .rate_hz(200.0)
            .noise(0.0)
            .slew(2000.0)
            .start_heading(170.0)
            .build();
        source.aim(-170.0);
        let samples = drain(&mut source, Duration::from_millis(100));
        let last = samples.last().unwrap();
        assert!(angular_diff(last.raw_heading_deg, -170.0).abs() < 1e-6);
        // Took the short way across the seam.
        assert!(samples
            .iter()
            .all(|s| s.raw_heading_deg.abs() >= 170.0 - 1e-6));
        assert!(samples.iter().all(|s| s.raw_tilt_deg == 90.0));
    }

    #[test]
    fn release_stops_the_thread() {
        let mut source = DummyOrientation::builder().rate_hz(200.0).build();
        source.release();
        source.clear();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(source.next(), None);
        source.release();
        source.nudge(10.0);
    }
}
