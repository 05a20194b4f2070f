//! PanoGuide walks someone holding a phone through a 360° photo capture.
//! Six targets sit 60° apart around the spot where the user stands. The
//! guide reads the phone's orientation and smooths it, then steers the user
//! toward the next target with sonar beeps and an on-screen overlay. It
//! takes the photo by itself once the phone has been held on target and
//! steady for long enough. When all six are in, the user can look around
//! the result in a small 360° viewer.
//!
//! The library is independent of any particular phone or UI. Orientation
//! comes from an [`orientation_source::OrientationSource`], which may be a
//! simulated hand ([`dummy_orientation`]), a recorded trace
//! ([`sensor_trace`]) or a serial sensor bridge
//! ([`sensor_message_decoder`] feeding a [`sample_buffer`]). Cameras and
//! speakers are reached through [`camera_source::CameraBackend`] and
//! [`audio_sonar::ToneSink`]. A [`session::CaptureSession`] ties them
//! together and makes sure every device is released however the session
//! ends.

#![warn(missing_docs)]
pub mod angle_math;
pub mod args;
pub mod audio_sonar;
pub mod camera_source;
pub mod capture_sequencer;
pub mod config;
pub mod dummy_orientation;
pub mod error;
pub mod guidance_overlay;
pub mod gui;
pub mod heading_filter;
pub mod lock_on;
pub mod orientation_source;
pub mod panoramic_preview;
pub mod sample_buffer;
pub mod sensor_message_decoder;
pub mod sensor_trace;
pub mod session;
pub mod synthetic_camera;
pub mod tone_writer;
