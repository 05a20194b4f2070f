//! Terminal front ends: the guidance screen, the panoramic preview, a serial
//! port picker and a simple "run until a key is pressed" wrapper.

mod device_selector;
mod error;
mod fold_until_stop;
mod guidance;
mod preview;

pub use device_selector::device_selector;
pub use error::GuideGuiError;
pub use fold_until_stop::fold_until_stop;
pub use guidance::{compass_strip, draw_guidance, ghost_pixels};
pub use preview::{draw_preview, half_block_lines};
