//! The thread-safe buffer where orientation readings from another thread
//! (a serial bridge, a platform callback) wait to be processed.

use crate::orientation_source::{
    BearingSelector, CompassFirst, OrientationEvent, OrientationSource, SensorSample,
};

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

/// An [`OrientationSource`] that simply acts as a thread-safe FIFO. Clones
/// share the same buffer, so one clone can be handed to a producer thread
/// while the session consumes from another.
#[derive(Clone)]
pub struct SampleBuffer {
    samples: Arc<Mutex<VecDeque<SensorSample>>>,
    released: Arc<AtomicBool>,
    selector: Arc<dyn BearingSelector + Send + Sync>,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBuffer {
    /// Instantiate an empty buffer that picks bearings with [`CompassFirst`].
    pub fn new() -> Self {
        Self::with_selector(CompassFirst)
    }

    /// Instantiate an empty buffer with a specific bearing selector.
    pub fn with_selector(selector: impl BearingSelector + Send + Sync + 'static) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::new())),
            released: Arc::new(AtomicBool::new(false)),
            selector: Arc::new(selector),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<SensorSample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a platform event, reduced to a [`SensorSample`]. Ignored once
    /// the buffer has been released.
    pub fn add_event(&self, event: OrientationEvent) {
        self.add_sample(event.to_sample(self.selector.as_ref()));
    }

    /// Insert a sample directly. Ignored once the buffer has been released.
    pub fn add_sample(&self, sample: SensorSample) {
        if self.is_released() {
            return;
        }
        self.queue().push_back(sample);
    }

    /// Number of samples waiting.
    pub fn len(&self) -> usize {
        self.queue().len()
    }

    /// Whether no samples are waiting.
    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// Whether [`OrientationSource::release`] has been called on any clone.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Iterator for SampleBuffer {
    type Item = SensorSample;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue().pop_front()
    }
}

impl OrientationSource for SampleBuffer {
    fn clear(&mut self) {
        self.queue().clear();
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
