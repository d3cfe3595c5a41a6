//! Per-deck waveform cache, filled asynchronously on track load

use crate::waveform::WaveformEnvelope;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Default number of overview points for a full track
pub const DEFAULT_OVERVIEW_POINTS: usize = 1000;

#[derive(Default)]
struct CacheInner {
    /// Bumped on every load/unload; stale builds compare against it
    generation: AtomicU64,
    /// Duration of the bound track, published before the envelope is ready
    duration_bits: AtomicU64,
    envelope: RwLock<Option<Arc<WaveformEnvelope>>>,
}

/// Amplitude envelope cache queried by the view layer
///
/// The engine only tells the cache about load and unload transitions; all
/// drawing queries come from the view through [`WaveformCache::envelope`].
#[derive(Clone)]
pub struct WaveformCache {
    inner: Arc<CacheInner>,
    overview_points: usize,
}

impl Default for WaveformCache {
    fn default() -> Self {
        Self::new(DEFAULT_OVERVIEW_POINTS)
    }
}

impl WaveformCache {
    pub fn new(overview_points: usize) -> Self {
        Self {
            inner: Arc::new(CacheInner::default()),
            overview_points,
        }
    }

    /// A new track was bound: drop the old envelope and start building one
    ///
    /// Returns immediately; the envelope appears once the background build finishes.
    pub fn on_load(&self, samples: Arc<Vec<f32>>, sample_rate: u32) {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *self.inner.envelope.write() = None;

        let duration = if sample_rate == 0 {
            0.0
        } else {
            (samples.len() / 2) as f64 / sample_rate as f64
        };
        self.inner
            .duration_bits
            .store(duration.to_bits(), Ordering::Release);

        let inner = Arc::clone(&self.inner);
        let points = self.overview_points;
        let spawned = thread::Builder::new()
            .name("waveform-cache".into())
            .spawn(move || {
                let envelope = WaveformEnvelope::build(&samples, sample_rate, points);
                let mut slot = inner.envelope.write();
                // A newer load or an unload happened while we were building
                if inner.generation.load(Ordering::Acquire) != generation {
                    debug!(generation, "discarding stale waveform envelope");
                    return;
                }
                *slot = Some(Arc::new(envelope));
                debug!(generation, duration, "waveform envelope ready");
            });

        if let Err(e) = spawned {
            warn!("failed to spawn waveform builder: {}", e);
        }
    }

    /// The bound track was unloaded
    pub fn on_unload(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.duration_bits.store(0f64.to_bits(), Ordering::Release);
        *self.inner.envelope.write() = None;
    }

    pub fn is_ready(&self) -> bool {
        self.inner.envelope.read().is_some()
    }

    /// Duration of the bound track (0 when nothing is bound)
    pub fn total_duration_secs(&self) -> f64 {
        f64::from_bits(self.inner.duration_bits.load(Ordering::Acquire))
    }

    /// Current envelope, if the build has finished
    pub fn envelope(&self) -> Option<Arc<WaveformEnvelope>> {
        self.inner.envelope.read().clone()
    }
}
