// ── Visual sampler ──
//
// Reduces a stream of RGBA frames to one representative color per tick.
// Frames arrive much faster than the strip can consume colors, so the
// sampler is paced (~30 Hz by default), samples a bounded number of
// pixels per frame regardless of resolution, and publishes into a
// single-slot mailbox where a newer sample silently replaces an unread
// older one.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::model::Rgb;

/// One captured frame: tightly-packed RGBA bytes. The alpha channel is
/// carried but never sampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Where frames come from. Acquisition is explicit so a source backed by
/// a real capture session can open and close it deterministically.
pub trait FrameSource: Send + 'static {
    /// Open the source. Failure here surfaces as
    /// [`CoreError::SourceUnavailable`] from [`Sampler::start`] and no
    /// sampling task is spawned.
    fn acquire(&mut self) -> impl std::future::Future<Output = Result<(), CoreError>> + Send;

    /// Fetch the most recent frame, if any is available yet. Returning
    /// `Ok(None)` is normal early in a session; the sampler just waits
    /// for the next tick.
    fn poll_frame(&mut self)
    -> impl std::future::Future<Output = Result<Option<Frame>, CoreError>> + Send;

    /// Close the source. Called exactly once, after the loop exits.
    fn release(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// Pacing and stride tunables.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Interval between samples. 33 ms ≈ 30 Hz.
    pub cadence: Duration,
    /// Approximate number of pixels examined per frame.
    pub pixel_target: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(33),
            pixel_target: 1000,
        }
    }
}

impl SamplerConfig {
    pub fn from_cadence_hz(cadence_hz: u32, pixel_target: usize) -> Self {
        let hz = cadence_hz.max(1);
        Self {
            cadence: Duration::from_millis(u64::from(1000 / hz).max(1)),
            pixel_target,
        }
    }
}

/// Average color of a frame, visiting roughly `pixel_target` pixels.
///
/// The stride is a whole number of 4-byte pixels, so every visited offset
/// is a pixel boundary. Channel sums divide with integer floor; exact
/// rounding is irrelevant at LED fidelity and floor keeps the result
/// deterministic across platforms.
#[must_use]
pub fn average_frame(data: &[u8], pixel_target: usize) -> Option<Rgb> {
    if data.len() < 4 {
        return None;
    }
    let stride = (data.len() / pixel_target.max(1) / 4 * 4).max(4);

    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    let mut count = 0u64;
    let mut offset = 0;
    while offset + 4 <= data.len() {
        r += u64::from(data[offset]);
        g += u64::from(data[offset + 1]);
        b += u64::from(data[offset + 2]);
        count += 1;
        offset += stride;
    }

    #[allow(clippy::cast_possible_truncation)]
    Some(Rgb::new(
        (r / count) as u8,
        (g / count) as u8,
        (b / count) as u8,
    ))
}

/// Paced frame-to-color reducer.
pub struct Sampler {
    config: SamplerConfig,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Acquire the source and start the sampling loop.
    ///
    /// If acquisition fails the error is returned directly and nothing is
    /// spawned. On success the returned handle owns the loop; dropping it
    /// without calling [`SamplerHandle::stop`] leaves the loop running
    /// detached until its source ends.
    pub async fn start<F: FrameSource>(&self, mut source: F) -> Result<SamplerHandle, CoreError> {
        source.acquire().await.map_err(|err| {
            warn!(error = %err, "frame source acquisition failed");
            err
        })?;

        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(sample_loop(source, self.config, tx, cancel.clone()));

        Ok(SamplerHandle {
            cancel,
            samples: rx,
            task,
        })
    }
}

/// Control and output surface of one running sampling session.
pub struct SamplerHandle {
    cancel: CancellationToken,
    samples: watch::Receiver<Option<Rgb>>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// The single-slot sample mailbox. A reader that falls behind sees
    /// only the newest sample; intermediate ones are overwritten unseen.
    pub fn samples(&self) -> watch::Receiver<Option<Rgb>> {
        self.samples.clone()
    }

    /// Request the loop to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the loop to release its source and exit.
    pub async fn join(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            if !err.is_cancelled() {
                warn!(error = %err, "sampler task panicked");
            }
        }
    }
}

async fn sample_loop<F: FrameSource>(
    mut source: F,
    config: SamplerConfig,
    tx: watch::Sender<Option<Rgb>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.cadence);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match source.poll_frame().await {
            Ok(Some(frame)) => {
                if let Some(color) = average_frame(&frame.data, config.pixel_target) {
                    trace!(%color, "sample published");
                    // Publishing only fails once every receiver is gone;
                    // keep sampling anyway, a receiver may reattach.
                    let _ = tx.send(Some(color));
                }
            }
            Ok(None) => {}
            Err(err) => {
                debug!(error = %err, "frame source ended");
                break;
            }
        }
    }

    source.release().await;
}

/// A [`FrameSource`] fed externally through a watch channel, used when
/// frames are pushed over a network stream rather than pulled from a
/// local capture session.
pub struct WatchFrameSource {
    frames: watch::Receiver<Option<Frame>>,
}

impl WatchFrameSource {
    pub fn new(frames: watch::Receiver<Option<Frame>>) -> Self {
        Self { frames }
    }
}

impl FrameSource for WatchFrameSource {
    async fn acquire(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn poll_frame(&mut self) -> Result<Option<Frame>, CoreError> {
        if self.frames.has_changed().map_err(|_| {
            CoreError::SourceUnavailable {
                reason: "frame producer disconnected".into(),
            }
        })? {
            return Ok(self.frames.borrow_and_update().clone());
        }
        Ok(None)
    }

    async fn release(&mut self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    fn solid_frame(r: u8, g: u8, b: u8, pixels: usize) -> Frame {
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&[r, g, b, 255]);
        }
        Frame::new(data)
    }

    struct StaticSource {
        frame: Option<Frame>,
        acquire_ok: bool,
        released: Arc<AtomicBool>,
        polls: Arc<AtomicUsize>,
    }

    impl FrameSource for StaticSource {
        async fn acquire(&mut self) -> Result<(), CoreError> {
            if self.acquire_ok {
                Ok(())
            } else {
                Err(CoreError::SourceUnavailable {
                    reason: "capture permission denied".into(),
                })
            }
        }

        async fn poll_frame(&mut self) -> Result<Option<Frame>, CoreError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.frame.clone())
        }

        async fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn average_of_a_solid_frame_is_that_color() {
        let frame = solid_frame(120, 45, 200, 5000);
        assert_eq!(
            average_frame(&frame.data, 1000),
            Some(Rgb::new(120, 45, 200))
        );
    }

    #[test]
    fn average_uses_integer_floor_division() {
        // Two pixels, channel values averaging to x.5: floor, never round.
        let data = [10, 0, 0, 255, 15, 0, 0, 255];
        assert_eq!(average_frame(&data, 1000), Some(Rgb::new(12, 0, 0)));
    }

    #[test]
    fn stride_visits_roughly_the_pixel_target() {
        // 5000 pixels, target 1000: stride 20 bytes, 1000 samples. Verify
        // by averaging a gradient only a uniform stride reproduces.
        let mut data = Vec::new();
        for i in 0..5000u32 {
            #[allow(clippy::cast_possible_truncation)]
            let v = (i % 256) as u8;
            data.extend_from_slice(&[v, v, v, 255]);
        }
        let avg = average_frame(&data, 1000).unwrap();
        // Uniform stride over a repeating 0..=255 ramp lands near 127.
        assert!((120..=135).contains(&avg.r), "got {}", avg.r);
    }

    #[test]
    fn tiny_and_empty_frames() {
        assert_eq!(average_frame(&[], 1000), None);
        assert_eq!(average_frame(&[1, 2], 1000), None);
        // A single pixel is sampled as-is.
        assert_eq!(average_frame(&[9, 8, 7, 0], 1000), Some(Rgb::new(9, 8, 7)));
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_failure_spawns_nothing() {
        let released = Arc::new(AtomicBool::new(false));
        let sampler = Sampler::new(SamplerConfig::default());
        let result = sampler
            .start(StaticSource {
                frame: None,
                acquire_ok: false,
                released: Arc::clone(&released),
                polls: Arc::new(AtomicUsize::new(0)),
            })
            .await;

        assert!(matches!(
            result,
            Err(CoreError::SourceUnavailable { .. })
        ));
        assert!(!released.load(Ordering::SeqCst), "release must not run");
    }

    #[tokio::test(start_paused = true)]
    async fn samples_are_paced_and_newest_wins() {
        let released = Arc::new(AtomicBool::new(false));
        let polls = Arc::new(AtomicUsize::new(0));
        let sampler = Sampler::new(SamplerConfig {
            cadence: Duration::from_millis(33),
            pixel_target: 1000,
        });
        let handle = sampler
            .start(StaticSource {
                frame: Some(solid_frame(1, 2, 3, 100)),
                acquire_ok: true,
                released: Arc::clone(&released),
                polls: Arc::clone(&polls),
            })
            .await
            .unwrap();

        let mut rx = handle.samples();
        tokio::time::sleep(Duration::from_millis(330)).await;

        // Ten ticks elapsed but the mailbox holds exactly one value: the
        // newest sample; the reader never sees the intermediate ones.
        let ticks = polls.load(Ordering::SeqCst);
        assert!((9..=11).contains(&ticks), "expected ~10 polls, got {ticks}");
        assert_eq!(*rx.borrow_and_update(), Some(Rgb::new(1, 2, 3)));

        handle.join().await;
        assert!(released.load(Ordering::SeqCst), "source must be released");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let released = Arc::new(AtomicBool::new(false));
        let sampler = Sampler::new(SamplerConfig::default());
        let handle = sampler
            .start(StaticSource {
                frame: None,
                acquire_ok: true,
                released: Arc::clone(&released),
                polls: Arc::new(AtomicUsize::new(0)),
            })
            .await
            .unwrap();

        handle.stop();
        handle.stop();
        handle.join().await;
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_source_yields_only_fresh_frames() {
        let (tx, rx) = watch::channel(None);
        let mut source = WatchFrameSource::new(rx);
        source.acquire().await.unwrap();

        assert_eq!(source.poll_frame().await.unwrap(), None);

        tx.send(Some(solid_frame(5, 5, 5, 2))).unwrap();
        assert!(source.poll_frame().await.unwrap().is_some());
        // Same frame is not yielded twice.
        assert_eq!(source.poll_frame().await.unwrap(), None);

        drop(tx);
        assert!(matches!(
            source.poll_frame().await,
            Err(CoreError::SourceUnavailable { .. })
        ));
    }
}
