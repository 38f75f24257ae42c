//! Animated solar surface.
//!
//! [`render`] is a pure function of elapsed time and a static region set:
//! same inputs, same frame. [`AnimationLoop`] calls it once per frame
//! period and publishes the result; it keeps no state of its own besides the
//! time origin.
//!
//! Geometry uses a 400 x 400 canvas with the origin in the top-left corner
//! and y growing downwards.

use std::time::Duration;

use log::debug;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::scheduler::Shutdown;

pub const CANVAS_SIZE: f64 = 400.0;
pub const SUN_CENTER: (f64, f64) = (200.0, 200.0);
pub const SUN_RADIUS: f64 = 180.0;

/// Radial gradient of the disc: (offset, rgb) from centre to limb.
pub const SUN_GRADIENT: [(f64, [u8; 3]); 3] = [
    (0.0, [0xFF, 0xD7, 0x00]),
    (0.7, [0xFF, 0x8C, 0x00]),
    (1.0, [0xFF, 0x45, 0x00]),
];

/// Regions above this activity get a halo.
pub const HALO_ACTIVITY: f64 = 0.7;
/// Regions above this activity get the intense core shade.
pub const INTENSE_ACTIVITY: f64 = 0.8;
pub const HALO_SCALE: f64 = 1.5;

/// `sin(0.5 t)` must exceed this for the flare overlay to show.
pub const FLARE_THRESHOLD: f64 = 0.8;
pub const FLARE_FROM: (f64, f64) = (350.0, 150.0);
pub const FLARE_TO: (f64, f64) = (450.0, 100.0);
pub const FLARE_WIDTH: f64 = 3.0;

/// Static descriptor of a simulated activity site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveRegion {
    pub position: (f64, f64),
    pub size: f64,
    /// In `[0, 1]`.
    pub activity_level: f64,
}

impl ActiveRegion {
    pub const fn new(x: f64, y: f64, size: f64, activity_level: f64) -> Self {
        Self {
            position: (x, y),
            size,
            activity_level,
        }
    }
}

/// The four regions shown on the default surface.
pub fn default_regions() -> Vec<ActiveRegion> {
    vec![
        ActiveRegion::new(120.0, 150.0, 15.0, 0.8),
        ActiveRegion::new(250.0, 200.0, 25.0, 0.9),
        ActiveRegion::new(180.0, 280.0, 20.0, 0.7),
        ActiveRegion::new(300.0, 120.0, 18.0, 0.6),
    ]
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreShade {
    /// Dark red.
    Intense,
    /// Indigo.
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Halo {
    pub radius: f64,
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionFrame {
    pub index: usize,
    pub center: (f64, f64),
    pub radius: f64,
    pub shade: CoreShade,
    pub halo: Option<Halo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlareStroke {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub alpha: f64,
    pub width: f64,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceFrame {
    pub t: f64,
    pub center: (f64, f64),
    pub radius: f64,
    pub regions: Vec<RegionFrame>,
    pub flare: Option<FlareStroke>,
}

impl SurfaceFrame {
    pub fn flare_active(&self) -> bool {
        self.flare.is_some()
    }
}

/// Core size multiplier, in `[0.6, 1.0]`.
pub fn pulse(t: f64, index: usize) -> f64 {
    (2.0 * t + index as f64).sin() * 0.2 + 0.8
}

/// Halo brightness multiplier, in `[0.4, 1.0]`.
pub fn halo_pulse(t: f64, index: usize) -> f64 {
    (3.0 * t + index as f64).sin() * 0.3 + 0.7
}

pub fn flare_active(t: f64) -> bool {
    (0.5 * t).sin() > FLARE_THRESHOLD
}

/// Opacity of the flare stroke, in `[0, 1]`.
pub fn flare_alpha(t: f64) -> f64 {
    (5.0 * t).sin() * 0.5 + 0.5
}

/// Compute the frame for elapsed time `t` (seconds).
pub fn render(t: f64, regions: &[ActiveRegion]) -> SurfaceFrame {
    let regions = regions
        .iter()
        .enumerate()
        .map(|(index, region)| RegionFrame {
            index,
            center: region.position,
            radius: region.size * pulse(t, index),
            shade: if region.activity_level > INTENSE_ACTIVITY {
                CoreShade::Intense
            } else {
                CoreShade::Normal
            },
            halo: (region.activity_level > HALO_ACTIVITY).then(|| Halo {
                radius: region.size * HALO_SCALE,
                alpha: 0.3 * halo_pulse(t, index),
            }),
        })
        .collect();

    let flare = flare_active(t).then(|| FlareStroke {
        from: FLARE_FROM,
        to: FLARE_TO,
        alpha: flare_alpha(t),
        width: FLARE_WIDTH,
    });

    SurfaceFrame {
        t,
        center: SUN_CENTER,
        radius: SUN_RADIUS,
        regions,
        flare,
    }
}

// ---------------------------------------------------------------------------
// AnimationLoop
// ---------------------------------------------------------------------------

/// Frame driver. Publishes a new [`SurfaceFrame`] every frame period until
/// stopped. Dropping the handle stops it too.
pub struct AnimationLoop {
    shutdown: Shutdown,
    frames: watch::Receiver<SurfaceFrame>,
    task: Option<JoinHandle<()>>,
}

impl AnimationLoop {
    pub fn spawn(regions: Vec<ActiveRegion>, frame_interval: Duration) -> Self {
        let period = frame_interval.max(Duration::from_millis(1));
        let origin = Instant::now();
        let (tx, frames) = watch::channel(render(0.0, &regions));
        let shutdown = Shutdown::new();
        let token = shutdown.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let t = origin.elapsed().as_secs_f64();
                tx.send_replace(render(t, &regions));
            }
            debug!("animation: stopped");
        });

        Self {
            shutdown,
            frames,
            task: Some(task),
        }
    }

    /// The most recently published frame.
    pub fn frame(&self) -> SurfaceFrame {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SurfaceFrame> {
        self.frames.clone()
    }

    /// Stop producing frames. Idempotent.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
