//! Cosmetic feedback: the ripple after a connect, the wobble after a
//! disconnect and the shrink of a deleted block.
//!
//! Each effect kind has a single slot. Playing an effect replaces whatever
//! occupied its slot, and cancelling empties it. Frames are a pure
//! function of elapsed time, so the host decides when to poll; the drag
//! state machine never waits on an effect.

use kurbo::{Point, Rect};
use snap_core::BlockId;
use std::f64::consts::PI;
use std::time::Duration;

pub const RIPPLE_DURATION: Duration = Duration::from_millis(150);
/// Final ripple radius at scale 1.
pub const RIPPLE_RADIUS: f64 = 25.0;
pub const WOBBLE_DURATION: Duration = Duration::from_millis(200);
pub const WOBBLE_COUNT: f64 = 3.0;
/// Peak skew in degrees.
pub const WOBBLE_MAGNITUDE: f64 = 10.0;
pub const SHRINK_DURATION: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Ripple,
    Wobble,
    Shrink,
}

impl EffectKind {
    const ALL: [EffectKind; 3] = [EffectKind::Ripple, EffectKind::Wobble, EffectKind::Shrink];

    fn slot(self) -> usize {
        match self {
            EffectKind::Ripple => 0,
            EffectKind::Wobble => 1,
            EffectKind::Shrink => 2,
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            EffectKind::Ripple => RIPPLE_DURATION,
            EffectKind::Wobble => WOBBLE_DURATION,
            EffectKind::Shrink => SHRINK_DURATION,
        }
    }
}

/// What an effect is anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectTarget {
    /// A point in workspace units (the ripple centre).
    Point(Point),
    Block(BlockId),
    /// A rect captured before the block went away.
    Rect(Rect),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    pub target: EffectTarget,
    pub scale: f64,
    started: Duration,
}

/// One rendered step of an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectFrame {
    Ripple {
        center: Point,
        radius: f64,
        opacity: f64,
    },
    Wobble {
        block: BlockId,
        skew: f64,
    },
    Shrink {
        rect: Rect,
        scale: f64,
        opacity: f64,
    },
}

/// Fraction of `duration` covered by `elapsed`, clamped to `0..=1`.
pub fn progress(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

/// Ripple radius grows linearly while it fades out.
pub fn ripple_at(t: f64, scale: f64) -> (f64, f64) {
    (t * RIPPLE_RADIUS * scale, 1.0 - t)
}

/// Damped sine: three wiggles that settle at zero.
pub fn wobble_at(t: f64) -> f64 {
    if t >= 1.0 {
        return 0.0;
    }
    ((t * PI * WOBBLE_COUNT).sin() * (1.0 - t) * WOBBLE_MAGNITUDE).round()
}

pub fn shrink_at(t: f64) -> (f64, f64) {
    let s = 1.0 - t;
    (s, s)
}

#[derive(Debug, Clone)]
pub struct EffectScheduler {
    slots: [Option<Effect>; 3],
    now: Duration,
    tick: Duration,
}

impl Default for EffectScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl EffectScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            slots: [None; 3],
            now: Duration::ZERO,
            tick,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Start `kind` on `target`, replacing the one already playing.
    pub fn play(&mut self, kind: EffectKind, target: EffectTarget, scale: f64) {
        if self.slots[kind.slot()].is_some() {
            log::debug!("{kind:?} restarted before it finished");
        }
        self.slots[kind.slot()] = Some(Effect {
            kind,
            target,
            scale,
            started: self.now,
        });
    }

    pub fn cancel(&mut self, kind: EffectKind) -> bool {
        self.slots[kind.slot()].take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; 3];
    }

    pub fn is_playing(&self, kind: EffectKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    pub fn active(&self) -> impl Iterator<Item = &Effect> {
        self.slots.iter().flatten()
    }

    /// Advance one tick and return the frames to draw.
    pub fn poll(&mut self) -> Vec<EffectFrame> {
        self.advance(self.tick)
    }

    /// Advance the clock by `dt`. Finished effects draw their last frame
    /// and then leave their slot.
    pub fn advance(&mut self, dt: Duration) -> Vec<EffectFrame> {
        self.now += dt;
        let mut frames = Vec::new();
        for kind in EffectKind::ALL {
            let Some(effect) = self.slots[kind.slot()] else {
                continue;
            };
            let t = progress(self.now - effect.started, kind.duration());
            if let Some(frame) = frame_for(&effect, t) {
                frames.push(frame);
            }
            if t >= 1.0 {
                self.slots[kind.slot()] = None;
            }
        }
        frames
    }
}

fn frame_for(effect: &Effect, t: f64) -> Option<EffectFrame> {
    match (effect.kind, effect.target) {
        (EffectKind::Ripple, EffectTarget::Point(center)) => {
            let (radius, opacity) = ripple_at(t, effect.scale);
            Some(EffectFrame::Ripple {
                center,
                radius,
                opacity,
            })
        }
        (EffectKind::Wobble, EffectTarget::Block(block)) => Some(EffectFrame::Wobble {
            block,
            skew: wobble_at(t),
        }),
        (EffectKind::Shrink, EffectTarget::Rect(rect)) => {
            let (scale, opacity) = shrink_at(t);
            Some(EffectFrame::Shrink { rect, scale, opacity })
        }
        (kind, target) => {
            log::warn!("{kind:?} cannot be anchored to {target:?}");
            None
        }
    }
}
