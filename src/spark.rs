//! Star and ember particles, and the per-tick physics that moves them.
//!
//! Velocities are in stage pixels per 60 fps reference frame; each tick is
//! converted to a time scale (fraction of a reference frame) so the
//! integration is frame-rate independent. Lifetimes are in simulated
//! milliseconds.

use crate::color::Color;
use crate::shells::{DeathEffect, Glitter};

/// Downward acceleration, px/frame².
pub const GRAVITY: f32 = 0.9;
/// Per-frame velocity retention for stars.
pub const AIR_DRAG: f32 = 0.98;
/// Embers are lighter and stall faster.
pub const EMBER_DRAG: f32 = 0.92;
/// Milliseconds per reference frame.
pub const FRAME_MS: f32 = 1000.0 / 60.0;

/// Fraction of a reference frame this tick advances.
pub fn time_scale(dt_ms: f32, sim_speed: f32) -> f32 {
    sim_speed * dt_ms / FRAME_MS
}

/// Stage bounds in pixels. Sparks that fall below the bottom, or drift far
/// off the sides with no speed left, are retired early.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub width: f32,
    pub height: f32,
}

/// A burst star. Created in a batch when a shell bursts, mutated once per
/// tick, and swept out of the active set in a single batched pass after it
/// dies. Death is terminal.
#[derive(Debug, Clone)]
pub struct Spark {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: Color,
    pub life_ms: f32,
    pub age_ms: f32,
    /// Pending color switch: (target, life fraction at which it happens).
    pub transition: Option<(Color, f32)>,
    pub glitter: Glitter,
    pub glitter_color: Color,
    pub glitter_timer_ms: f32,
    pub strobe: bool,
    pub strobe_phase: f32,
    pub on_death: Option<DeathEffect>,
    /// How strongly this star writes into the trails layer.
    pub trail_weight: f32,
    pub alive: bool,
}

impl Spark {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, color: Color, life_ms: f32) -> Spark {
        Spark {
            x,
            y,
            vx,
            vy,
            color,
            life_ms,
            age_ms: 0.0,
            transition: None,
            glitter: Glitter::None,
            glitter_color: Color::Gold,
            glitter_timer_ms: 0.0,
            strobe: false,
            strobe_phase: 0.0,
            on_death: None,
            trail_weight: 0.6,
            alive: true,
        }
    }

    /// Advance one tick. Returns `true` only on the tick the star burns out
    /// (the owner fires any on-death effect then); early retirement for
    /// leaving the stage returns `false`.
    pub fn update(
        &mut self,
        ts: f32,
        stage: Stage,
        rng: &mut fastrand::Rng,
        embers: &mut Vec<Ember>,
    ) -> bool {
        if !self.alive {
            return false;
        }
        let sim_dt_ms = ts * FRAME_MS;

        let drag = 1.0 - (1.0 - AIR_DRAG) * ts;
        self.vx *= drag;
        self.vy *= drag;
        self.vy += GRAVITY * ts;
        self.x += self.vx * ts;
        self.y += self.vy * ts;
        self.age_ms += sim_dt_ms;

        debug_assert!(
            self.x.is_finite() && self.y.is_finite() && self.age_ms.is_finite(),
            "spark state went non-finite"
        );

        if let Some((target, frac)) = self.transition {
            if self.age_ms >= self.life_ms * frac {
                self.color = target;
                self.transition = None;
            }
        }

        if self.strobe {
            self.strobe_phase += sim_dt_ms * 0.015;
        }

        if let Some(interval) = self.glitter.emit_interval_ms() {
            self.glitter_timer_ms -= sim_dt_ms;
            if self.glitter_timer_ms <= 0.0 {
                embers.push(Ember::glint(self, rng));
                self.glitter_timer_ms = interval * (0.5 + rng.f32());
            }
        }

        if self.age_ms >= self.life_ms {
            self.alive = false;
            return true;
        }

        let below = self.y > stage.height + 20.0;
        let off_side = self.x < -30.0 || self.x > stage.width + 30.0;
        let stalled = self.vx * self.vx + self.vy * self.vy < 0.25;
        if below || (off_side && stalled) {
            self.alive = false;
        }
        false
    }

    /// Remaining-life brightness proxy; stars hold full brightness and fade
    /// over the last quarter of their burn.
    pub fn brightness(&self) -> f32 {
        let remaining = (1.0 - self.age_ms / self.life_ms).clamp(0.0, 1.0);
        if remaining > 0.25 {
            1.0
        } else {
            remaining * 4.0
        }
    }

    /// RGB to draw this tick, or `None` while invisible (ghost stars before
    /// their reveal, strobe stars in the off phase).
    pub fn draw_color(&self) -> Option<(u8, u8, u8)> {
        if self.strobe && self.strobe_phase.sin() <= 0.0 {
            return None;
        }
        self.color.rgb()
    }
}

/// Tiny short-lived particle: glitter glints, streamer trails, launch
/// exhaust, crackle.
#[derive(Debug, Clone)]
pub struct Ember {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: Color,
    pub life_ms: f32,
    pub age_ms: f32,
    pub alive: bool,
}

impl Ember {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, color: Color, life_ms: f32) -> Ember {
        Ember {
            x,
            y,
            vx,
            vy,
            color,
            life_ms,
            age_ms: 0.0,
            alive: true,
        }
    }

    /// A glitter glint shed by a burning star.
    fn glint(spark: &Spark, rng: &mut fastrand::Rng) -> Ember {
        let angle = rng.f32() * std::f32::consts::TAU;
        let speed = 0.2 + rng.f32() * 0.5;
        Ember::new(
            spark.x,
            spark.y,
            spark.vx * 0.3 + angle.cos() * speed,
            spark.vy * 0.3 + angle.sin() * speed,
            spark.glitter_color,
            250.0 + rng.f32() * 450.0,
        )
    }

    pub fn update(&mut self, ts: f32, stage: Stage) {
        if !self.alive {
            return;
        }
        let drag = 1.0 - (1.0 - EMBER_DRAG) * ts;
        self.vx *= drag;
        self.vy *= drag;
        self.vy += GRAVITY * 0.6 * ts;
        self.x += self.vx * ts;
        self.y += self.vy * ts;
        self.age_ms += ts * FRAME_MS;

        debug_assert!(self.x.is_finite() && self.y.is_finite());

        if self.age_ms >= self.life_ms || self.y > stage.height + 20.0 {
            self.alive = false;
        }
    }

    pub fn brightness(&self) -> f32 {
        (1.0 - self.age_ms / self.life_ms).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: Stage = Stage {
        width: 200.0,
        height: 100.0,
    };

    // Tall stage for tests that integrate long enough for gravity to carry
    // a spark past a terminal-sized bottom edge.
    const TALL: Stage = Stage {
        width: 200.0,
        height: 1.0e6,
    };

    #[test]
    fn one_tick_matches_euler_integration() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut embers = Vec::new();
        let mut spark = Spark::new(50.0, 50.0, 0.0, -100.0, Color::Red, 1000.0);

        let ts = time_scale(16.0, 1.0);
        spark.update(ts, STAGE, &mut rng, &mut embers);

        let drag = 1.0 - (1.0 - AIR_DRAG) * ts;
        let expected_vy = -100.0 * drag + GRAVITY * ts;
        let expected_y = 50.0 + expected_vy * ts;
        assert!((spark.vy - expected_vy).abs() < 1e-4, "vy {}", spark.vy);
        assert!((spark.y - expected_y).abs() < 1e-4, "y {}", spark.y);
        assert_eq!(spark.vx, 0.0);
        assert_eq!(spark.x, 50.0);
        // Gravity added exactly GRAVITY * time_scale on top of the dragged
        // velocity.
        assert!(((spark.vy - -100.0 * drag) - GRAVITY * ts).abs() < 1e-5);
    }

    #[test]
    fn dies_exactly_once_and_stays_dead() {
        let mut rng = fastrand::Rng::with_seed(2);
        let mut embers = Vec::new();
        let mut spark = Spark::new(50.0, 20.0, 0.0, 0.0, Color::Green, 100.0);
        let ts = time_scale(16.0, 1.0);

        let mut expirations = 0;
        for _ in 0..20 {
            if spark.update(ts, STAGE, &mut rng, &mut embers) {
                expirations += 1;
            }
        }
        assert_eq!(expirations, 1);
        assert!(!spark.alive);
        assert!(spark.age_ms >= spark.life_ms);
    }

    #[test]
    fn falling_below_the_stage_retires_without_expiring() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut embers = Vec::new();
        let mut spark = Spark::new(50.0, STAGE.height + 25.0, 0.0, 5.0, Color::Blue, 10_000.0);
        let expired = spark.update(time_scale(16.0, 1.0), STAGE, &mut rng, &mut embers);
        assert!(!expired);
        assert!(!spark.alive);
    }

    #[test]
    fn transition_switches_color_at_life_fraction() {
        let mut rng = fastrand::Rng::with_seed(4);
        let mut embers = Vec::new();
        let mut spark = Spark::new(50.0, 20.0, 0.0, 0.0, Color::Invisible, 1000.0);
        spark.transition = Some((Color::Purple, 0.5));

        let ts = time_scale(16.0, 1.0);
        // Invisible until the reveal threshold.
        while spark.age_ms < 480.0 {
            spark.update(ts, TALL, &mut rng, &mut embers);
            if spark.age_ms < 500.0 {
                assert_eq!(spark.draw_color(), None);
            }
        }
        while spark.age_ms < 520.0 {
            spark.update(ts, TALL, &mut rng, &mut embers);
        }
        assert_eq!(spark.color, Color::Purple);
        assert!(spark.draw_color().is_some());
    }

    #[test]
    fn glitter_emits_embers() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut embers = Vec::new();
        let mut spark = Spark::new(50.0, 20.0, 0.0, 0.0, Color::Gold, 2000.0);
        spark.glitter = Glitter::Heavy;

        let ts = time_scale(16.0, 1.0);
        for _ in 0..60 {
            spark.update(ts, STAGE, &mut rng, &mut embers);
        }
        assert!(!embers.is_empty());
        assert!(embers.iter().all(|e| e.color == Color::Gold));
    }

    #[test]
    fn state_stays_finite_under_long_integration() {
        let mut rng = fastrand::Rng::with_seed(6);
        let mut embers = Vec::new();
        let ts = time_scale(16.0, 1.0);
        for seed in 0..16 {
            let mut r = fastrand::Rng::with_seed(seed);
            let mut spark = Spark::new(
                r.f32() * STAGE.width,
                r.f32() * STAGE.height,
                r.f32() * 8.0 - 4.0,
                r.f32() * 8.0 - 8.0,
                Color::White,
                5000.0,
            );
            for _ in 0..1000 {
                spark.update(ts, STAGE, &mut rng, &mut embers);
            }
            assert!(spark.x.is_finite() && spark.y.is_finite());
            assert!(spark.vx.is_finite() && spark.vy.is_finite());
        }
    }

    #[test]
    fn brightness_fades_only_near_end_of_life() {
        let mut spark = Spark::new(0.0, 0.0, 0.0, 0.0, Color::Red, 1000.0);
        spark.age_ms = 100.0;
        assert_eq!(spark.brightness(), 1.0);
        spark.age_ms = 900.0;
        assert!(spark.brightness() < 0.5);
        spark.age_ms = 1000.0;
        assert_eq!(spark.brightness(), 0.0);
    }
}
