//! A single firework shell: ballistic ascent, one-shot burst, then a
//! cooldown while its stars burn out.

use std::f32::consts::{PI, TAU};

use crate::color::{Color, ColorPicker};
use crate::config::{ShellSelector, Tuning};
use crate::shells::{self, BurstShape, DeathEffect, ShellDescriptor, ShellVariant};
use crate::spark::{Ember, Spark, Stage, AIR_DRAG, FRAME_MS, GRAVITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Launching,
    Bursting,
    Spent,
}

/// Emitted on the tick a shell bursts, so the show can flash the sky.
#[derive(Debug, Clone, Copy)]
pub struct BurstInfo {
    pub color: Color,
    pub stars: usize,
}

/// Queued secondary spawn from a star that died with an effect attached.
#[derive(Debug, Clone, Copy)]
struct DeathSpawn {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    color: Color,
    effect: DeathEffect,
}

#[derive(Debug)]
pub struct ShellInstance {
    pub variant: ShellVariant,
    pub phase: Phase,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    apex_y: f32,
    trail_timer_ms: f32,
    /// Set once, at burst time.
    pub descriptor: Option<ShellDescriptor>,
    pub sparks: Vec<Spark>,
    pub embers: Vec<Ember>,
    /// Remaining milliseconds of the burst flash, for drawing and sky glow.
    pub flash_ms: f32,
    pending: Vec<DeathSpawn>,
}

impl ShellInstance {
    /// Launch from a random spot along the bottom toward a random apex.
    /// A `Random` selector resolves to a concrete variant here, at launch
    /// time, so consecutive random launches vary independently.
    pub fn launch(
        selector: ShellSelector,
        stage: Stage,
        rng: &mut fastrand::Rng,
    ) -> ShellInstance {
        let x = stage.width * (0.2 + rng.f32() * 0.6);
        let apex_y = stage.height * (0.12 + rng.f32() * 0.28);
        Self::launch_at(selector, x, apex_y, stage, rng)
    }

    /// Launch toward a specific apex (user taps / finale spacing).
    pub fn launch_at(
        selector: ShellSelector,
        x: f32,
        apex_y: f32,
        stage: Stage,
        rng: &mut fastrand::Rng,
    ) -> ShellInstance {
        let variant = match selector {
            ShellSelector::Named(v) => v,
            ShellSelector::Random => ShellVariant::random(rng),
        };
        let y = stage.height;
        let climb = (y - apex_y).max(1.0);
        // Just enough ascent speed to stall at the apex, with a nudge of
        // excess so the apex check on vy has something to cross.
        let vy = -(2.0 * GRAVITY * climb).sqrt() * (1.0 + rng.f32() * 0.05);
        let vx = (rng.f32() * 2.0 - 1.0) * 0.4;
        ShellInstance {
            variant,
            phase: Phase::Launching,
            x,
            y,
            vx,
            vy,
            apex_y,
            trail_timer_ms: 0.0,
            descriptor: None,
            sparks: Vec::new(),
            embers: Vec::new(),
            flash_ms: 0.0,
            pending: Vec::new(),
        }
    }

    pub fn is_spent(&self) -> bool {
        self.phase == Phase::Spent
    }

    pub fn particle_count(&self) -> usize {
        self.sparks.len() + self.embers.len()
    }

    /// Advance one tick. Returns burst info on the tick the shell bursts.
    pub fn tick(
        &mut self,
        ts: f32,
        tuning: &Tuning,
        stage: Stage,
        rng: &mut fastrand::Rng,
        picker: &mut ColorPicker,
    ) -> Option<BurstInfo> {
        let mut burst = None;
        if self.phase == Phase::Launching {
            self.vy += GRAVITY * ts;
            self.x += self.vx * ts;
            self.y += self.vy * ts;
            debug_assert!(self.x.is_finite() && self.y.is_finite());

            // Exhaust trail behind the rising shell.
            self.trail_timer_ms -= ts * FRAME_MS;
            if self.trail_timer_ms <= 0.0 {
                self.embers.push(Ember::new(
                    self.x,
                    self.y,
                    (rng.f32() - 0.5) * 0.4,
                    0.4 + rng.f32() * 0.5,
                    Color::Gold,
                    250.0 + rng.f32() * 250.0,
                ));
                self.trail_timer_ms = 16.0;
            }

            // Apex: vertical velocity crosses zero, or the target altitude
            // is reached, whichever comes first.
            if self.vy >= 0.0 || self.y <= self.apex_y {
                burst = Some(self.burst(tuning, rng, picker));
            }
        }

        self.flash_ms = (self.flash_ms - ts * FRAME_MS).max(0.0);

        for i in 0..self.sparks.len() {
            let expired = self.sparks[i].update(ts, stage, rng, &mut self.embers);
            if expired {
                let s = &self.sparks[i];
                if let Some(effect) = s.on_death {
                    self.pending.push(DeathSpawn {
                        x: s.x,
                        y: s.y,
                        vx: s.vx,
                        vy: s.vy,
                        color: s.color,
                        effect,
                    });
                }
            }
        }
        while let Some(spawn) = self.pending.pop() {
            self.spawn_death_effect(spawn, rng);
        }

        for ember in &mut self.embers {
            ember.update(ts, stage);
        }

        // Batched compaction: one retain pass per tick, not per death.
        self.sparks.retain(|s| s.alive);
        self.embers.retain(|e| e.alive);

        if self.phase == Phase::Bursting && self.sparks.is_empty() && self.embers.is_empty() {
            self.phase = Phase::Spent;
        }
        burst
    }

    fn burst(
        &mut self,
        tuning: &Tuning,
        rng: &mut fastrand::Rng,
        picker: &mut ColorPicker,
    ) -> BurstInfo {
        let desc = shells::generate(self.variant, tuning.size, tuning.quality, rng, picker);

        let radius = (desc.spread * 0.5).max(2.0);
        let count = (shells::base_star_count(desc.spread)
            * desc.star_density
            * tuning.star_count_mult)
            .round()
            .max(6.0) as usize;
        let travel_frames = desc.star_life_ms / FRAME_MS;
        let speed = burst_speed(radius, travel_frames);

        match desc.shape {
            BurstShape::Sphere => {
                for i in 0..count {
                    let angle = rng.f32() * TAU;
                    let s = speed * (0.4 + 0.6 * rng.f32().sqrt());
                    self.spawn_star(&desc, i as f32 / count as f32, angle, s, rng);
                }
            }
            BurstShape::Ring => {
                for i in 0..count {
                    let angle = i as f32 / count as f32 * TAU;
                    let s = speed * (0.95 + rng.f32() * 0.1);
                    self.spawn_star(&desc, i as f32 / count as f32, angle, s, rng);
                }
            }
            BurstShape::Palm => {
                for i in 0..count {
                    let angle = rng.f32() * TAU;
                    let s = speed * (0.85 + rng.f32() * 0.15);
                    self.spawn_star(&desc, i as f32 / count as f32, angle, s, rng);
                }
            }
            BurstShape::Horsetail => {
                for i in 0..count {
                    // Downward half only.
                    let angle = rng.f32() * PI;
                    let s = speed * (0.3 + rng.f32() * 0.4);
                    self.spawn_star(&desc, i as f32 / count as f32, angle, s, rng);
                }
            }
        }

        if let Some(pistil_color) = desc.pistil {
            let inner = (count as f32 * 0.4).round().max(4.0) as usize;
            for _ in 0..inner {
                let angle = rng.f32() * TAU;
                let s = speed * 0.45 * (0.5 + 0.5 * rng.f32().sqrt());
                let mut spark = Spark::new(
                    self.x,
                    self.y,
                    angle.cos() * s,
                    angle.sin() * s,
                    pistil_color,
                    desc.star_life_ms * (0.75 + rng.f32() * 0.15),
                );
                spark.trail_weight = 0.4;
                self.sparks.push(spark);
            }
        }

        if desc.streamers {
            let streamer_count = 6 + (desc.shell_size as usize) * 2;
            for _ in 0..streamer_count {
                let angle = rng.f32() * TAU;
                let s = speed * (1.4 + rng.f32() * 0.4);
                let mut spark = Spark::new(
                    self.x,
                    self.y,
                    angle.cos() * s,
                    angle.sin() * s,
                    desc.scheme.star_color(rng.f32()),
                    desc.star_life_ms * (0.6 + rng.f32() * 0.2),
                );
                // Invisible stars must not betray themselves with glints.
                if desc.scheme.primary() != Color::Invisible {
                    spark.glitter = crate::shells::Glitter::Light;
                    spark.glitter_color = ColorPicker::white_or_gold(rng);
                }
                spark.trail_weight = 1.0;
                if let Some(second) = desc.second_color {
                    spark.transition = Some((second, 0.33 + rng.f32() * 0.2));
                }
                self.sparks.push(spark);
            }
        }

        let stars = self.sparks.len();
        self.flash_ms = 120.0;
        self.vx = 0.0;
        self.vy = 0.0;
        self.phase = Phase::Bursting;
        let info = BurstInfo {
            color: match desc.second_color {
                // Ghost shells flash in their reveal color.
                Some(second) if desc.scheme.primary() == Color::Invisible => second,
                _ => desc.scheme.primary(),
            },
            stars,
        };
        self.descriptor = Some(desc);
        info
    }

    fn spawn_star(
        &mut self,
        desc: &ShellDescriptor,
        frac: f32,
        angle: f32,
        speed: f32,
        rng: &mut fastrand::Rng,
    ) {
        let mut spark = Spark::new(
            self.x,
            self.y,
            angle.cos() * speed + self.vx * 0.3,
            angle.sin() * speed + self.vy * 0.3,
            desc.scheme.star_color(frac),
            desc.star_life_ms * (0.85 + rng.f32() * 0.3),
        );
        spark.glitter = desc.glitter;
        spark.glitter_color = desc.glitter_color;
        spark.glitter_timer_ms = rng.f32() * 100.0;
        spark.strobe = desc.strobe;
        spark.strobe_phase = rng.f32() * TAU;
        spark.on_death = desc.on_death;
        spark.trail_weight = match desc.shape {
            BurstShape::Palm => 1.0,
            BurstShape::Horsetail => 0.9,
            _ => 0.6,
        };
        if let Some(second) = desc.second_color {
            spark.transition = Some((second, 0.33 + rng.f32() * 0.2));
        }
        self.sparks.push(spark);
    }

    fn spawn_death_effect(&mut self, spawn: DeathSpawn, rng: &mut fastrand::Rng) {
        match spawn.effect {
            DeathEffect::Crossette => {
                let count = 6 + rng.usize(0..5);
                for _ in 0..count {
                    let angle = rng.f32() * TAU;
                    let s = 0.8 + rng.f32() * 1.2;
                    let spark = Spark::new(
                        spawn.x,
                        spawn.y,
                        angle.cos() * s + spawn.vx * 0.3,
                        angle.sin() * s + spawn.vy * 0.3,
                        spawn.color,
                        250.0 + rng.f32() * 350.0,
                    );
                    self.sparks.push(spark);
                }
            }
            DeathEffect::Crackle => {
                let count = 12 + rng.usize(0..8);
                for _ in 0..count {
                    let angle = rng.f32() * TAU;
                    let s = 0.6 + rng.f32() * 1.4;
                    self.embers.push(Ember::new(
                        spawn.x,
                        spawn.y,
                        angle.cos() * s,
                        angle.sin() * s,
                        Color::Gold,
                        150.0 + rng.f32() * 200.0,
                    ));
                }
            }
            DeathEffect::FallingLeaves => {
                let count = 2 + rng.usize(0..3);
                for _ in 0..count {
                    self.embers.push(Ember::new(
                        spawn.x,
                        spawn.y,
                        (rng.f32() - 0.5) * 0.6,
                        rng.f32() * 0.3,
                        Color::Gold,
                        800.0 + rng.f32() * 700.0,
                    ));
                }
            }
        }
    }
}

/// Initial star speed that coasts roughly `radius` pixels before drag wins,
/// given how many reference frames the star will live.
fn burst_speed(radius: f32, travel_frames: f32) -> f32 {
    let coast = (1.0 - AIR_DRAG.powf(travel_frames)) / (1.0 - AIR_DRAG);
    radius / coast.max(1.0)
}
