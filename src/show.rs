//! The running show: owns every active shell, decides when to launch new
//! ones, and draws the whole scene onto the surface.

use tracing::debug;

use crate::color::ColorPicker;
use crate::config::{ShellSelector, Tuning};
use crate::shell::{Phase, ShellInstance};
use crate::spark::{time_scale, Stage, FRAME_MS};
use crate::surface::{Layer, Surface};

/// Launch-related configuration the scheduler consumes each tick.
#[derive(Debug, Clone, Copy)]
pub struct LaunchPolicy {
    pub selector: ShellSelector,
    pub auto_launch: bool,
    pub finale: bool,
}

pub struct Show {
    shells: Vec<ShellInstance>,
    rng: fastrand::Rng,
    picker: ColorPicker,
    next_launch_ms: f32,
    finale_timer_ms: f32,
    /// Sky light from recent bursts, decayed every tick.
    sky_glow: [f32; 3],
}

impl Show {
    pub fn new() -> Show {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Seeded variant for tests; live shows are intentionally unseeded.
    pub fn with_seed(seed: u64) -> Show {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Show {
        Show {
            shells: Vec::new(),
            rng,
            picker: ColorPicker::new(),
            next_launch_ms: 600.0,
            finale_timer_ms: 0.0,
            sky_glow: [0.0; 3],
        }
    }

    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    pub fn particle_count(&self) -> usize {
        self.shells.iter().map(|s| s.particle_count()).sum()
    }

    /// Current sky light (linear RGB, 0..1) for background tinting.
    pub fn sky_glow(&self) -> [f32; 3] {
        self.sky_glow
    }

    /// Advance the whole show. `running` is false while paused shows are
    /// not ticked at all (the clock freezes); it is false with a `dt` only
    /// when a menu is open, which suspends launching while everything
    /// already airborne keeps animating.
    pub fn tick(
        &mut self,
        dt_ms: f32,
        tuning: &Tuning,
        stage: Stage,
        policy: LaunchPolicy,
        running: bool,
    ) {
        let ts = time_scale(dt_ms, tuning.sim_speed);
        let sim_dt_ms = ts * FRAME_MS;

        if running && policy.auto_launch {
            self.next_launch_ms -= sim_dt_ms;
            if self.next_launch_ms <= 0.0 {
                self.launch(policy.selector, tuning, stage);
                if self.rng.f32() < 0.15 {
                    self.launch(policy.selector, tuning, stage);
                }
                self.next_launch_ms = launch_interval(tuning.size, &mut self.rng);
            }

            if policy.finale {
                self.finale_timer_ms -= sim_dt_ms;
                if self.finale_timer_ms <= 0.0 {
                    let volley = 3 + self.rng.usize(0..3);
                    for i in 0..volley {
                        let frac = (i as f32 + self.rng.f32() * 0.6) / volley as f32;
                        let x = stage.width * (0.15 + 0.7 * frac);
                        let apex_y = stage.height * (0.12 + self.rng.f32() * 0.25);
                        self.launch_toward(policy.selector, x, apex_y, tuning, stage);
                    }
                    debug!(volley, "finale volley");
                    self.finale_timer_ms = 1800.0 + self.rng.f32() * 1500.0;
                }
            }
        }

        let mut flash = [0.0f32; 3];
        for shell in &mut self.shells {
            if let Some(info) = shell.tick(ts, tuning, stage, &mut self.rng, &mut self.picker) {
                if let Some((r, g, b)) = info.color.rgb() {
                    let weight = (info.stars as f32 / 120.0).min(1.5);
                    flash[0] += r as f32 / 255.0 * weight;
                    flash[1] += g as f32 / 255.0 * weight;
                    flash[2] += b as f32 / 255.0 * weight;
                }
            }
        }

        let decay = 0.94f32.powf(ts);
        for (glow, add) in self.sky_glow.iter_mut().zip(flash) {
            *glow = (*glow * decay + add * 0.6).min(1.0);
        }

        self.shells.retain(|s| !s.is_spent());
    }

    /// Auto-launch path; silently skips when the shell cap is reached.
    pub fn launch(&mut self, selector: ShellSelector, tuning: &Tuning, stage: Stage) {
        if self.shells.len() >= tuning.max_shells {
            debug!(cap = tuning.max_shells, "shell cap reached, skipping launch");
            return;
        }
        let shell = ShellInstance::launch(selector, stage, &mut self.rng);
        debug!(variant = shell.variant.name(), "launch");
        self.shells.push(shell);
    }

    /// Launch toward a specific apex (finale spacing, pointer taps).
    pub fn launch_toward(
        &mut self,
        selector: ShellSelector,
        x: f32,
        apex_y: f32,
        tuning: &Tuning,
        stage: Stage,
    ) {
        if self.shells.len() >= tuning.max_shells {
            return;
        }
        let shell = ShellInstance::launch_at(selector, x, apex_y, stage, &mut self.rng);
        self.shells.push(shell);
    }

    /// Draw the current snapshot. Read-only with respect to simulation
    /// state.
    pub fn render(&self, surface: &mut Surface, tuning: &Tuning) {
        for shell in &self.shells {
            if shell.phase == Phase::Launching {
                surface.point(Layer::Main, shell.x, shell.y, (255, 230, 180), 1.2);
                surface.point(Layer::Trails, shell.x, shell.y, (255, 191, 54), 0.8);
            }

            if shell.flash_ms > 0.0 {
                let strength = shell.flash_ms / 120.0;
                surface.circle(Layer::Main, shell.x, shell.y, 18.0, (255, 255, 255), strength);
            }

            for spark in &shell.sparks {
                if let Some(rgb) = spark.draw_color() {
                    let b = spark.brightness();
                    surface.point(Layer::Main, spark.x, spark.y, rgb, b * tuning.spark_width);
                    surface.point(Layer::Trails, spark.x, spark.y, rgb, b * spark.trail_weight);
                }
            }

            for ember in &shell.embers {
                if let Some(rgb) = ember.color.rgb() {
                    let b = ember.brightness();
                    surface.line(
                        Layer::Trails,
                        ember.x - ember.vx * 2.0,
                        ember.y - ember.vy * 2.0,
                        ember.x,
                        ember.y,
                        rgb,
                        b * 0.7,
                    );
                }
            }
        }
    }
}

impl Default for Show {
    fn default() -> Self {
        Self::new()
    }
}

/// Jittered pause between automatic launches; bigger shells fire less
/// often.
fn launch_interval(size: f32, rng: &mut fastrand::Rng) -> f32 {
    (600.0 + size * 450.0) * (0.5 + rng.f32())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Quality, Tuning};

    const STAGE: Stage = Stage {
        width: 1600.0,
        height: 1000.0,
    };

    fn tuning() -> Tuning {
        let mut config = Config::device_defaults(80);
        config.quality = Quality::Normal;
        config.size = 2.0;
        Tuning::derive(&config)
    }

    fn policy() -> LaunchPolicy {
        LaunchPolicy {
            selector: ShellSelector::Random,
            auto_launch: true,
            finale: false,
        }
    }

    #[test]
    fn suspended_show_launches_nothing() {
        let mut show = Show::with_seed(31);
        let tuning = tuning();
        for _ in 0..2000 {
            show.tick(16.0, &tuning, STAGE, policy(), false);
        }
        assert_eq!(show.shell_count(), 0);
    }

    #[test]
    fn auto_launch_fires_on_a_jittered_interval() {
        let mut show = Show::with_seed(32);
        let tuning = tuning();
        for _ in 0..1000 {
            show.tick(16.0, &tuning, STAGE, policy(), true);
        }
        assert!(show.shell_count() > 0);
    }

    #[test]
    fn disabled_auto_launch_stays_quiet() {
        let mut show = Show::with_seed(33);
        let tuning = tuning();
        let quiet = LaunchPolicy {
            auto_launch: false,
            ..policy()
        };
        for _ in 0..2000 {
            show.tick(16.0, &tuning, STAGE, quiet, true);
        }
        assert_eq!(show.shell_count(), 0);
    }

    #[test]
    fn shell_cap_is_never_exceeded() {
        let mut show = Show::with_seed(34);
        let mut tuning = tuning();
        tuning.max_shells = 2;
        let finale = LaunchPolicy {
            finale: true,
            ..policy()
        };
        for _ in 0..4000 {
            show.tick(16.0, &tuning, STAGE, finale, true);
            assert!(show.shell_count() <= 2);
        }
    }

    #[test]
    fn finale_fires_a_volley_immediately() {
        let mut show = Show::with_seed(35);
        let tuning = tuning();
        let finale = LaunchPolicy {
            finale: true,
            ..policy()
        };
        show.tick(16.0, &tuning, STAGE, finale, true);
        assert!(show.shell_count() >= 3, "got {}", show.shell_count());
    }

    #[test]
    fn bursts_light_the_sky_and_decay() {
        let mut show = Show::with_seed(36);
        let tuning = tuning();
        // Run until something bursts.
        let mut peak = 0.0f32;
        for _ in 0..4000 {
            show.tick(16.0, &tuning, STAGE, policy(), true);
            let glow = show.sky_glow();
            peak = peak.max(glow[0] + glow[1] + glow[2]);
        }
        assert!(peak > 0.0, "no burst ever lit the sky");

        // With launching suspended, the glow must drain away.
        for _ in 0..4000 {
            show.tick(16.0, &tuning, STAGE, policy(), false);
        }
        let glow = show.sky_glow();
        assert!(glow[0] + glow[1] + glow[2] < 0.01);
    }
}
