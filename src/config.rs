//! Show configuration and the effective simulation parameters derived from
//! it.
//!
//! Raw configuration is only ever mutated through [`Config::apply`], fed by
//! a queue of [`ConfigUpdate`] messages drained between ticks. Everything
//! the simulation actually consumes lives in [`Tuning`], recomputed once per
//! configuration change so per-frame code never inspects raw config.

use crate::shells::ShellVariant;

/// Graphics quality tier. Controls star density, trail persistence, and the
/// shell cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Low,
    Normal,
    High,
}

impl Quality {
    /// Numeric level used by the persisted schema (1 = low, 3 = high).
    pub fn level(self) -> u8 {
        match self {
            Quality::Low => 1,
            Quality::Normal => 2,
            Quality::High => 3,
        }
    }

    pub fn from_level(level: u8) -> Option<Quality> {
        match level {
            1 => Some(Quality::Low),
            2 => Some(Quality::Normal),
            3 => Some(Quality::High),
            _ => None,
        }
    }
}

/// How strongly bursts light up the sky behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyLighting {
    None,
    Dim,
    Normal,
}

impl SkyLighting {
    pub fn level(self) -> u8 {
        match self {
            SkyLighting::None => 0,
            SkyLighting::Dim => 1,
            SkyLighting::Normal => 2,
        }
    }

    pub fn from_level(level: u8) -> Option<SkyLighting> {
        match level {
            0 => Some(SkyLighting::None),
            1 => Some(SkyLighting::Dim),
            2 => Some(SkyLighting::Normal),
            _ => None,
        }
    }

    /// Background tint strength.
    pub fn strength(self) -> f32 {
        match self {
            SkyLighting::None => 0.0,
            SkyLighting::Dim => 0.4,
            SkyLighting::Normal => 1.0,
        }
    }
}

/// Which shell recipe to launch. `Random` stays unresolved until each
/// individual launch so repeated launches vary independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellSelector {
    Named(ShellVariant),
    Random,
}

impl ShellSelector {
    pub fn name(self) -> &'static str {
        match self {
            ShellSelector::Named(v) => v.name(),
            ShellSelector::Random => "Random",
        }
    }

    pub fn from_name(name: &str) -> Option<ShellSelector> {
        if name.eq_ignore_ascii_case("random") {
            return Some(ShellSelector::Random);
        }
        ShellVariant::from_name(name).map(ShellSelector::Named)
    }

    /// Cycle through Random followed by every named variant.
    pub fn next(self) -> ShellSelector {
        let all = ShellVariant::ALL;
        match self {
            ShellSelector::Random => ShellSelector::Named(all[0]),
            ShellSelector::Named(v) => {
                let i = all.iter().position(|&x| x == v).unwrap_or(0);
                if i + 1 == all.len() {
                    ShellSelector::Random
                } else {
                    ShellSelector::Named(all[i + 1])
                }
            }
        }
    }
}

pub const MIN_SHELL_SIZE: f32 = 0.0;
pub const MAX_SHELL_SIZE: f32 = 4.0;

/// Process-wide show configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub quality: Quality,
    /// Shell size, 0..=4. May be fractional.
    pub size: f32,
    pub shell: ShellSelector,
    pub auto_launch: bool,
    pub finale: bool,
    pub sky_lighting: SkyLighting,
    /// Continuous zoom applied to every burst, >= 0.
    pub scale_factor: f32,
    pub hide_controls: bool,
    pub long_exposure: bool,
}

impl Config {
    /// Defaults informed by device heuristics: a wide terminal gets the
    /// full-size show, and plenty of cores buys the high quality tier.
    pub fn device_defaults(cols: u16) -> Config {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Config {
            quality: if cores >= 8 {
                Quality::High
            } else {
                Quality::Normal
            },
            size: if cols >= 120 { 3.0 } else { 2.0 },
            shell: ShellSelector::Random,
            auto_launch: true,
            finale: false,
            sky_lighting: SkyLighting::Normal,
            scale_factor: 1.0,
            hide_controls: false,
            long_exposure: false,
        }
    }

    /// Apply a partial update; unspecified fields keep their values.
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(q) = update.quality {
            self.quality = q;
        }
        if let Some(size) = update.size {
            self.size = size.clamp(MIN_SHELL_SIZE, MAX_SHELL_SIZE);
        }
        if let Some(shell) = update.shell {
            self.shell = shell;
        }
        if let Some(v) = update.auto_launch {
            self.auto_launch = v;
        }
        if let Some(v) = update.finale {
            self.finale = v;
        }
        if let Some(v) = update.sky_lighting {
            self.sky_lighting = v;
        }
        if let Some(v) = update.scale_factor {
            self.scale_factor = v.max(0.0);
        }
        if let Some(v) = update.hide_controls {
            self.hide_controls = v;
        }
        if let Some(v) = update.long_exposure {
            self.long_exposure = v;
        }
    }
}

/// Partial configuration change, queued by input handling and applied
/// atomically between ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigUpdate {
    pub quality: Option<Quality>,
    pub size: Option<f32>,
    pub shell: Option<ShellSelector>,
    pub auto_launch: Option<bool>,
    pub finale: Option<bool>,
    pub sky_lighting: Option<SkyLighting>,
    pub scale_factor: Option<f32>,
    pub hide_controls: Option<bool>,
    pub long_exposure: Option<bool>,
}

/// Effective simulation parameters. The only path from configuration into
/// the integrator, generators, and surface; recomputed on every config
/// change and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub quality: Quality,
    pub size: f32,
    pub scale_factor: f32,
    pub sky_strength: f32,
    /// Multiplier on every shell's star count.
    pub star_count_mult: f32,
    /// Per-frame multiplier applied to the trails layer; closer to 1 keeps
    /// streaks alive longer.
    pub trail_fade: f32,
    /// Hard cap on simultaneously active shells.
    pub max_shells: usize,
    /// Draw weight of a single star; the high tier renders more, thinner
    /// stars.
    pub spark_width: f32,
    /// Global simulation speed multiplier.
    pub sim_speed: f32,
}

impl Tuning {
    pub fn derive(config: &Config) -> Tuning {
        let (quality_mult, trail_fade, max_shells, spark_width) = match config.quality {
            Quality::Low => (0.75, 0.92, 8, 1.0),
            Quality::Normal => (1.0, 0.95, 12, 1.0),
            Quality::High => (1.25, 0.96, 16, 0.75),
        };
        // Zoomed-in bursts cover more cells and need more stars to stay
        // dense; zoomed-out shows get away with fewer.
        let star_count_mult = quality_mult * config.scale_factor.clamp(0.5, 1.5);
        // Open shutter: barely fade the trails layer at all.
        let trail_fade = if config.long_exposure {
            0.997
        } else {
            trail_fade
        };
        Tuning {
            quality: config.quality,
            size: config.size,
            scale_factor: config.scale_factor,
            sky_strength: config.sky_lighting.strength(),
            star_count_mult,
            trail_fade,
            max_shells,
            spark_width,
            sim_speed: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            quality: Quality::Normal,
            size: 2.0,
            shell: ShellSelector::Random,
            auto_launch: true,
            finale: false,
            sky_lighting: SkyLighting::Normal,
            scale_factor: 1.0,
            hide_controls: false,
            long_exposure: false,
        }
    }

    #[test]
    fn derive_is_idempotent() {
        let config = base_config();
        let a = Tuning::derive(&config);
        let b = Tuning::derive(&config);
        assert_eq!(a, b);
    }

    #[test]
    fn quality_orders_star_count() {
        let mut config = base_config();
        config.quality = Quality::Low;
        let low = Tuning::derive(&config);
        config.quality = Quality::Normal;
        let normal = Tuning::derive(&config);
        config.quality = Quality::High;
        let high = Tuning::derive(&config);
        assert!(low.star_count_mult < normal.star_count_mult);
        assert!(normal.star_count_mult < high.star_count_mult);
        assert!(low.max_shells < high.max_shells);
    }

    #[test]
    fn long_exposure_overrides_trail_fade() {
        let mut config = base_config();
        config.long_exposure = true;
        let tuning = Tuning::derive(&config);
        assert!(tuning.trail_fade > 0.99);
    }

    #[test]
    fn partial_update_keeps_unspecified_fields() {
        let mut config = base_config();
        config.apply(&ConfigUpdate {
            quality: Some(Quality::High),
            ..Default::default()
        });
        assert_eq!(config.quality, Quality::High);
        assert_eq!(config.size, 2.0);
        assert!(config.auto_launch);
    }

    #[test]
    fn size_updates_are_clamped() {
        let mut config = base_config();
        config.apply(&ConfigUpdate {
            size: Some(9.0),
            ..Default::default()
        });
        assert_eq!(config.size, MAX_SHELL_SIZE);
        config.apply(&ConfigUpdate {
            size: Some(-1.0),
            ..Default::default()
        });
        assert_eq!(config.size, MIN_SHELL_SIZE);
    }

    #[test]
    fn selector_cycle_visits_random_again() {
        let mut selector = ShellSelector::Random;
        let mut steps = 0;
        loop {
            selector = selector.next();
            steps += 1;
            if selector == ShellSelector::Random {
                break;
            }
            assert!(steps < 64, "cycle never returned to Random");
        }
        assert_eq!(steps, ShellVariant::ALL.len() + 1);
    }
}
