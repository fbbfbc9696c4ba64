//! Procedural shell recipes.
//!
//! Each variant is a pure function of (size, quality, rng, color picker)
//! producing an immutable [`ShellDescriptor`]. Composed variants call the
//! chrysanthemum base recipe first and override fields, rather than
//! duplicating the combinatorics of glitter, pistils, and streamers.

use crate::color::{Color, ColorPicker, PickOptions};
use crate::config::Quality;

/// Star color scheme. Dual-color shells split the burst between two colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    Single(Color),
    Dual(Color, Color),
}

impl ColorScheme {
    pub fn primary(self) -> Color {
        match self {
            ColorScheme::Single(c) => c,
            ColorScheme::Dual(a, _) => a,
        }
    }

    /// Color for one star of the burst. Dual schemes split by hemisphere;
    /// `frac` is the star's angular position in 0..1.
    pub fn star_color(self, frac: f32) -> Color {
        match self {
            ColorScheme::Single(c) => c,
            ColorScheme::Dual(a, b) => {
                if frac < 0.5 {
                    a
                } else {
                    b
                }
            }
        }
    }
}

/// How much sparkle the stars shed while burning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glitter {
    None,
    Light,
    Heavy,
}

impl Glitter {
    /// Mean milliseconds between ember emissions, or `None` for no glitter.
    pub fn emit_interval_ms(self) -> Option<f32> {
        match self {
            Glitter::None => None,
            Glitter::Light => Some(140.0),
            Glitter::Heavy => Some(40.0),
        }
    }
}

/// Burst geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstShape {
    /// Uniform spherical spray.
    Sphere,
    /// Evenly spaced stars on a circle.
    Ring,
    /// A handful of thick rising fronds.
    Palm,
    /// Short downward-arcing burst.
    Horsetail,
}

/// What a star does at the end of its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathEffect {
    /// Split into a small secondary burst of the same color.
    Crossette,
    /// Pop into a cluster of golden embers.
    Crackle,
    /// Shed a few slow gold embers that drift down.
    FallingLeaves,
}

/// Fully-specified burst parameters for one shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellDescriptor {
    pub shell_size: f32,
    /// Burst diameter in stage units.
    pub spread: f32,
    pub star_life_ms: f32,
    pub star_density: f32,
    pub scheme: ColorScheme,
    /// Color stars transition to partway through their life.
    pub second_color: Option<Color>,
    pub glitter: Glitter,
    pub glitter_color: Color,
    /// Inner contrasting burst, when present.
    pub pistil: Option<Color>,
    pub streamers: bool,
    pub shape: BurstShape,
    pub on_death: Option<DeathEffect>,
    pub strobe: bool,
}

/// Star count a full-density shell of this spread would burst into, before
/// density and quality multipliers.
pub fn base_star_count(spread: f32) -> f32 {
    24.0 + spread * 0.12
}

/// The shell recipes on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellVariant {
    Crysanthemum,
    Ghost,
    Strobe,
    Palm,
    Ring,
    Willow,
    Crossette,
    Horsetail,
    Crackle,
}

impl ShellVariant {
    pub const ALL: [ShellVariant; 9] = [
        ShellVariant::Crysanthemum,
        ShellVariant::Ghost,
        ShellVariant::Strobe,
        ShellVariant::Palm,
        ShellVariant::Ring,
        ShellVariant::Willow,
        ShellVariant::Crossette,
        ShellVariant::Horsetail,
        ShellVariant::Crackle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShellVariant::Crysanthemum => "Crysanthemum",
            ShellVariant::Ghost => "Ghost",
            ShellVariant::Strobe => "Strobe",
            ShellVariant::Palm => "Palm",
            ShellVariant::Ring => "Ring",
            ShellVariant::Willow => "Willow",
            ShellVariant::Crossette => "Crossette",
            ShellVariant::Horsetail => "Horse Tail",
            ShellVariant::Crackle => "Crackle",
        }
    }

    pub fn from_name(name: &str) -> Option<ShellVariant> {
        let folded = name.trim().to_ascii_lowercase().replace(' ', "");
        ShellVariant::ALL
            .into_iter()
            .find(|v| v.name().to_ascii_lowercase().replace(' ', "") == folded)
    }

    /// Uniform draw over all variants; used when the selector is "Random",
    /// resolved at launch time.
    pub fn random(rng: &mut fastrand::Rng) -> ShellVariant {
        ShellVariant::ALL[rng.usize(0..ShellVariant::ALL.len())]
    }
}

/// Produce a burst descriptor for `variant`.
pub fn generate(
    variant: ShellVariant,
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    match variant {
        ShellVariant::Crysanthemum => crysanthemum(size, quality, rng, picker),
        ShellVariant::Ghost => ghost(size, quality, rng, picker),
        ShellVariant::Strobe => strobe(size, quality, rng, picker),
        ShellVariant::Palm => palm(size, quality, rng, picker),
        ShellVariant::Ring => ring(size, quality, rng, picker),
        ShellVariant::Willow => willow(size, quality, rng, picker),
        ShellVariant::Crossette => crossette(size, quality, rng, picker),
        ShellVariant::Horsetail => horsetail(size, quality, rng, picker),
        ShellVariant::Crackle => crackle(size, quality, rng, picker),
    }
}

/// Base recipe every other variant builds on.
pub fn crysanthemum(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let glitter = rng.f32() < 0.25;
    let single_color = rng.f32() < 0.72;
    let scheme = if single_color {
        ColorScheme::Single(picker.pick(rng, PickOptions::limit_white()))
    } else {
        let first = picker.random(rng);
        ColorScheme::Dual(first, picker.pick(rng, PickOptions::not_same()))
    };
    let primary_is_white = scheme == ColorScheme::Single(Color::White);

    let pistil = single_color && rng.f32() < 0.42;
    let pistil_color = if pistil {
        Some(picker.pistil_color_for(rng, scheme.primary()))
    } else {
        None
    };

    // A single-color shell sometimes fades to a second color late in the
    // burn; white shells always do, they look flat otherwise.
    let second_color = if single_color && (rng.f32() < 0.2 || primary_is_white) {
        Some(pistil_color.unwrap_or_else(|| {
            picker.pick(
                rng,
                PickOptions {
                    not_color: Some(scheme.primary()),
                    limit_white: true,
                    not_same: false,
                },
            )
        }))
    } else {
        None
    };

    let streamers = pistil_color.is_none() && !primary_is_white && rng.f32() < 0.42;

    // Glitter already adds visual density, so glittering shells carry fewer
    // stars. The high tier pins density outright.
    let mut star_density = if glitter { 1.1 } else { 1.25 };
    if quality == Quality::Low {
        star_density *= 0.8;
    }
    if quality == Quality::High {
        star_density = 1.2;
    }

    ShellDescriptor {
        shell_size: size,
        spread: 300.0 + size * 100.0,
        star_life_ms: 900.0 + size * 200.0,
        star_density,
        scheme,
        second_color,
        glitter: if glitter { Glitter::Light } else { Glitter::None },
        glitter_color: ColorPicker::white_or_gold(rng),
        pistil: pistil_color,
        streamers,
        shape: BurstShape::Sphere,
        on_death: None,
        strobe: false,
    }
}

/// Invisible stars that reveal a color partway through their flight.
pub fn ghost(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    // The reveal can come fast; longer star life keeps it readable.
    shell.star_life_ms *= 1.5;
    // The revealed color must actually read against the sky.
    let ghost_color = picker.pick(rng, PickOptions::not_color(Color::White));
    shell.streamers = true;
    let pistil = rng.f32() < 0.42;
    shell.pistil = if pistil {
        Some(picker.pistil_color_for(rng, ghost_color))
    } else {
        None
    };
    shell.scheme = ColorScheme::Single(Color::Invisible);
    shell.second_color = Some(ghost_color);
    // Invisible stars must not spew glitter.
    shell.glitter = Glitter::None;
    shell
}

/// Blinking stars.
pub fn strobe(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.strobe = true;
    shell.star_life_ms *= 1.25;
    shell.glitter = Glitter::None;
    // Blinking reads poorly with mixed colors.
    if let ColorScheme::Dual(first, _) = shell.scheme {
        shell.scheme = ColorScheme::Single(first);
    }
    shell
}

/// A few thick fronds dripping gold.
pub fn palm(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.shape = BurstShape::Palm;
    shell.star_density *= 0.35;
    shell.star_life_ms *= 1.2;
    shell.glitter = Glitter::Heavy;
    shell.glitter_color = Color::Gold;
    shell.streamers = false;
    shell.pistil = None;
    shell
}

/// Evenly spaced stars on a circle.
pub fn ring(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.shape = BurstShape::Ring;
    shell.streamers = false;
    if let ColorScheme::Dual(first, _) = shell.scheme {
        shell.scheme = ColorScheme::Single(first);
    }
    shell
}

/// Long-lived drooping gold stars shedding slow embers.
pub fn willow(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.scheme = ColorScheme::Single(Color::Gold);
    shell.second_color = None;
    shell.glitter = Glitter::Light;
    shell.glitter_color = Color::Gold;
    shell.star_life_ms *= 1.6;
    shell.star_density *= 0.6;
    shell.on_death = Some(DeathEffect::FallingLeaves);
    shell.pistil = None;
    shell.streamers = false;
    shell
}

/// Stars that split into secondary mini-bursts.
pub fn crossette(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.on_death = Some(DeathEffect::Crossette);
    shell.star_density *= 0.7;
    shell.star_life_ms *= 0.8;
    shell.glitter = Glitter::None;
    shell
}

/// Short downward burst, like a tail flicking over the apex.
pub fn horsetail(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.shape = BurstShape::Horsetail;
    shell.spread *= 0.6;
    shell.star_density *= 0.5;
    shell.star_life_ms *= 0.8;
    shell.streamers = false;
    shell.pistil = None;
    shell
}

/// Stars that pop into golden crackle at the end.
pub fn crackle(
    size: f32,
    quality: Quality,
    rng: &mut fastrand::Rng,
    picker: &mut ColorPicker,
) -> ShellDescriptor {
    let mut shell = crysanthemum(size, quality, rng, picker);
    shell.on_death = Some(DeathEffect::Crackle);
    shell.star_density *= 0.75;
    shell.glitter = Glitter::None;
    if rng.f32() < 0.75 {
        shell.scheme = ColorScheme::Single(Color::Gold);
        shell.second_color = None;
        // The base pistil was rolled against the old primary; keep it
        // contrasting against gold.
        shell.pistil = shell
            .pistil
            .map(|_| picker.pistil_color_for(rng, Color::Gold));
    }
    shell
}
