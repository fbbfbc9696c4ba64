//! Firework color palette and random color selection.

/// The drawable palette plus `Invisible`, a color that participates in
/// physics but is never rendered (ghost shells burst invisible stars that
/// reveal themselves mid-flight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Green,
    Blue,
    Purple,
    Gold,
    White,
    Invisible,
}

impl Color {
    /// Every color a star may be drawn in. `Invisible` is deliberately
    /// excluded.
    pub const PALETTE: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Gold,
        Color::White,
    ];

    /// RGB triple for drawing, or `None` for `Invisible`.
    pub fn rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Red => Some((0xff, 0x00, 0x43)),
            Color::Green => Some((0x14, 0xfc, 0x56)),
            Color::Blue => Some((0x1e, 0x7f, 0xff)),
            Color::Purple => Some((0xe6, 0x0a, 0xff)),
            Color::Gold => Some((0xff, 0xbf, 0x36)),
            Color::White => Some((0xff, 0xff, 0xff)),
            Color::Invisible => None,
        }
    }
}

/// Options for [`ColorPicker::pick`]. `not_same` wins over `not_color` when
/// both are set, matching the pairing rules shells rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickOptions {
    pub not_same: bool,
    pub not_color: Option<Color>,
    pub limit_white: bool,
}

impl PickOptions {
    pub fn limit_white() -> Self {
        PickOptions {
            limit_white: true,
            ..Default::default()
        }
    }

    pub fn not_same() -> Self {
        PickOptions {
            not_same: true,
            ..Default::default()
        }
    }

    pub fn not_color(color: Color) -> Self {
        PickOptions {
            not_color: Some(color),
            ..Default::default()
        }
    }
}

/// Random color source with a memory of the last color handed out, so
/// callers can ask for "anything but the previous one". The memory is
/// explicit state here rather than a module-level global so tests can reset
/// it by constructing a fresh picker.
#[derive(Debug, Default)]
pub struct ColorPicker {
    last: Option<Color>,
}

impl ColorPicker {
    pub fn new() -> Self {
        ColorPicker { last: None }
    }

    fn uniform(rng: &mut fastrand::Rng) -> Color {
        Color::PALETTE[rng.usize(0..Color::PALETTE.len())]
    }

    /// Uniform draw from the palette, honoring `opts`. White is visually
    /// dominant, so `limit_white` re-draws it once with probability 0.6.
    pub fn pick(&mut self, rng: &mut fastrand::Rng, opts: PickOptions) -> Color {
        let mut color = Self::uniform(rng);

        if opts.limit_white && color == Color::White && rng.f32() < 0.6 {
            color = Self::uniform(rng);
        }

        if opts.not_same {
            while Some(color) == self.last {
                color = Self::uniform(rng);
            }
        } else if let Some(excluded) = opts.not_color {
            while color == excluded {
                color = Self::uniform(rng);
            }
        }

        self.last = Some(color);
        color
    }

    pub fn random(&mut self, rng: &mut fastrand::Rng) -> Color {
        self.pick(rng, PickOptions::default())
    }

    /// Neutral accent used for pistils and glitter.
    pub fn white_or_gold(rng: &mut fastrand::Rng) -> Color {
        if rng.f32() < 0.5 {
            Color::Gold
        } else {
            Color::White
        }
    }

    /// Pistils must contrast against the shell's dominant color: white and
    /// gold shells get any other color, everything else gets white or gold.
    pub fn pistil_color_for(&mut self, rng: &mut fastrand::Rng, shell_color: Color) -> Color {
        if shell_color == Color::White || shell_color == Color::Gold {
            self.pick(rng, PickOptions::not_color(shell_color))
        } else {
            Self::white_or_gold(rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_excludes_invisible() {
        assert!(!Color::PALETTE.contains(&Color::Invisible));
        for color in Color::PALETTE {
            assert!(color.rgb().is_some());
        }
        assert!(Color::Invisible.rgb().is_none());
    }

    #[test]
    fn not_same_never_repeats() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut picker = ColorPicker::new();
        let mut prev = picker.random(&mut rng);
        for _ in 0..500 {
            let next = picker.pick(&mut rng, PickOptions::not_same());
            assert_ne!(next, prev);
            prev = next;
        }
    }

    #[test]
    fn not_color_excludes_requested() {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut picker = ColorPicker::new();
        for _ in 0..500 {
            let color = picker.pick(&mut rng, PickOptions::not_color(Color::Blue));
            assert_ne!(color, Color::Blue);
        }
    }

    #[test]
    fn limit_white_debiases_white() {
        let mut rng = fastrand::Rng::with_seed(13);
        let mut picker = ColorPicker::new();
        let n = 20_000;
        let mut whites = 0;
        for _ in 0..n {
            if picker.pick(&mut rng, PickOptions::limit_white()) == Color::White {
                whites += 1;
            }
        }
        // Expected rate is 1/6 * (0.4 + 0.6 * 1/6) = 1/12; plain uniform
        // would be 1/6. Allow generous slack around the debiased rate.
        let rate = whites as f32 / n as f32;
        assert!(rate > 0.05 && rate < 0.13, "white rate {rate}");
    }

    #[test]
    fn pistil_contrasts_with_white_and_gold_shells() {
        let mut rng = fastrand::Rng::with_seed(17);
        let mut picker = ColorPicker::new();
        for _ in 0..200 {
            assert_ne!(
                picker.pistil_color_for(&mut rng, Color::White),
                Color::White
            );
            assert_ne!(picker.pistil_color_for(&mut rng, Color::Gold), Color::Gold);
        }
    }

    #[test]
    fn pistil_is_neutral_for_colored_shells() {
        let mut rng = fastrand::Rng::with_seed(19);
        let mut picker = ColorPicker::new();
        for _ in 0..200 {
            let c = picker.pistil_color_for(&mut rng, Color::Red);
            assert!(c == Color::White || c == Color::Gold);
        }
    }
}
