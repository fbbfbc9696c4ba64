//! Two-layer drawing surface composited to the terminal.
//!
//! The `main` layer is cleared every frame; the `trails` layer persists and
//! is only multiplied down by a per-frame fade, which is what turns moving
//! points into streaks without tracking any per-particle trail geometry.
//! Both layers live in a `cols x rows*2` pixel grid rendered with half
//! blocks, two pixels per character cell.
//!
//! Simulation coordinates are logical stage units; the surface maps them to
//! device pixels with a scale derived from the terminal height and the user
//! zoom, so the same burst descriptor fills a tiny and a huge terminal
//! alike.

use std::io::{self, BufWriter, Stdout, Write};

use crate::spark::Stage;

/// Reference logical stage height the shell descriptors are calibrated
/// against.
const LOGICAL_HEIGHT: f32 = 1000.0;

/// Trail intensities below this are snapped to zero so faded cells go back
/// to the background.
const TRAIL_FLOOR: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Trails,
    Main,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    intensity: f32,
    color: (u8, u8, u8),
}

const EMPTY: Cell = Cell {
    intensity: 0.0,
    color: (0, 0, 0),
};

pub struct Surface {
    width: usize,
    height: usize,
    scale_factor: f32,
    /// Device pixels per logical stage unit.
    scale: f32,
    trails: Vec<Cell>,
    main: Vec<Cell>,
    out: Vec<u8>,
    bg: (u8, u8, u8),
}

impl Surface {
    pub fn new(cols: u16, rows: u16, bg: (u8, u8, u8), scale_factor: f32) -> Surface {
        let width = cols as usize;
        let height = rows as usize * 2;
        let mut surface = Surface {
            width,
            height,
            scale_factor,
            scale: 1.0,
            trails: vec![EMPTY; width * height],
            main: vec![EMPTY; width * height],
            out: Vec::with_capacity(width * height * 25),
            bg,
        };
        surface.rescale();
        surface
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Logical stage the simulation runs in.
    pub fn stage(&self) -> Stage {
        Stage {
            width: self.width as f32 / self.scale,
            height: self.height as f32 / self.scale,
        }
    }

    /// Wipe both layers back to the background.
    pub fn clear(&mut self) {
        self.trails.fill(EMPTY);
        self.main.fill(EMPTY);
    }

    /// Rebuild both layers for a new terminal size. Trails are lost; the
    /// next frames repaint them.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.width = cols as usize;
        self.height = rows as usize * 2;
        self.trails.resize(self.width * self.height, EMPTY);
        self.main.resize(self.width * self.height, EMPTY);
        self.clear();
        self.rescale();
    }

    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
        self.rescale();
    }

    /// Logical stage coordinates of a terminal cell (pointer events).
    pub fn to_stage(&self, col: u16, row: u16) -> (f32, f32) {
        (
            col as f32 / self.scale,
            row as f32 * 2.0 / self.scale,
        )
    }

    fn rescale(&mut self) {
        self.scale = (self.height as f32 / LOGICAL_HEIGHT * self.scale_factor).max(0.005);
    }

    /// Fade the trails layer and wipe the main layer for a new frame.
    pub fn begin_frame(&mut self, trail_fade: f32) {
        for cell in &mut self.trails {
            cell.intensity *= trail_fade;
            if cell.intensity < TRAIL_FLOOR {
                *cell = EMPTY;
            }
        }
        self.main.fill(EMPTY);
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut [Cell] {
        match layer {
            Layer::Trails => &mut self.trails,
            Layer::Main => &mut self.main,
        }
    }

    fn plot(&mut self, layer: Layer, px: i32, py: i32, color: (u8, u8, u8), intensity: f32) {
        if px < 0 || py < 0 || px >= self.width as i32 || py >= self.height as i32 {
            return;
        }
        let idx = py as usize * self.width + px as usize;
        let cell = &mut self.layer_mut(layer)[idx];
        if intensity > cell.intensity {
            *cell = Cell { intensity, color };
        }
    }

    /// Single point at logical coordinates.
    pub fn point(&mut self, layer: Layer, x: f32, y: f32, color: (u8, u8, u8), intensity: f32) {
        if intensity <= 0.0 {
            return;
        }
        let px = (x * self.scale) as i32;
        let py = (y * self.scale) as i32;
        self.plot(layer, px, py, color, intensity);
    }

    /// Filled circle, brightest in the middle. Radius in logical units.
    pub fn circle(
        &mut self,
        layer: Layer,
        x: f32,
        y: f32,
        radius: f32,
        color: (u8, u8, u8),
        intensity: f32,
    ) {
        if intensity <= 0.0 {
            return;
        }
        let r = (radius * self.scale).max(1.0);
        let cx = x * self.scale;
        let cy = y * self.scale;
        let ri = r.ceil() as i32;
        for dy in -ri..=ri {
            for dx in -ri..=ri {
                let d2 = (dx * dx + dy * dy) as f32;
                if d2 > r * r {
                    continue;
                }
                let falloff = 1.0 - (d2.sqrt() / r) * 0.7;
                self.plot(
                    layer,
                    cx as i32 + dx,
                    cy as i32 + dy,
                    color,
                    intensity * falloff,
                );
            }
        }
    }

    /// Line segment between logical points.
    pub fn line(
        &mut self,
        layer: Layer,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: (u8, u8, u8),
        intensity: f32,
    ) {
        if intensity <= 0.0 {
            return;
        }
        let (px0, py0) = (x0 * self.scale, y0 * self.scale);
        let (px1, py1) = (x1 * self.scale, y1 * self.scale);
        let steps = (px1 - px0).abs().max((py1 - py0).abs()).ceil().max(1.0);
        let n = steps as i32;
        for i in 0..=n {
            let t = i as f32 / steps;
            let px = (px0 + (px1 - px0) * t) as i32;
            let py = (py0 + (py1 - py0) * t) as i32;
            self.plot(layer, px, py, color, intensity);
        }
    }

    /// Composite both layers over the (sky-lit) background into the output
    /// buffer as half-block cells.
    pub fn composite(&mut self, sky: [f32; 3], sky_strength: f32) {
        self.out.clear();
        self.out.extend_from_slice(b"\x1b[H");

        let bg = (
            tint(self.bg.0, sky[0], sky_strength),
            tint(self.bg.1, sky[1], sky_strength),
            tint(self.bg.2, sky[2], sky_strength),
        );

        let mut prev_top: (u8, u8, u8) = (255, 255, 255);
        let mut prev_bot: (u8, u8, u8) = (255, 255, 255);

        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top_idx = y * self.width + x;
                let bot_idx = if y + 1 < self.height {
                    (y + 1) * self.width + x
                } else {
                    top_idx
                };

                let top = self.resolve(top_idx, bg);
                let bot = self.resolve(bot_idx, bg);

                // Only emit color codes when they change.
                if top != prev_top {
                    let _ = write!(self.out, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2);
                    prev_top = top;
                }
                if bot != prev_bot {
                    let _ = write!(self.out, "\x1b[38;2;{};{};{}m", bot.0, bot.1, bot.2);
                    prev_bot = bot;
                }
                self.out.extend_from_slice("▄".as_bytes());
            }
            self.out.extend_from_slice(b"\x1b[0m");
            prev_top = (255, 255, 255);
            prev_bot = (255, 255, 255);
            if y + 2 < self.height {
                self.out.extend_from_slice(b"\r\n");
            }
        }
    }

    /// Append a positioned text overlay on top of the composited frame.
    /// `row` and `col` are one-based terminal coordinates.
    pub fn overlay(&mut self, row: u16, col: u16, color: (u8, u8, u8), text: &str) {
        let _ = write!(
            self.out,
            "\x1b[{};{}H\x1b[38;2;{};{};{}m{}\x1b[0m",
            row, col, color.0, color.1, color.2, text
        );
    }

    /// Write the finished frame out.
    pub fn present(&mut self, stdout: &mut BufWriter<Stdout>) -> io::Result<()> {
        stdout.write_all(&self.out)?;
        stdout.flush()
    }

    /// Final color of one pixel: the brighter of the two layers blended
    /// over the background.
    fn resolve(&self, idx: usize, bg: (u8, u8, u8)) -> (u8, u8, u8) {
        let t = self.trails[idx];
        let m = self.main[idx];
        let cell = if m.intensity >= t.intensity { m } else { t };
        if cell.intensity <= 0.05 {
            return bg;
        }
        let blend = cell.intensity.min(1.0);
        (
            mix(bg.0, cell.color.0, blend),
            mix(bg.1, cell.color.1, blend),
            mix(bg.2, cell.color.2, blend),
        )
    }

    #[cfg(test)]
    fn cell(&self, layer: Layer, px: usize, py: usize) -> (f32, (u8, u8, u8)) {
        let cell = match layer {
            Layer::Trails => self.trails[py * self.width + px],
            Layer::Main => self.main[py * self.width + px],
        };
        (cell.intensity, cell.color)
    }
}

fn mix(bg: u8, fg: u8, blend: f32) -> u8 {
    (bg as f32 * (1.0 - blend) + fg as f32 * blend) as u8
}

fn tint(bg: u8, glow: f32, strength: f32) -> u8 {
    (bg as f32 + glow * strength * 48.0).min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Surface {
        // 100 cols x 50 rows -> 100x100 px, scale 0.1: logical 1000x1000.
        Surface::new(100, 50, (0, 0, 0), 1.0)
    }

    #[test]
    fn stage_tracks_terminal_and_zoom() {
        let mut s = surface();
        let stage = s.stage();
        assert!((stage.height - 1000.0).abs() < 1.0);
        assert!((stage.width - 1000.0).abs() < 1.0);

        s.set_scale_factor(2.0);
        let zoomed = s.stage();
        assert!((zoomed.height - 500.0).abs() < 1.0);

        s.set_scale_factor(1.0);
        s.resize(200, 50);
        assert_eq!(s.width(), 200);
        assert_eq!(s.height(), 100);
        assert!((s.stage().width - 2000.0).abs() < 1.0);
    }

    #[test]
    fn point_maps_logical_to_device_pixels() {
        let mut s = surface();
        s.point(Layer::Main, 500.0, 500.0, (255, 0, 0), 1.0);
        let (intensity, color) = s.cell(Layer::Main, 50, 50);
        assert_eq!(intensity, 1.0);
        assert_eq!(color, (255, 0, 0));
    }

    #[test]
    fn brighter_writes_win() {
        let mut s = surface();
        s.point(Layer::Main, 500.0, 500.0, (255, 0, 0), 0.4);
        s.point(Layer::Main, 500.0, 500.0, (0, 255, 0), 0.9);
        s.point(Layer::Main, 500.0, 500.0, (0, 0, 255), 0.2);
        let (intensity, color) = s.cell(Layer::Main, 50, 50);
        assert_eq!(intensity, 0.9);
        assert_eq!(color, (0, 255, 0));
    }

    #[test]
    fn out_of_bounds_draws_are_ignored() {
        let mut s = surface();
        s.point(Layer::Main, -50.0, 500.0, (255, 0, 0), 1.0);
        s.point(Layer::Main, 5000.0, 500.0, (255, 0, 0), 1.0);
        s.line(Layer::Main, -100.0, -100.0, 2000.0, 2000.0, (255, 0, 0), 1.0);
        // Nothing to assert beyond not panicking; spot-check a corner.
        let (intensity, _) = s.cell(Layer::Main, 0, 0);
        assert!(intensity >= 0.0);
    }

    #[test]
    fn trails_fade_and_main_clears_each_frame() {
        let mut s = surface();
        s.point(Layer::Trails, 500.0, 500.0, (255, 191, 54), 1.0);
        s.point(Layer::Main, 500.0, 500.0, (255, 191, 54), 1.0);

        s.begin_frame(0.5);
        let (trail, _) = s.cell(Layer::Trails, 50, 50);
        let (main, _) = s.cell(Layer::Main, 50, 50);
        assert_eq!(trail, 0.5);
        assert_eq!(main, 0.0);

        // Repeated fades eventually snap the cell back to empty.
        for _ in 0..16 {
            s.begin_frame(0.5);
        }
        let (trail, _) = s.cell(Layer::Trails, 50, 50);
        assert_eq!(trail, 0.0);
    }

    #[test]
    fn line_touches_both_endpoints() {
        let mut s = surface();
        s.line(Layer::Trails, 100.0, 100.0, 300.0, 100.0, (30, 60, 90), 0.8);
        let (a, _) = s.cell(Layer::Trails, 10, 10);
        let (b, _) = s.cell(Layer::Trails, 30, 10);
        assert_eq!(a, 0.8);
        assert_eq!(b, 0.8);
    }

    #[test]
    fn composite_emits_a_full_frame() {
        let mut s = surface();
        s.point(Layer::Main, 500.0, 500.0, (255, 0, 0), 1.0);
        s.composite([0.0; 3], 0.0);
        let frame = String::from_utf8_lossy(&s.out);
        assert!(frame.starts_with("\u{1b}[H"));
        // One half-block glyph per cell.
        assert_eq!(frame.matches('▄').count(), 100 * 50);
    }
}
