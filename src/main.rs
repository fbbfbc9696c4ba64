use crossterm::{
    cursor::{Hide, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::env;
use std::io::{stdout, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use pyroterm::config::{Config, ConfigUpdate, Quality, ShellSelector, SkyLighting, Tuning};
use pyroterm::show::{LaunchPolicy, Show as FireworksShow};
use pyroterm::store;
use pyroterm::surface::Surface;

const FIXED_DT: f32 = 1.0 / 60.0;
const FIXED_DT_MS: f32 = 1000.0 / 60.0;

fn print_usage() {
    eprintln!("pyroterm - fireworks show for the terminal");
    eprintln!();
    eprintln!("Usage: pyroterm [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --shell NAME       Shell type (Random, Crysanthemum, Ghost, Strobe, Palm,");
    eprintln!("                     Ring, Willow, Crossette, \"Horse Tail\", Crackle)");
    eprintln!("  --config PATH      Config file (default: ~/.config/pyroterm/config.json)");
    eprintln!("  --bg-color RRGGBB  Background color as hex (e.g., --bg-color 1a1b26)");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  space pause   enter launch   m menu   s shell type   1/2/3 quality");
    eprintln!("  +/- size   a auto fire   f finale   l sky lighting   e open shutter");
    eprintln!("  h hide controls   q or ESC quit");
    eprintln!();
    eprintln!("Set PYROTERM_LOG=/path/to/file to write a debug log (RUST_LOG filters).");
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

fn init_logging() {
    let Ok(path) = env::var("PYROTERM_LOG") else {
        return;
    };
    match std::fs::File::create(&path) {
        Ok(file) => {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(e) => eprintln!("could not open log file {path}: {e}"),
    }
}

struct Options {
    config_path: Option<PathBuf>,
    bg_color: (u8, u8, u8),
    shell: Option<ShellSelector>,
}

fn parse_args() -> Result<Options, i32> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options {
        config_path: None,
        bg_color: (0, 0, 0),
        shell: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bg-color" => {
                if i + 1 < args.len() {
                    if let Some(color) = parse_hex_color(&args[i + 1]) {
                        options.bg_color = color;
                        i += 2;
                    } else {
                        eprintln!("Invalid hex color: {}", args[i + 1]);
                        eprintln!("Expected format: RRGGBB (e.g., 1a1b26)");
                        return Err(1);
                    }
                } else {
                    eprintln!("--bg-color requires a hex color value");
                    return Err(1);
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    options.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("--config requires a path");
                    return Err(1);
                }
            }
            "--shell" => {
                if i + 1 < args.len() {
                    match ShellSelector::from_name(&args[i + 1]) {
                        Some(selector) => {
                            options.shell = Some(selector);
                            i += 2;
                        }
                        None => {
                            eprintln!("Unknown shell type: {}", args[i + 1]);
                            return Err(1);
                        }
                    }
                } else {
                    eprintln!("--shell requires a shell name");
                    return Err(1);
                }
            }
            "help" | "--help" | "-h" => {
                print_usage();
                return Err(0);
            }
            arg => {
                eprintln!("Unknown option: {}", arg);
                eprintln!();
                print_usage();
                return Err(1);
            }
        }
    }
    Ok(options)
}

/// Map configuration keys to partial updates; loop-level keys (pause, menu,
/// quit, launch) are handled inline.
fn handle_key(code: KeyCode, config: &Config, pending: &mut Vec<ConfigUpdate>) {
    let update = match code {
        KeyCode::Char('1') => ConfigUpdate {
            quality: Some(Quality::Low),
            ..Default::default()
        },
        KeyCode::Char('2') => ConfigUpdate {
            quality: Some(Quality::Normal),
            ..Default::default()
        },
        KeyCode::Char('3') => ConfigUpdate {
            quality: Some(Quality::High),
            ..Default::default()
        },
        KeyCode::Char('s') => ConfigUpdate {
            shell: Some(config.shell.next()),
            ..Default::default()
        },
        KeyCode::Char('+') | KeyCode::Char('=') => ConfigUpdate {
            size: Some(config.size + 0.5),
            ..Default::default()
        },
        KeyCode::Char('-') | KeyCode::Char('_') => ConfigUpdate {
            size: Some(config.size - 0.5),
            ..Default::default()
        },
        KeyCode::Char('a') => ConfigUpdate {
            auto_launch: Some(!config.auto_launch),
            ..Default::default()
        },
        KeyCode::Char('f') => ConfigUpdate {
            finale: Some(!config.finale),
            ..Default::default()
        },
        KeyCode::Char('l') => ConfigUpdate {
            sky_lighting: Some(match config.sky_lighting {
                SkyLighting::None => SkyLighting::Dim,
                SkyLighting::Dim => SkyLighting::Normal,
                SkyLighting::Normal => SkyLighting::None,
            }),
            ..Default::default()
        },
        KeyCode::Char('e') => ConfigUpdate {
            long_exposure: Some(!config.long_exposure),
            ..Default::default()
        },
        KeyCode::Char('h') => ConfigUpdate {
            hide_controls: Some(!config.hide_controls),
            ..Default::default()
        },
        KeyCode::Char('[') => ConfigUpdate {
            scale_factor: Some((config.scale_factor - 0.1).max(0.3)),
            ..Default::default()
        },
        KeyCode::Char(']') => ConfigUpdate {
            scale_factor: Some((config.scale_factor + 0.1).min(3.0)),
            ..Default::default()
        },
        _ => return,
    };
    pending.push(update);
}

fn status_line(config: &Config, paused: bool, shells: usize, particles: usize) -> String {
    let quality = match config.quality {
        Quality::Low => "low",
        Quality::Normal => "normal",
        Quality::High => "high",
    };
    format!(
        " {} shell:{} size:{:.1} quality:{} auto:{} finale:{} | {} shells {} sparks | [m]enu",
        if paused { "||" } else { ">>" },
        config.shell.name(),
        config.size,
        quality,
        if config.auto_launch { "on" } else { "off" },
        if config.finale { "on" } else { "off" },
        shells,
        particles,
    )
}

fn menu_lines(config: &Config) -> Vec<String> {
    vec![
        "pyroterm".to_string(),
        String::new(),
        format!("  [s] shell type      {}", config.shell.name()),
        format!("  [+/-] shell size    {:.1}", config.size),
        format!("  [1/2/3] quality     {:?}", config.quality),
        format!("  [l] sky lighting    {:?}", config.sky_lighting),
        format!("  [[/]] scale         {:.2}", config.scale_factor),
        format!(
            "  [a] auto fire       {}",
            if config.auto_launch { "on" } else { "off" }
        ),
        format!(
            "  [f] finale mode     {}",
            if config.finale { "on" } else { "off" }
        ),
        format!(
            "  [e] open shutter    {}",
            if config.long_exposure { "on" } else { "off" }
        ),
        format!(
            "  [h] hide controls   {}",
            if config.hide_controls { "on" } else { "off" }
        ),
        String::new(),
        "  [space] pause   [enter] launch   [m] close   [q] quit".to_string(),
    ]
}

fn run(options: Options) -> std::io::Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        EnterAlternateScreen,
        Hide,
        Clear(ClearType::All),
        EnableMouseCapture
    )?;

    let (cols, rows) = terminal::size()?;

    let config_path = options.config_path.or_else(store::default_path);
    let mut config = Config::device_defaults(cols);
    if let Some(path) = &config_path {
        match store::load(path) {
            Ok(Some(update)) => config.apply(&update),
            Ok(None) => info!("no persisted config, using defaults"),
            // A bad config file must never take the show down; defaults win.
            Err(e) => warn!(error = %e, "ignoring persisted config"),
        }
    }
    if let Some(selector) = options.shell {
        config.shell = selector;
    }
    let mut tuning = Tuning::derive(&config);

    let mut surface = Surface::new(cols, rows, options.bg_color, tuning.scale_factor);
    let mut show = FireworksShow::new();
    let mut pending: Vec<ConfigUpdate> = Vec::new();

    let mut paused = false;
    let mut menu_open = false;

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;

    loop {
        if event::poll(Duration::from_millis(1))? {
            match event::read()? {
                Event::Key(key) => match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Esc => {
                        if menu_open {
                            menu_open = false;
                        } else {
                            break;
                        }
                    }
                    KeyCode::Char(' ') => paused = !paused,
                    KeyCode::Char('m') => menu_open = !menu_open,
                    KeyCode::Enter => {
                        show.launch(config.shell, &tuning, surface.stage());
                    }
                    code => handle_key(code, &config, &mut pending),
                },
                Event::Mouse(mouse) => {
                    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                        let (x, apex_y) = surface.to_stage(mouse.column, mouse.row);
                        show.launch_toward(config.shell, x, apex_y, &tuning, surface.stage());
                    }
                }
                Event::Resize(cols, rows) => {
                    surface.resize(cols, rows);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => {}
            }
        }

        // Queued config changes are applied atomically between ticks, and
        // every derived value is recomputed before the next update runs.
        if !pending.is_empty() {
            for update in pending.drain(..) {
                config.apply(&update);
            }
            tuning = Tuning::derive(&config);
            surface.set_scale_factor(tuning.scale_factor);
            if let Some(path) = &config_path {
                if let Err(e) = store::save(path, &config) {
                    warn!(error = %e, "failed to persist config");
                }
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        if paused {
            // Frozen clock: drop elapsed time so resume doesn't fast-forward.
            accumulator = 0.0;
        } else {
            accumulator += frame_time;
            if accumulator > FIXED_DT * 3.0 {
                accumulator = FIXED_DT * 3.0;
            }

            let policy = LaunchPolicy {
                selector: config.shell,
                auto_launch: config.auto_launch,
                finale: config.finale,
            };
            while accumulator >= FIXED_DT {
                show.tick(FIXED_DT_MS, &tuning, surface.stage(), policy, !menu_open);
                accumulator -= FIXED_DT;
            }

            surface.begin_frame(tuning.trail_fade);
            show.render(&mut surface, &tuning);
        }

        surface.composite(show.sky_glow(), tuning.sky_strength);
        if menu_open {
            for (i, line) in menu_lines(&config).iter().enumerate() {
                surface.overlay(2 + i as u16, 4, (220, 220, 220), line);
            }
        } else if !config.hide_controls {
            surface.overlay(
                1,
                1,
                (140, 140, 140),
                &status_line(&config, paused, show.shell_count(), show.particle_count()),
            );
        }
        surface.present(&mut stdout)?;
    }

    execute!(stdout, Show, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal::disable_raw_mode()?;

    Ok(())
}

fn main() -> std::io::Result<()> {
    init_logging();
    let options = match parse_args() {
        Ok(options) => options,
        Err(0) => return Ok(()),
        Err(code) => std::process::exit(code),
    };
    run(options)
}
