// Rekeyrs CLI
// Drives the remapping core from replay scripts or live key lines on stdin

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;

use rekeyrs_core::config::{default_profile_content, Config, KeyExpression};
use rekeyrs_core::event::{join_loop, load_script, parse_live_line, replay, EventLoop, LoopHandle};
use rekeyrs_core::{Direction, KeyInjector, KeyStroke, TrackedKeyState, VirtualKey};

/// Number pad key remapper
#[derive(Parser, Debug)]
#[command(name = "rekeyrs")]
#[command(author = "rekeyrs contributors")]
#[command(version)]
#[command(about = "Alt-code, double-tap and chord remapping for number pads", long_about = None)]
struct Args {
    /// TOML configuration file (default: ~/.config/rekeyrs/config.toml, then the built-in profile)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Print the built-in number pad profile and exit
    #[arg(long)]
    print_default_config: bool,

    /// Replay a timestamped event script instead of reading stdin
    #[arg(short, long, value_name = "SCRIPT")]
    replay: Option<PathBuf>,

    /// Start with Num Lock toggled on
    #[arg(long)]
    num_lock: bool,

    /// Print individual host key presses instead of key expressions
    #[arg(short, long)]
    expand: bool,
}

/// Writes every stroke to stdout, one per line
struct StdoutInjector {
    out: io::Stdout,
    expand: bool,
}

impl StdoutInjector {
    fn new(expand: bool) -> Self {
        Self {
            out: io::stdout(),
            expand,
        }
    }
}

/// Output lines for one stroke: the stroke itself, or one line per host press
fn render_stroke(stroke: &KeyStroke, expand: bool) -> Vec<String> {
    if !expand {
        return vec![stroke.to_string()];
    }
    stroke
        .host_presses()
        .into_iter()
        .map(|(token, direction)| format!("{} {}", token, direction))
        .collect()
}

impl KeyInjector for StdoutInjector {
    fn send_key(&mut self, expr: &KeyExpression, direction: Option<Direction>) {
        let stroke = KeyStroke::new(expr.clone(), direction);
        let mut out = self.out.lock();
        let result = render_stroke(&stroke, self.expand)
            .iter()
            .try_for_each(|line| writeln!(out, "{}", line))
            .and_then(|_| out.flush());
        if let Err(e) = result {
            log::error!("Error sending output: {}", e);
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn initial_key_state(args: &Args) -> TrackedKeyState {
    let keys = TrackedKeyState::new();
    if args.num_lock {
        keys.with_toggled(VirtualKey::NUM_LOCK)
    } else {
        keys
    }
}

fn run_replay(
    config: &Config,
    script_path: &Path,
    mut keys: TrackedKeyState,
    expand: bool,
) -> Result<()> {
    let script = load_script(script_path)
        .with_context(|| format!("Failed to load replay script {}", script_path.display()))?;
    let mut router = config.build_router();
    let mut injector = StdoutInjector::new(expand);

    let summary = replay(
        &mut router,
        &config.registration,
        &mut keys,
        &script,
        &mut injector,
    );
    log::info!(
        "Replayed {} event(s): {} routed, {} suppressed, {} diagnostic(s)",
        summary.events,
        summary.routed,
        summary.suppressed,
        summary.diagnostics.len()
    );
    Ok(())
}

/// Stop the loop on SIGINT/SIGTERM
fn spawn_signal_thread(handle: LoopHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::info!("Received signal {}, shutting down gracefully...", signal);
            handle.shutdown();
        }
    });
    Ok(())
}

/// Feed `down <key> [device]` lines into the loop until EOF
fn spawn_stdin_reader(handle: LoopHandle) -> Result<()> {
    thread::Builder::new()
        .name("rekeyrs-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for (index, line) in stdin.lock().lines().enumerate() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("Error reading stdin: {}", e);
                        break;
                    }
                };
                let event = match parse_live_line(index + 1, &line) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => {
                        log::error!("{}", e);
                        continue;
                    }
                };
                match handle.send_key(event) {
                    Ok(suppress) => log::debug!("suppress={}", suppress),
                    Err(_) => break,
                }
            }
            handle.shutdown();
        })
        .context("Failed to start stdin reader")?;
    Ok(())
}

fn run_live(config: &Config, keys: TrackedKeyState, expand: bool) -> Result<()> {
    let event_loop = EventLoop::new(
        config.build_router(),
        config.registration.clone(),
        StdoutInjector::new(expand),
        keys,
    );
    let (handle, join) = event_loop.spawn()?;
    spawn_signal_thread(handle.clone())?;
    spawn_stdin_reader(handle)?;

    log::info!("rekeyrs is running. Type lines like 'down numpad3'; Ctrl+D or Ctrl+C to exit.");
    let stats = join_loop(join)?;
    log::info!(
        "Processed {} event(s): {} routed, {} suppressed, {} timer output(s)",
        stats.events,
        stats.routed,
        stats.suppressed,
        stats.timer_outputs
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.print_default_config {
        print!("{}", default_profile_content());
        return Ok(());
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if args.check_config {
        let _router = config.build_router();
        println!("Configuration is valid");
        return Ok(());
    }

    let keys = initial_key_state(&args);
    match &args.replay {
        Some(script) => run_replay(&config, script, keys, args.expand),
        None => run_live(&config, keys, args.expand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["rekeyrs", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.print_default_config);
        assert!(args.replay.is_none());
        assert!(!args.num_lock);
        assert!(!args.expand);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "rekeyrs",
            "--verbose",
            "--replay",
            "/tmp/session.txt",
            "--num-lock",
            "--expand",
        ]);

        assert!(args.verbose);
        assert!(args.config.is_none());
        assert_eq!(args.replay, Some(PathBuf::from("/tmp/session.txt")));
        assert!(args.num_lock);
        assert!(args.expand);
    }

    #[test]
    fn test_num_lock_flag_sets_initial_state() {
        use rekeyrs_core::KeyStateQuery;

        let args = Args::parse_from(["rekeyrs", "--num-lock"]);
        let keys = initial_key_state(&args);
        assert!(keys.key_state(VirtualKey::NUM_LOCK).toggled);
    }

    #[test]
    fn test_render_stroke_expanded() {
        let stroke = KeyStroke::up(KeyExpression::parse("ctrl+z").unwrap());
        assert_eq!(render_stroke(&stroke, false), vec!["ctrl+z up"]);
        assert_eq!(render_stroke(&stroke, true), vec!["z up", "ctrl up"]);
    }
}
