//! touchctl - drive an Android device with raw key and touch events
//!
//! Usage:
//!     touchctl [OPTIONS] [KEYS]...
//!
//! Environment Variables:
//!     TOUCH_AGENT_ADB_PATH: Path to the adb binary (default: adb)
//!     TOUCH_AGENT_DEVICE: adb serial of the target device (default: 127.0.0.1:21503)
//!     TOUCH_AGENT_INPUT_DEVICE: Input device node (default: /dev/input/event6)
//!     TOUCH_AGENT_LAYOUT: JSON touch layout file (default: built-in layout)
//!     RUST_LOG: Log filter (default: info)

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::io::Write as _;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use touch_agent::{
    AdbConnection, ControllerConfig, CoordinateTable, EventChannel, InputController, KeyboardKey,
    WriterChannel, DEFAULT_INPUT_DEVICE, DEFAULT_SERIAL,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Controller = InputController<Box<dyn EventChannel>>;

/// Raw input automation for Android devices
#[derive(Parser, Debug)]
#[command(name = "touchctl")]
#[command(about = "Inject raw key and multi-touch events into an Android device over adb")]
#[command(after_help = r#"Examples:
    # Tap "a", then "s", then press the left arrow key
    touchctl a s left

    # Tap "a" forever, roughly every 4 seconds
    touchctl --repeat a --interval 4.2 --jitter 3

    # Interactive prompt
    touchctl

    # Print the events instead of sending them
    touchctl --dry-run a left

    # Use another emulator and a custom touch layout
    touchctl --device 127.0.0.1:5555 --layout layout.json bag
"#)]
struct Cli {
    /// Path to the adb binary
    #[arg(long, env = "TOUCH_AGENT_ADB_PATH", default_value = "adb")]
    adb_path: String,

    /// adb serial of the target device
    #[arg(short = 'd', long, env = "TOUCH_AGENT_DEVICE", default_value = DEFAULT_SERIAL)]
    device: String,

    /// Connect to a remote device first (e.g., 127.0.0.1:5555)
    #[arg(short = 'c', long, value_name = "ADDRESS")]
    connect: Option<String>,

    /// Disconnect from remote device (or 'all' to disconnect all)
    #[arg(long, value_name = "ADDRESS", num_args = 0..=1, default_missing_value = "all")]
    disconnect: Option<String>,

    /// List connected devices and exit
    #[arg(long)]
    list_devices: bool,

    /// List keyboard keys and touch identifiers and exit
    #[arg(long)]
    list_keys: bool,

    /// Input device node that receives the events
    #[arg(long, env = "TOUCH_AGENT_INPUT_DEVICE", default_value = DEFAULT_INPUT_DEVICE)]
    input_device: String,

    /// JSON touch layout file mapping identifiers to [x, y]
    #[arg(long, env = "TOUCH_AGENT_LAYOUT", value_name = "PATH")]
    layout: Option<String>,

    /// Write events to stdout instead of an adb shell
    #[arg(long)]
    dry_run: bool,

    /// Tap this identifier in a loop until interrupted
    #[arg(long, value_name = "ID")]
    repeat: Option<String>,

    /// Base wait between repeated taps, in seconds
    #[arg(long, default_value = "4.2")]
    interval: f64,

    /// Random spread applied around the interval, in seconds
    #[arg(long, default_value = "3.0")]
    jitter: f64,

    /// How long each tap is held, in seconds
    #[arg(long)]
    hold: Option<f64>,

    /// Pause after each tap, in seconds
    #[arg(long)]
    settle: Option<f64>,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Identifiers to tap in order (interactive mode if none and no --repeat)
    keys: Vec<String>,
}

/// A line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Down(String),
    Up(String),
    Tap(String),
    Drag((i32, i32), (i32, i32)),
    DragBetween(String, String),
    Release,
    State,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((verb, rest)) = parts.split_first() else {
        bail!("empty command");
    };

    let one = |rest: &[&str]| -> Result<String> {
        match rest {
            [id] => Ok(id.to_string()),
            _ => Err(anyhow!("{} expects exactly one identifier", verb)),
        }
    };

    match verb.to_lowercase().as_str() {
        "down" | "d" => Ok(Command::Down(one(rest)?)),
        "up" | "u" => Ok(Command::Up(one(rest)?)),
        "tap" | "t" => Ok(Command::Tap(one(rest)?)),
        "drag" => match rest {
            [from, to] => Ok(Command::DragBetween(from.to_string(), to.to_string())),
            [x1, y1, x2, y2] => {
                let n = |s: &str| -> Result<i32> {
                    s.parse()
                        .with_context(|| format!("invalid coordinate: {}", s))
                };
                Ok(Command::Drag((n(x1)?, n(y1)?), (n(x2)?, n(y2)?)))
            }
            _ => bail!("drag expects <from> <to> or <x1> <y1> <x2> <y2>"),
        },
        "release" => Ok(Command::Release),
        "state" => Ok(Command::State),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => bail!("unknown command: {}", other),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  tap <id>                  press and release");
    println!("  down <id> / up <id>       hold or release");
    println!("  drag <from> <to>          swipe between two touch points");
    println!("  drag <x1> <y1> <x2> <y2>  swipe between coordinates");
    println!("  release                   release everything held");
    println!("  state                     show what is held");
    println!("  quit                      exit");
}

/// Check system requirements before opening the shell
async fn check_system_requirements(args: &Cli, conn: &AdbConnection) -> bool {
    println!("\u{1F50D} Checking system requirements...");
    println!("{}", "-".repeat(50));

    print!("1. Checking ADB installation... ");
    std::io::stdout().flush().ok();

    match which::which(&args.adb_path) {
        Ok(path) => println!("\u{2705} OK ({})", path.display()),
        Err(_) => {
            println!("\u{274C} FAILED");
            println!("   Error: {} is not installed or not in PATH.", args.adb_path);
            println!("   Solution: Install the Android platform tools or pass --adb-path");
            return false;
        }
    }

    print!("2. Checking device {}... ", args.device);
    std::io::stdout().flush().ok();

    match conn.ensure_online(&args.device).await {
        Ok(()) => println!("\u{2705} OK"),
        Err(e) => {
            println!("\u{274C} FAILED");
            println!("   Error: {}", e);
            println!("   Solution:");
            println!("     1. Start the emulator and wait for it to boot");
            println!("     2. Connect to it: touchctl --connect {}", args.device);
            println!("     3. Verify: adb devices");
            println!("{}", "-".repeat(50));
            return false;
        }
    }

    println!("{}", "-".repeat(50));
    println!("\u{2705} All system checks passed!\n");
    true
}

/// Handle device-related commands, returning true when the program should exit
async fn handle_device_commands(args: &Cli, conn: &AdbConnection) -> Result<bool> {
    if args.list_devices {
        let devices = conn.list_devices().await?;
        if devices.is_empty() {
            println!("No devices connected.");
        } else {
            println!("Connected devices:");
            println!("{}", "-".repeat(60));
            for device in devices {
                let status_icon = if device.is_online() {
                    "\u{2713}"
                } else {
                    "\u{2717}"
                };
                let model_info = device
                    .model
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default();
                println!(
                    "  {} {:<30} [{:?}] {}{}",
                    status_icon, device.device_id, device.connection_type, device.status, model_info
                );
            }
        }
        return Ok(true);
    }

    if let Some(addr) = &args.disconnect {
        let target = if addr == "all" { None } else { Some(addr.as_str()) };
        match conn.disconnect(target).await {
            Ok(msg) => println!("\u{2713} {}", msg),
            Err(e) => println!("\u{2717} {}", e),
        }
        return Ok(true);
    }

    if let Some(addr) = &args.connect {
        println!("Connecting to {}...", addr);
        match conn.connect(addr).await {
            Ok(msg) => println!("\u{2713} {}", msg),
            Err(e) => {
                println!("\u{2717} {}", e);
                return Ok(true);
            }
        }
    }

    Ok(false)
}

fn print_supported_keys(layout: &CoordinateTable) {
    println!("Keyboard keys:");
    let names: Vec<&str> = KeyboardKey::ALL.iter().map(|k| k.name()).collect();
    println!("  {}", names.join(", "));

    println!("\nTouch points ({}):", layout.len());
    for (name, (x, y)) in layout.iter() {
        println!("  {:<8} ({}, {})", name, x, y);
    }
}

fn print_header(args: &Cli, controller: &Controller) {
    println!("{}", "=".repeat(50));
    println!("touchctl - raw input automation");
    println!("{}", "=".repeat(50));
    if args.dry_run {
        println!("Device: (dry run)");
    } else {
        println!("Device: {}", args.device);
    }
    println!("Input device: {}", controller.device_path());
    println!("Touch points: {}", controller.layout().len());
    if let Some(id) = &args.repeat {
        println!(
            "Mode: repeat {} every {}s \u{00B1}{}s",
            id,
            args.interval,
            args.jitter / 2.0
        );
    }
    println!("{}", "=".repeat(50));
}

async fn load_layout(args: &Cli) -> Result<CoordinateTable> {
    match &args.layout {
        Some(path) => CoordinateTable::from_json_file(path)
            .await
            .with_context(|| format!("loading layout {}", path)),
        None => Ok(CoordinateTable::legacy()),
    }
}

/// Tap one identifier forever with a randomized wait in between
async fn run_repeat(controller: &mut Controller, args: &Cli, id: &str) -> Result<()> {
    let interval = args.interval.max(0.0);
    let jitter = args.jitter.max(0.0);
    let mut count: u64 = 0;

    loop {
        controller.tap(id, args.hold, args.settle).await?;
        count += 1;

        let wait = (interval + (rand::random::<f64>() - 0.5) * jitter).max(0.0);
        info!("Tapped {} ({} times), next in {:.2}s", id, count, wait);
        tokio::time::sleep(Duration::from_secs_f64(wait)).await;
    }
}

async fn run_sequence(controller: &mut Controller, args: &Cli) -> Result<()> {
    for id in &args.keys {
        controller.tap(id, args.hold, args.settle).await?;
        info!("Tapped {}", id);
    }
    Ok(())
}

/// Run interactive mode
async fn run_interactive_mode(controller: &mut Controller, args: &Cli) -> Result<()> {
    println!("\nEntering interactive mode. Type 'help' for commands, 'quit' to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye!");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let result = match command {
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::State => {
                let keys: Vec<&str> = controller.down_keys().iter().map(|k| k.name()).collect();
                let touches: Vec<&str> = controller.down_touches().collect();
                println!("keys: [{}]  touches: [{}]", keys.join(", "), touches.join(", "));
                Ok(())
            }
            Command::Down(id) => controller.press_down(&id).await,
            Command::Up(id) => controller.release_up(&id).await,
            Command::Tap(id) => controller.tap(&id, args.hold, args.settle).await,
            Command::Drag(start, end) => controller.drag(start, end, args.settle).await,
            Command::DragBetween(from, to) => controller.drag_between(&from, &to, args.settle).await,
            Command::Release => controller.release_all().await,
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

async fn run(controller: &mut Controller, args: &Cli) -> Result<()> {
    if let Some(id) = &args.repeat {
        run_repeat(controller, args, id).await
    } else if !args.keys.is_empty() {
        run_sequence(controller, args).await
    } else {
        run_interactive_mode(controller, args).await
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.quiet);

    let layout = load_layout(&args).await?;

    if args.list_keys {
        print_supported_keys(&layout);
        return Ok(());
    }

    let conn = AdbConnection::with_path(&args.adb_path);

    if !args.dry_run && handle_device_commands(&args, &conn).await? {
        return Ok(());
    }

    let config = ControllerConfig::new(layout).with_device_path(&args.input_device);
    config.validate()?;

    let channel: Box<dyn EventChannel> = if args.dry_run {
        Box::new(WriterChannel::new(tokio::io::stdout()))
    } else {
        if !check_system_requirements(&args, &conn).await {
            std::process::exit(1);
        }
        Box::new(conn.open_shell(&args.device).await?)
    };

    let mut controller = InputController::open(channel, config)?;
    if !args.dry_run {
        print_header(&args, &controller);
    }

    let result = tokio::select! {
        res = run(&mut controller, &args) => res,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted.");
            Ok(())
        }
    };

    controller.shutdown().await;
    result
}
