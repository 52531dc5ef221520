mod hex;
mod layout;
mod sysfs;
mod tty;
mod usb;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hermit_drivers::bus::StdDelay;
use hermit_drivers::packet::{self, Field};
use hermit_drivers::{
    Config, EventSink, GpioJoystick, Host, Input, InputEvent, LyraController, Mcp23008, Membrane,
    MenuButton, PacketError, SystemClock, UiState,
};
use hermit_keymap::InputKey;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};

use sysfs::{I2cTools, SysfsGpio};
use tty::TtyLink;

#[derive(Parser)]
#[command(name = "hermit-cli")]
#[command(about = "Hermit Retro input driver tools")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON configuration file; built-in defaults otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a Lyra controller packet given as hex bytes
    Decode {
        /// Five bytes, e.g. `00 42 80 C0 7D`
        #[arg(required = true)]
        bytes: Vec<String>,
    },
    /// Build a Lyra controller packet, checksum included
    Frame { b0: String, b1: String, b2: String, b3: String },
    /// Write an HTML/SVG picture of the membrane keymap
    Layout {
        /// Output file; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Look for the Lyra's microcontroller on USB
    Detect,
    /// Print the configuration in effect as JSON
    Config,
    /// Poll drivers on real hardware and print their events
    Run {
        #[arg(
            short,
            long,
            value_enum,
            value_delimiter = ',',
            default_values = ["membrane", "joystick", "menu-button"]
        )]
        drivers: Vec<DriverKind>,
        /// Poll period in milliseconds
        #[arg(long, default_value_t = 10)]
        period_ms: u64,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
        /// I2C bus number of the expander
        #[arg(long, default_value_t = 1)]
        i2c_bus: u8,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    Membrane,
    Joystick,
    MenuButton,
    Expander,
    Lyra,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Decode { bytes } => decode(&bytes)?,
        Command::Frame { b0, b1, b2, b3 } => {
            let payload = [&b0, &b1, &b2, &b3]
                .into_iter()
                .map(|s| hex::parse_byte(s))
                .collect::<Result<Vec<u8>>>()?;
            let frame = packet::frame(payload[0], payload[1], payload[2], payload[3]);
            println!("{}", hex::format_bytes(&frame));
        }
        Command::Layout { output } => {
            let html = layout::generate_html(&config.membrane);
            match output {
                Some(path) => {
                    fs::write(&path, html)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Layout written to {}", path.display());
                }
                None => print!("{html}"),
            }
        }
        Command::Detect => detect(&config)?,
        Command::Config => println!("{}", config.to_json()?),
        Command::Run {
            drivers,
            period_ms,
            seconds,
            i2c_bus,
        } => run(&config, &drivers, period_ms, seconds, i2c_bus)?,
    }

    Ok(())
}

fn field_name(field: Field) -> &'static str {
    match field {
        Field::Extra => "b1 (volume, bottom-right 3)",
        Field::Left => "b2 (left pad, top buttons)",
        Field::Right => "b3 (right pad, bottom-right 1/2)",
    }
}

fn decode(args: &[String]) -> Result<()> {
    let raw = hex::parse_bytes(args)?;
    println!("Packet:   {}", hex::format_bytes(&raw));

    let decoded = match packet::decode(&raw) {
        Ok(decoded) => decoded,
        Err(PacketError::Checksum { expected, actual }) => {
            bail!("checksum mismatch: got 0x{actual:02X}, payload sums to 0x{expected:02X}")
        }
        Err(err) => bail!(err),
    };

    println!("Checksum: 0x{:02X} ok", raw[packet::PACKET_LEN - 1]);
    match decoded.battery {
        Some(level) => println!("Battery:  {level}/63"),
        None => println!("Battery:  b0 tag mismatch, ignored"),
    }
    for (field, byte) in Field::ALL.into_iter().zip(&raw[1..4]) {
        let status = if decoded.is_valid(field) {
            "ok"
        } else {
            "tag mismatch, ignored"
        };
        println!(
            "{:<34} 0x{byte:02X} tag 0x{:02X}: {status}",
            field_name(field),
            field.tag()
        );
    }
    if decoded.pressed.is_empty() {
        println!("Pressed:  nothing");
    } else {
        let names: Vec<String> = decoded.pressed.iter().map(|b| format!("{b:?}")).collect();
        println!("Pressed:  {}", names.join(", "));
    }
    Ok(())
}

fn detect(config: &Config) -> Result<()> {
    let found = usb::detect()?;
    if found.is_empty() {
        println!("No ATmega32u4 controller found on USB.");
    }
    for dev in &found {
        println!(
            "Bus {:03} Device {:03}: {:04x}:{:04x} {}",
            dev.bus, dev.address, dev.vendor_id, dev.product_id, dev.name
        );
        if dev.in_bootloader() {
            println!("  In bootloader mode: it will not answer packet requests until it reboots.");
        }
    }

    let port = &config.lyra.port;
    if Path::new(port).exists() {
        println!("Serial port {port} present.");
    } else {
        println!("Serial port {port} not present.");
    }
    Ok(())
}

/// Prints events above the spinner, and follows the menu the way the
/// emulator would: F1 opens it, Escape closes it.
struct Printer<'a> {
    bar: &'a ProgressBar,
    ui: UiState,
    count: u64,
}

impl EventSink for Printer<'_> {
    fn input_event(&mut self, event: InputEvent) {
        self.count += 1;
        let name = match event.input {
            Input::Key(key) => key.display_name().to_string(),
            Input::Joystick(button) => format!("{button:?}"),
        };
        self.bar.println(format!(
            "{:<14} {:<16} {name}",
            format!("{:?}", event.device),
            format!("{:?}", event.kind)
        ));
        if event.is_press() {
            match event.input {
                Input::Key(InputKey::F1) => self.ui = UiState::Menu,
                Input::Key(InputKey::Escape) => self.ui = UiState::Emulation,
                _ => {}
            }
        }
    }
}

fn build_host(config: &Config, drivers: &[DriverKind], i2c_bus: u8) -> Result<Host> {
    let mut host = Host::new();
    for kind in drivers {
        match kind {
            DriverKind::Membrane => host.register(Box::new(Membrane::new(
                SysfsGpio::new(),
                &config.membrane,
                SystemClock,
            )?)),
            DriverKind::Joystick => host.register(Box::new(GpioJoystick::new(
                SysfsGpio::new(),
                &config.joystick,
                SystemClock,
            )?)),
            DriverKind::MenuButton => host.register(Box::new(MenuButton::new(
                SysfsGpio::new(),
                &config.menu_button,
                SystemClock,
            ))),
            DriverKind::Expander => host.register(Box::new(Mcp23008::new(
                I2cTools::new(i2c_bus),
                &config.expander,
                SystemClock,
            )?)),
            DriverKind::Lyra => match TtyLink::open(&config.lyra.port, config.lyra.baud) {
                Ok(link) => host.register(Box::new(LyraController::new(
                    link,
                    StdDelay,
                    &config.lyra,
                    SystemClock,
                )?)),
                Err(err) => warn!(error = %format!("{err:#}"), "lyra unavailable"),
            },
        }
    }
    Ok(host)
}

fn run(
    config: &Config,
    drivers: &[DriverKind],
    period_ms: u64,
    seconds: Option<u64>,
    i2c_bus: u8,
) -> Result<()> {
    let mut host = build_host(config, drivers, i2c_bus)?;
    let failed = host.start();
    let running: Vec<&str> = host.running().collect();
    if running.is_empty() {
        bail!("no driver could be started ({} failed)", failed.len());
    }
    info!(drivers = ?running, "polling");

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut printer = Printer {
        bar: &bar,
        ui: UiState::Emulation,
        count: 0,
    };
    let period = Duration::from_millis(period_ms);
    let start = Instant::now();
    loop {
        host.poll(printer.ui, &mut printer);
        bar.set_message(format!(
            "{} events, {:?}, {}",
            printer.count,
            printer.ui,
            running.join(", ")
        ));
        if seconds.is_some_and(|s| start.elapsed() >= Duration::from_secs(s)) {
            break;
        }
        thread::sleep(period);
    }

    host.shutdown();
    bar.finish_with_message(format!("{} events", printer.count));
    Ok(())
}
