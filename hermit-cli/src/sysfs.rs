//! Pins and I2C on a Raspberry Pi through the stock Linux interfaces.
//!
//! GPIO goes through `/sys/class/gpio`. That interface has no pull
//! resistor control, so pulls must already be set by the firmware
//! (`gpio=...,pu` lines in `config.txt`); a requested pull is only logged.
//! I2C goes through the `i2cget`/`i2cset` tools from i2c-tools.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use hermit_drivers::bus::{Direction, Gpio, I2cBus, Level, Pull};
use hermit_drivers::BusError;
use tracing::{debug, trace};

const GPIO_ROOT: &str = "/sys/class/gpio";

pub struct SysfsGpio {
    root: PathBuf,
    exported: HashSet<u8>,
}

impl SysfsGpio {
    pub fn new() -> Self {
        Self::with_root(GPIO_ROOT)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exported: HashSet::new(),
        }
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn write(&self, path: &Path, value: &str, pin: u8) -> Result<(), BusError> {
        fs::write(path, value).map_err(|err| gpio_error(pin, err))
    }

    /// Export the pin on first use. The kernel takes a moment to create the
    /// attribute files after an export.
    fn ensure_exported(&mut self, pin: u8) -> Result<(), BusError> {
        if self.exported.contains(&pin) {
            return Ok(());
        }
        if !self.pin_dir(pin).exists() {
            self.write(&self.root.join("export"), &pin.to_string(), pin)?;
            for _ in 0..20 {
                if self.pin_dir(pin).join("direction").exists() {
                    break;
                }
                thread::sleep(Duration::from_millis(5));
            }
            debug!(pin, "exported");
        }
        self.exported.insert(pin);
        Ok(())
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        for pin in self.exported.drain() {
            // Leaving a pin exported is harmless
            let _ = fs::write(self.root.join("unexport"), pin.to_string());
        }
    }
}

fn gpio_error(pin: u8, err: io::Error) -> BusError {
    BusError::Gpio {
        pin,
        reason: err.to_string(),
    }
}

impl Gpio for SysfsGpio {
    fn set_direction(&mut self, pin: u8, direction: Direction) -> Result<(), BusError> {
        self.ensure_exported(pin)?;
        let value = match direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        self.write(&self.pin_dir(pin).join("direction"), value, pin)
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), BusError> {
        self.ensure_exported(pin)?;
        debug!(pin, ?pull, "sysfs cannot set pulls, relying on config.txt");
        Ok(())
    }

    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), BusError> {
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        self.write(&self.pin_dir(pin).join("value"), value, pin)
    }

    fn read_level(&mut self, pin: u8) -> Result<Level, BusError> {
        let text =
            fs::read_to_string(self.pin_dir(pin).join("value")).map_err(|e| gpio_error(pin, e))?;
        trace!(pin, value = text.trim(), "read");
        match text.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(BusError::Gpio {
                pin,
                reason: format!("unexpected value {other:?}"),
            }),
        }
    }
}

/// An I2C bus driven through the i2c-tools commands.
pub struct I2cTools {
    bus: u8,
}

impl I2cTools {
    pub fn new(bus: u8) -> Self {
        Self { bus }
    }

    fn run(
        &self,
        tool: &str,
        args: &[String],
        address: u8,
        register: u8,
    ) -> Result<String, BusError> {
        let output = Command::new(tool)
            .arg("-y")
            .arg(self.bus.to_string())
            .args(args)
            .output()
            .map_err(BusError::Io)?;
        if !output.status.success() {
            debug!(
                tool,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "i2c transaction failed"
            );
            return Err(BusError::I2c { address, register });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl I2cBus for I2cTools {
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        let args = [
            format!("{address:#04x}"),
            format!("{register:#04x}"),
            format!("{value:#04x}"),
        ];
        self.run("i2cset", &args, address, register)?;
        Ok(())
    }

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let args = [format!("{address:#04x}"), format!("{register:#04x}")];
        let text = self.run("i2cget", &args, address, register)?;
        parse_i2cget(&text).ok_or(BusError::I2c { address, register })
    }
}

/// `i2cget` prints the byte as `0x3f`.
fn parse_i2cget(text: &str) -> Option<u8> {
    let digits = text.strip_prefix("0x")?;
    u8::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_root(name: &str, pins: &[u8]) -> PathBuf {
        let root = std::env::temp_dir()
            .join(format!("hermit-sysfs-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        for pin in pins {
            let dir = root.join(format!("gpio{pin}"));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("direction"), "in").unwrap();
            fs::write(dir.join("value"), "1\n").unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn test_direction_and_level() {
        let root = fake_root("dir", &[13]);
        let mut gpio = SysfsGpio::with_root(&root);
        gpio.set_direction(13, Direction::Output).unwrap();
        gpio.set_level(13, Level::Low).unwrap();
        assert_eq!(fs::read_to_string(root.join("gpio13/direction")).unwrap(), "out");
        assert_eq!(gpio.read_level(13).unwrap(), Level::Low);
        drop(gpio);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_pin_is_a_bus_error() {
        let root = fake_root("missing", &[]);
        let mut gpio = SysfsGpio::with_root(&root);
        assert!(matches!(
            gpio.read_level(4),
            Err(BusError::Gpio { pin: 4, .. })
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_parse_i2cget() {
        assert_eq!(parse_i2cget("0x3f"), Some(0x3F));
        assert_eq!(parse_i2cget("Error: Read failed"), None);
    }
}
