use anyhow::{Context, Result};

/// USB identifiers the Lyra's ATmega32u4 may enumerate with, depending on
/// which bootloader and core it was flashed with.
const KNOWN_DEVICES: &[(u16, u16, &str)] = &[
    (0x2341, 0x8036, "Arduino Leonardo"),
    (0x2341, 0x0036, "Arduino Leonardo bootloader"),
    (0x2341, 0x8037, "Arduino Micro"),
    (0x2341, 0x0037, "Arduino Micro bootloader"),
    (0x1B4F, 0x9206, "SparkFun Pro Micro"),
    (0x1B4F, 0x9205, "SparkFun Pro Micro bootloader"),
    (0x03EB, 0x2FF4, "ATmega32u4 DFU bootloader"),
];

/// A candidate controller found on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub bus: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: &'static str,
}

impl Found {
    /// A board running its bootloader has no sketch, so no packets.
    pub fn in_bootloader(&self) -> bool {
        self.name.ends_with("bootloader")
    }
}

pub fn identify(vendor_id: u16, product_id: u16) -> Option<&'static str> {
    KNOWN_DEVICES
        .iter()
        .find(|(vid, pid, _)| *vid == vendor_id && *pid == product_id)
        .map(|(_, _, name)| *name)
}

/// Look for anything that could be the Lyra's microcontroller.
pub fn detect() -> Result<Vec<Found>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    let mut found = Vec::new();
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if let Some(name) = identify(desc.vendor_id(), desc.product_id()) {
            found.push(Found {
                bus: device.bus_number(),
                address: device.address(),
                vendor_id: desc.vendor_id(),
                product_id: desc.product_id(),
                name,
            });
        }
    }
    Ok(found)
}
