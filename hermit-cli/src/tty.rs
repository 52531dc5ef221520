//! The Lyra's serial link as a plain tty device node.
//!
//! Line settings are applied with `stty`. Reads block, so a background thread
//! reads the device and forwards bytes over a channel; `available()` just
//! counts what has arrived.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::process::Command;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{bail, Context, Result};
use hermit_drivers::bus::SerialPort;
use hermit_drivers::BusError;
use tracing::{debug, trace, warn};

pub struct TtyLink {
    writer: File,
    rx: Receiver<Vec<u8>>,
    buffer: VecDeque<u8>,
    closed: bool,
}

impl TtyLink {
    pub fn open(port: &str, baud: u32) -> Result<Self> {
        let speed = baud.to_string();
        let status = Command::new("stty")
            .args(["-F", port, speed.as_str(), "raw", "-echo", "-hupcl"])
            .status()
            .context("running stty")?;
        if !status.success() {
            bail!("stty could not configure {port}");
        }

        let writer = OpenOptions::new()
            .read(true)
            .write(true)
            .open(port)
            .with_context(|| format!("opening {port}"))?;
        let reader = writer.try_clone().context("cloning tty handle")?;
        let rx = spawn_reader(reader, port.to_string());
        debug!(port, baud, "serial link open");

        Ok(Self {
            writer,
            rx,
            buffer: VecDeque::new(),
            closed: false,
        })
    }

    fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.buffer.extend(chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

fn spawn_reader(mut reader: File, port: String) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; 64];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(port = %port, error = %err, "serial read failed");
                    break;
                }
            }
        }
    });
    rx
}

impl SerialPort for TtyLink {
    fn write_byte(&mut self, byte: u8) -> Result<(), BusError> {
        self.writer.write_all(&[byte])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BusError> {
        self.writer.flush()?;
        // bytes already here belong to an earlier exchange
        self.pump();
        if !self.buffer.is_empty() {
            trace!(stale = self.buffer.len(), "discarding serial input");
            self.buffer.clear();
        }
        Ok(())
    }

    fn available(&mut self) -> Result<usize, BusError> {
        self.pump();
        if self.closed && self.buffer.is_empty() {
            return Err(BusError::Serial("device closed".to_string()));
        }
        Ok(self.buffer.len())
    }

    fn read_byte(&mut self) -> Result<u8, BusError> {
        self.pump();
        self.buffer
            .pop_front()
            .ok_or_else(|| BusError::Serial("no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Sender;

    fn link(name: &str) -> (TtyLink, Sender<Vec<u8>>) {
        let path = std::env::temp_dir()
            .join(format!("hermit-tty-{name}-{}", std::process::id()));
        let writer = File::create(&path).unwrap();
        let (tx, rx) = mpsc::channel();
        let link = TtyLink {
            writer,
            rx,
            buffer: VecDeque::new(),
            closed: false,
        };
        (link, tx)
    }

    #[test]
    fn test_flush_discards_stale_input() {
        let (mut link, tx) = link("flush");
        tx.send(vec![0x01, 0x02, 0x03]).unwrap();
        assert_eq!(link.available().unwrap(), 3);

        link.write_byte(0xAA).unwrap();
        link.flush().unwrap();
        assert_eq!(link.available().unwrap(), 0);

        tx.send(vec![0x7D]).unwrap();
        assert_eq!(link.available().unwrap(), 1);
        assert_eq!(link.read_byte().unwrap(), 0x7D);
    }

    #[test]
    fn test_closed_link_errors_once_drained() {
        let (mut link, tx) = link("closed");
        tx.send(vec![0x42]).unwrap();
        drop(tx);
        assert_eq!(link.available().unwrap(), 1);
        assert_eq!(link.read_byte().unwrap(), 0x42);
        assert!(matches!(link.available(), Err(BusError::Serial(_))));
    }
}
