//! [`Adapter`] for BLE-UART bridge dongles, which show up as ordinary serial
//! ports (`/dev/ttyACM0`, `/dev/ttyUSB0`, `COM3`, ...).
//!
//! The dongle does the Bluetooth side; from here the scale is a byte stream.

use crate::transport::{Adapter, DeviceInfo, LinkError, Port};
use serial2::SerialPort;
use std::{
    io::{self, Read},
    time::Duration,
};

/// Default baud rate of the bridge dongles we ship with.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

// Short enough that a local disconnect stops the listener promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Finds and opens serial ports.
#[derive(Debug, Clone, Copy)]
pub struct SerialAdapter {
    baud_rate: u32,
}

impl Default for SerialAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

impl SerialAdapter {
    /// Opens ports at `baud_rate`.
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }
}

impl Adapter for SerialAdapter {
    type Port = SerialLink;

    fn discover(&self) -> Result<Vec<DeviceInfo>, LinkError> {
        let ports = SerialPort::available_ports().map_err(|e| {
            LinkError::DeviceUnavailable(format!("cannot enumerate serial ports: {}", e))
        })?;
        Ok(ports.into_iter().map(DeviceInfo::from_path).collect())
    }

    fn open(&self, device: &DeviceInfo) -> Result<SerialLink, LinkError> {
        let port =
            SerialPort::open(&device.path, self.baud_rate).map_err(LinkError::ConnectionRefused)?;
        Ok(SerialLink { port })
    }
}

/// An open serial port.
#[derive(Debug)]
pub struct SerialLink {
    port: SerialPort,
}

impl Port for SerialLink {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.port.write_all(chunk)?;
        self.port.flush()
    }

    fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        let mut reader = self.port.try_clone()?;
        reader.set_read_timeout(READ_TIMEOUT)?;
        Ok(Box::new(reader))
    }
}
