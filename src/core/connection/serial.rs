//! Serial port connection

use super::{Connection, ConnectionConfig, ConnectionError};
use bytes::Bytes;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, StopBits};
use std::io::{self, ErrorKind, Read};

const READ_BUFFER_SIZE: usize = 4096;

/// Serial port connection (8N1, no flow control)
pub struct SerialConnection {
    config: ConnectionConfig,
    port: Option<Box<dyn SerialPort>>,
    buffer: Vec<u8>,
}

impl SerialConnection {
    /// Open the configured port
    pub fn open(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|e| classify_open_error(&config.port, &e))?;

        tracing::info!(port = %config.port, baud = config.baud_rate, "serial port opened");

        Ok(Self {
            config: config.clone(),
            port: Some(port),
            buffer: vec![0u8; READ_BUFFER_SIZE],
        })
    }
}

impl Connection for SerialConnection {
    fn read_chunk(&mut self) -> io::Result<Bytes> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "serial port is closed"))?;

        match port.read(&mut self.buffer) {
            Ok(n) => Ok(Bytes::copy_from_slice(&self.buffer[..n])),
            // Timeout window elapsed, or a signal interrupted the wait
            Err(ref e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(Bytes::new())
            }
            Err(e) => Err(e),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(port = %self.config.port, "serial port closed");
        }
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn classify_open_error(port: &str, e: &serialport::Error) -> ConnectionError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => ConnectionError::PortNotFound(port.to_string()),
        serialport::ErrorKind::Io(ErrorKind::NotFound) => ConnectionError::PortNotFound(port.to_string()),
        serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
            ConnectionError::PermissionDenied(port.to_string())
        }
        serialport::ErrorKind::Io(ErrorKind::AddrInUse | ErrorKind::ResourceBusy) => {
            ConnectionError::PortInUse(port.to_string())
        }
        _ => ConnectionError::OpenFailed {
            port: port.to_string(),
            reason: e.to_string(),
        },
    }
}

/// List available serial ports
pub fn list_ports() -> io::Result<Vec<SerialPortInfo>> {
    serialport::available_ports().map_err(io::Error::from)
}
