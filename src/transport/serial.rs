use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use serialport::SerialPortType;

use crate::chunk::ChunkKind;
use crate::decoder::{Completion, Continuation};
use crate::error::{CellularError, Result};

use super::{ChunkHandler, Transport};

/// Default serial port settings.
const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;
const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
const PARITY: serialport::Parity = serialport::Parity::None;

/// Longest single read wait, so the deadline is re-checked regularly.
const READ_SLICE: Duration = Duration::from_millis(100);

/// An AT command transport over a native serial port.
///
/// Every received line is delivered as its own `\r\n<line>\r\n` chunk, the
/// framing modem firmware uses on the wire.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    /// Bytes read but not yet split into lines.
    buf: Vec<u8>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            port,
            buf: Vec::with_capacity(256),
        }
    }

    /// Pop the next complete line, without terminators.
    fn next_line(&mut self) -> Option<String> {
        if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            return Some(line.trim_end_matches(['\r', '\n']).to_string());
        }
        // The data prompt is not newline-terminated.
        if self.buf.starts_with(b">") {
            let raw: Vec<u8> = self.buf.drain(..).collect();
            return Some(String::from_utf8_lossy(&raw).into_owned());
        }
        None
    }

    /// Read whatever is available into the internal buffer.
    fn fill_buf(&mut self, deadline: Instant) -> Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        if let Err(e) = self.port.set_timeout(remaining.min(READ_SLICE)) {
            debug!("could not set read timeout: {e}");
        }

        let mut tmp = [0u8; 256];
        match self.port.read(&mut tmp) {
            Ok(n) => {
                self.buf.extend_from_slice(&tmp[..n]);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(CellularError::Io(e)),
        }
    }
}

impl Transport for SerialTransport {
    fn command(
        &mut self,
        command: &str,
        timeout: Duration,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<Completion> {
        if !command.is_empty() {
            trace!("TX: {command}");
            self.port.write_all(format!("{command}\r\n").as_bytes())?;
            self.port.flush()?;
        }

        let deadline = Instant::now() + timeout;
        let mut collecting = true;

        loop {
            while let Some(line) = self.next_line() {
                if line.is_empty() {
                    continue;
                }
                if !command.is_empty() && line == command {
                    trace!("echo: {line}");
                    continue;
                }
                trace!("RX: {line}");

                let kind = ChunkKind::classify(&line);
                if collecting {
                    let chunk = format!("\r\n{line}\r\n");
                    if on_chunk(kind, chunk.as_bytes()) == Continuation::Done {
                        collecting = false;
                    }
                }

                match kind {
                    ChunkKind::Ok => return Ok(Completion::Ok),
                    k if k.is_final() => return Ok(Completion::Error),
                    _ => {}
                }
            }

            if Instant::now() >= deadline {
                if !command.is_empty() {
                    debug!("timeout waiting for {command:?}");
                }
                return Ok(Completion::Timeout);
            }
            self.fill_buf(deadline)?;
        }
    }
}

/// Find a serial port whose USB product string contains `product`.
///
/// Enumerates all available ports and returns the first USB port that
/// matches. When none does, every port seen is logged at `warn` so the user
/// can pick one by hand, and `PortNotFound` is returned.
pub fn find_port(product: &str) -> Result<String> {
    let ports = serialport::available_ports()?;

    for port in &ports {
        debug!("found port: {} ({:?})", port.port_name, port.port_type);
        if let SerialPortType::UsbPort(usb_info) = &port.port_type
            && let Some(name) = &usb_info.product
            && name.contains(product)
        {
            info!("found {product} on {}", port.port_name);
            return Ok(port.port_name.clone());
        }
    }

    if ports.is_empty() {
        warn!("no serial ports found");
    } else {
        warn!("{product} not found among {} port(s):", ports.len());
        for port in &ports {
            warn!("  {} ({:?})", port.port_name, port.port_type);
        }
    }

    Err(CellularError::PortNotFound(product.to_string()))
}

/// Open a serial port (8N1) at the given baud rate.
///
/// Reads wait at most 100 ms at a time so command deadlines are honoured;
/// the returned transport takes care of echo and line framing.
pub fn open_port(port_name: &str, baud_rate: u32) -> Result<SerialTransport> {
    let port = serialport::new(port_name, baud_rate)
        .data_bits(DATA_BITS)
        .stop_bits(STOP_BITS)
        .parity(PARITY)
        .timeout(READ_SLICE)
        .open()?;

    info!("opened {} at {} baud", port_name, baud_rate);
    Ok(SerialTransport::new(port))
}
