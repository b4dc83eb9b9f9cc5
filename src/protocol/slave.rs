use anyhow::{anyhow, Result};
use std::{
    io::{Read, Write},
    time::Duration,
};

use rmodbus::{consts::ModbusFunction, server::ModbusFrame, ModbusProto};

use super::registers::RegisterBank;

/// Summary of one serviced request frame.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub func: ModbusFunction,
    /// The frame was addressed to us and touched the storage context.
    pub processed: bool,
    /// The frame wrote registers (as opposed to a read-only request).
    pub wrote_registers: bool,
    /// A response frame was sent back to the master.
    pub responded: bool,
}

/// Service at most one inbound request on the port.
///
/// Returns `Ok(None)` when the read timed out with no traffic — an ordinary
/// idle tick, not an error. Frame validation (CRC, unit ID, function-code
/// support, exception responses) is entirely rmodbus' concern; a frame
/// addressed to another unit parses cleanly and simply requires neither
/// processing nor a response.
pub fn service_once(
    port: &mut Box<dyn serialport::SerialPort>,
    unit_id: u8,
    bank: &mut RegisterBank,
) -> Result<Option<RequestSummary>> {
    let mut buffer = vec![0u8; 256];
    let total_bytes = read_request_bytes(port, &mut buffer)?;
    if total_bytes == 0 {
        return Ok(None);
    }

    let request = &buffer[..total_bytes];
    log::debug!("Received request: {request:02X?}");

    let (summary, response) = process_request(unit_id, request, bank)?;

    if let Some(resp) = response {
        port.write_all(&resp)?;
        port.flush()?;
        log::debug!("Sent response: {resp:02X?}");
    }

    Ok(Some(summary))
}

/// Parse and process a single raw request frame against the register bank.
///
/// Split out of [`service_once`] so the protocol path can be exercised
/// without a serial port.
pub fn process_request(
    unit_id: u8,
    request: &[u8],
    bank: &mut RegisterBank,
) -> Result<(RequestSummary, Option<Vec<u8>>)> {
    let mut response = Vec::new();
    let mut frame = ModbusFrame::new(unit_id, request, ModbusProto::Rtu, &mut response);
    frame.parse()?;

    let processed = frame.processing_required;
    let wrote_registers = frame.processing_required && !frame.readonly;
    let func = frame.func;

    let response_bytes = build_response(&mut frame, bank)?;
    let responded = response_bytes.is_some();

    Ok((
        RequestSummary {
            func,
            processed,
            wrote_registers,
            responded,
        },
        response_bytes,
    ))
}

fn build_response(
    frame: &mut ModbusFrame<Vec<u8>>,
    bank: &mut RegisterBank,
) -> Result<Option<Vec<u8>>> {
    if frame.processing_required {
        let result = if frame.readonly {
            frame.process_read(bank.context_mut())
        } else {
            frame.process_write(bank.context_mut())
        };
        if result.is_err() {
            return Err(anyhow!("Frame processing error"));
        }
    }

    if frame.response_required {
        frame.finalize_response()?;
        return Ok(Some(frame.response.clone()));
    }

    Ok(None)
}

/// Read one request's worth of bytes, returning 0 on a quiet tick.
///
/// Modbus RTU frames may arrive fragmented relative to our read timeout, so
/// after the first chunk we wait out the inter-frame gap and collect any
/// stragglers. At 9600 baud an 8-byte request takes ~8ms; 10ms covers it.
fn read_request_bytes(
    port: &mut Box<dyn serialport::SerialPort>,
    buffer: &mut [u8],
) -> Result<usize> {
    let mut total_bytes = match port.read(buffer) {
        Ok(n) => n,
        Err(err) if err.kind() == std::io::ErrorKind::TimedOut => return Ok(0),
        Err(err) => return Err(err.into()),
    };

    if total_bytes == 0 {
        return Ok(0);
    }

    std::thread::sleep(Duration::from_millis(10));
    if let Ok(additional) = port.read(&mut buffer[total_bytes..]) {
        total_bytes += additional;
    }

    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmodbus::client::ModbusRequest;

    const UNIT_ID: u8 = 1;

    fn write_single_frame(unit_id: u8, address: u16, value: u16) -> Vec<u8> {
        let mut request = ModbusRequest::new(unit_id, ModbusProto::Rtu);
        let mut raw = Vec::new();
        request.generate_set_holding(address, value, &mut raw).unwrap();
        raw
    }

    #[test]
    fn test_write_single_register_mutates_bank_and_echoes() {
        let mut bank = RegisterBank::new();
        let raw = write_single_frame(UNIT_ID, 0, 1);

        let (summary, response) = process_request(UNIT_ID, &raw, &mut bank).unwrap();

        assert!(summary.processed);
        assert!(summary.wrote_registers);
        assert!(summary.responded);
        assert_eq!(bank.holding(0).unwrap(), 1);
        // Function 0x06 responses echo the request frame verbatim.
        assert_eq!(response.unwrap(), raw);
    }

    #[test]
    fn test_read_holdings_returns_current_values() {
        let mut bank = RegisterBank::new();
        bank.set_holding(0, 7).unwrap();
        bank.set_holding(1, 0).unwrap();

        let mut request = ModbusRequest::new(UNIT_ID, ModbusProto::Rtu);
        let mut raw = Vec::new();
        request.generate_get_holdings(0, 2, &mut raw).unwrap();

        let (summary, response) = process_request(UNIT_ID, &raw, &mut bank).unwrap();
        assert!(summary.processed);
        assert!(!summary.wrote_registers);

        let response = response.unwrap();
        // unit(1) + func(1) + byte count(1) + 2 registers(4) + CRC(2)
        assert_eq!(response.len(), 9);
        assert_eq!(response[0], UNIT_ID);
        assert_eq!(response[1], 0x03);
        assert_eq!(response[2], 4);
        assert_eq!(u16::from_be_bytes([response[3], response[4]]), 7);
        assert_eq!(u16::from_be_bytes([response[5], response[6]]), 0);
    }

    #[test]
    fn test_frame_for_other_unit_is_ignored() {
        let mut bank = RegisterBank::new();
        let raw = write_single_frame(9, 0, 1);

        let (summary, response) = process_request(UNIT_ID, &raw, &mut bank).unwrap();

        assert!(!summary.processed);
        assert!(!summary.responded);
        assert!(response.is_none());
        assert_eq!(bank.holding(0).unwrap(), 0);
    }

    #[test]
    fn test_write_outside_mapped_block_still_echoes() {
        let mut bank = RegisterBank::new();
        let raw = write_single_frame(UNIT_ID, 5, 1);

        let (summary, response) = process_request(UNIT_ID, &raw, &mut bank).unwrap();

        assert!(summary.processed);
        assert!(response.is_some());
        assert_eq!(bank.holding(5).unwrap(), 1);
        // The mapped output block is untouched.
        assert_eq!(bank.output_values().unwrap(), vec![0, 0]);
    }
}
