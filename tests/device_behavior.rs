//! End-to-end behavior of the register block and output driver, driven by
//! real RTU frames the way a master would produce them.

use rmodbus::{client::ModbusRequest, ModbusProto};

use futaba::{
    driver::{MemoryOutput, OutputChannel, OutputDriver},
    protocol::{process_request, RegisterBank},
};

const UNIT_ID: u8 = 1;

fn device() -> (RegisterBank, OutputDriver) {
    let mut driver = OutputDriver::new(vec![
        OutputChannel::new(0, Box::new(MemoryOutput::new("ch1"))),
        OutputChannel::new(1, Box::new(MemoryOutput::new("ch2"))),
    ]);
    driver.deassert_all();
    (RegisterBank::new(), driver)
}

fn master_write(bank: &mut RegisterBank, address: u16, value: u16) -> Option<Vec<u8>> {
    let mut request = ModbusRequest::new(UNIT_ID, ModbusProto::Rtu);
    let mut raw = Vec::new();
    request.generate_set_holding(address, value, &mut raw).unwrap();
    let (_, response) = process_request(UNIT_ID, &raw, bank).unwrap();
    response
}

#[test]
fn test_startup_state() {
    let (bank, driver) = device();
    assert_eq!(bank.output_values().unwrap(), vec![0, 0]);
    assert_eq!(driver.channel_states(), vec![false, false]);
}

#[test]
fn test_register_writes_drive_channels_within_one_tick() {
    let (mut bank, mut driver) = device();

    master_write(&mut bank, 0, 1);
    driver.sync(&bank);
    assert_eq!(driver.channel_states(), vec![true, false]);

    master_write(&mut bank, 1, 1);
    driver.sync(&bank);
    assert_eq!(driver.channel_states(), vec![true, true]);

    master_write(&mut bank, 0, 0);
    driver.sync(&bank);
    assert_eq!(driver.channel_states(), vec![false, true]);

    master_write(&mut bank, 1, 0);
    driver.sync(&bank);
    assert_eq!(driver.channel_states(), vec![false, false]);
}

#[test]
fn test_any_nonzero_value_asserts() {
    let (mut bank, mut driver) = device();

    for value in [1u16, 7, 0xFF00, u16::MAX] {
        master_write(&mut bank, 0, value);
        driver.sync(&bank);
        assert_eq!(driver.channel_states(), vec![true, false], "value {value}");

        master_write(&mut bank, 0, 0);
        driver.sync(&bank);
        assert_eq!(driver.channel_states(), vec![false, false]);
    }
}

#[test]
fn test_out_of_range_writes_do_not_touch_outputs() {
    let (mut bank, mut driver) = device();

    // The library answers these normally; the driver never looks there.
    let response = master_write(&mut bank, 5, 1);
    assert!(response.is_some());

    let transitions = driver.sync(&bank);
    assert!(transitions.is_empty());
    assert_eq!(driver.channel_states(), vec![false, false]);
}

#[test]
fn test_repeated_writes_are_idempotent() {
    let (mut bank, mut driver) = device();

    master_write(&mut bank, 0, 1);
    assert_eq!(driver.sync(&bank).len(), 1);

    master_write(&mut bank, 0, 1);
    assert!(driver.sync(&bank).is_empty());
    assert_eq!(driver.channel_states(), vec![true, false]);
}

#[test]
fn test_master_read_back_reflects_outputs() {
    let (mut bank, _driver) = device();
    master_write(&mut bank, 0, 1);

    let mut request = ModbusRequest::new(UNIT_ID, ModbusProto::Rtu);
    let mut raw = Vec::new();
    request.generate_get_holdings(0, 2, &mut raw).unwrap();

    let (summary, response) = process_request(UNIT_ID, &raw, &mut bank).unwrap();
    assert!(summary.processed);

    let response = response.unwrap();
    assert_eq!(u16::from_be_bytes([response[3], response[4]]), 1);
    assert_eq!(u16::from_be_bytes([response[5], response[6]]), 0);
}
