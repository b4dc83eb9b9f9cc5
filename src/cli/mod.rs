pub mod actions;

use clap::{Arg, ArgMatches, Command};

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    Command::new("futaba")
        .about("Two-channel Modbus RTU digital output slave")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to a JSON device configuration file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial port name (e.g. /dev/ttyUSB0)")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .help("Serial port baud rate (framing is fixed at 8N1)")
                .value_name("BAUD")
                .default_value("9600")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("unit-id")
                .long("unit-id")
                .help("Modbus unit ID (slave address)")
                .value_name("ID")
                .default_value("1")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("gpio")
                .long("gpio")
                .help("Comma-separated sysfs GPIO value paths for channels 1 and 2")
                .value_name("PATHS")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Run with in-memory outputs instead of GPIO lines")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Emit output state changes as JSON lines on stdout")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Append logs to this file as well as stdout")
                .value_name("FILE"),
        )
        .get_matches()
}
