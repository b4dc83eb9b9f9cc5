use futaba::{boot, cli};

fn main() {
    let matches = cli::parse_args();
    boot::init_logging(matches.get_one::<String>("log-file").cloned());

    if let Err(err) = cli::actions::dispatch(&matches) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
