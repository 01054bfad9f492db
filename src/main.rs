use std::error::Error;

use bpaf::{Bpaf, Parser};
use tracing_subscriber::EnvFilter;
use xc0424::Xc0424;

use crate::config::Config;
use crate::history::apply_history;
use crate::info::apply_info;
use crate::settings::{apply_settings, set_args, SetArgs};

mod config;
mod history;
mod info;
mod lock;
mod settings;

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Reject responses whose checksum does not match
    #[bpaf(long("strict"))]
    strict: bool,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(generate(command_inner))]
enum Command {
    /// Show configuration, schedule, and live readings (default)
    #[bpaf(command)]
    Info,
    /// Sync the logger clock to the system clock
    #[bpaf(command)]
    Time,
    /// Change logger settings
    #[bpaf(command, fallback_to_usage)]
    Set(#[bpaf(external(set_args))] SetArgs),
    /// Download every stored reading as csv
    #[bpaf(command)]
    History,
    /// Erase every stored reading
    #[bpaf(command)]
    Clear,
}

fn command() -> impl Parser<Command> {
    command_inner().fallback(Command::Info)
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn apply_time(device: &mut Xc0424) -> Result<(), Box<dyn Error>> {
    let time = chrono::Local::now();
    device.set_clock(time.naive_local())?;
    println!("updated time to {time}");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli().run();
    let config = Config::load_or_create()?;
    init_logging(&config.logging.filter);

    let _lock = lock::Lock::acquire(
        &Config::dir()?,
        config.device.vendor_id,
        config.device.product_id,
    )?;
    let mut device = Xc0424::open_with(&config.device.hid_options())?
        .with_strict_checksum(cli.strict || config.device.strict_checksum);

    match cli.command {
        Command::Info => apply_info(&mut device),
        Command::Time => apply_time(&mut device),
        Command::Set(args) => apply_settings(&mut device, &args),
        Command::History => apply_history(&mut device),
        Command::Clear => {
            device.clear_history()?;
            println!("cleared history");
            Ok(())
        },
    }
}
