mod cat;
mod dump;
mod info;
mod list;

use clap::Parser;
use fatvfs::error::{DeviceError, Error};
use fatvfs::io::std::FileDevice;

#[derive(Debug, clap::Args)]
struct List {
    /// Specify path to list, default to root directory
    #[clap(default_value = "/")]
    path: String,
}

#[derive(Debug, clap::Args)]
struct Cat {
    /// Specify path to concatenate
    path: String,
}

#[derive(Debug, clap::Args)]
struct Dump {
    /// Sector to dump
    #[clap(default_value_t = 0)]
    sector: u64,
    /// Number of sectors
    #[clap(short, long, default_value_t = 1)]
    count: usize,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    /// List file and directory in specified path
    #[clap(name = "ls")]
    List(List),
    /// Concatenate file and print on the standard output
    Cat(Cat),
    /// Print volume geometry
    Info,
    /// Hex dump raw sectors
    Dump(Dump),
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long)]
    quiet: bool,
    #[clap(short, action = clap::ArgAction::Count)]
    verbosity: u8,
    /// block device or file that formatted with FAT12/16/32
    #[clap(short, long)]
    device: String,
    #[clap(subcommand)]
    action: Action,
}

fn main() {
    let args = Args::parse();
    let level = match (args.quiet, args.verbosity) {
        (true, _) => log::LevelFilter::Off,
        (_, 0) => log::LevelFilter::Info,
        (_, 1) => log::LevelFilter::Debug,
        (_, _) => log::LevelFilter::Trace,
    };
    log::set_max_level(level);
    env_logger::builder().filter(None, level).target(env_logger::Target::Stderr).init();

    let device = match FileDevice::open_readonly(&args.device) {
        Ok(device) => device,
        Err(error) => {
            eprintln!("{}: {}", args.device, error);
            std::process::exit(1);
        }
    };
    let result: Result<(), Error> = match args.action {
        Action::List(list) => list::list(device, &list.path),
        Action::Cat(cat) => cat::cat(device, &cat.path),
        Action::Info => info::info(device),
        Action::Dump(dump) => dump::dump(device, dump.sector, dump.count),
    };
    if let Some(error) = result.err() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

pub(crate) fn stdout_error(error: std::io::Error) -> Error {
    DeviceError::from(error).into()
}
