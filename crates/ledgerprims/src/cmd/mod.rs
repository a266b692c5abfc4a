use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod apdu;
pub mod list;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List attached supported devices.
    List(ListArgs),
    /// Send one APDU and print the answer.
    Apdu(ApduArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::List(args) => list::run(args, format),
        Command::Apdu(args) => apdu::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {}

#[derive(Args, Debug)]
pub struct ApduArgs {
    /// Command as hex: CLA INS P1 P2, optionally followed by Lc and data (e.g. e001000000).
    pub command: String,
    /// Device path as printed by `list`. Default: first supported device.
    #[arg(long)]
    pub path: Option<String>,
    /// Wait for each response packet (e.g. 30s, 500ms).
    #[arg(long, env = "LEDGERPRIMS_READ_TIMEOUT", default_value = "30s")]
    pub read_timeout: String,
    /// Wait for the whole exchange (e.g. 60s). Covers user confirmation on the device.
    #[arg(long, env = "LEDGERPRIMS_TIMEOUT", default_value = "60s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
