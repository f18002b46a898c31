use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod catalog;
pub mod decode;
pub mod encode;
pub mod generate;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load, validate and generate C sources plus the packet catalog.
    Generate(GenerateArgs),
    /// Load, validate and print the JSON packet catalog.
    Catalog(CatalogArgs),
    /// Encode one frame and print its wire bytes.
    Encode(EncodeArgs),
    /// Decode a raw byte capture against a packet catalog.
    Decode(DecodeArgs),
    /// Decode live traffic from one or more devices until Ctrl-C.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Generate(args) => generate::run(args, format),
        Command::Catalog(args) => catalog::run(args),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Board whose dispatch code to generate.
    #[arg(long)]
    pub board: String,
    /// Board definition file (repeatable).
    #[arg(long = "file", value_name = "PATH", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
    /// Output directory (trailing separator) or file name prefix.
    #[arg(long, value_name = "PREFIX", default_value = "")]
    pub dest: String,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Board definition file (repeatable).
    #[arg(long = "file", value_name = "PATH", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
    /// Write the catalog here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Packet address, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_address)]
    pub address: u16,
    /// Set the request-to-receive flag.
    #[arg(long)]
    pub rtr: bool,
    /// Payload bytes as hex.
    #[arg(long, default_value = "")]
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Packet catalog (packets.json).
    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,
    /// Raw serial capture file.
    pub capture: PathBuf,
    /// Accept frames whose checksum does not match.
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Packet catalog (packets.json).
    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,
    /// Serial devices or byte streams to read.
    #[arg(required = true)]
    pub devices: Vec<PathBuf>,
    /// Exit after printing N records.
    #[arg(long)]
    pub count: Option<usize>,
    /// Accept frames whose checksum does not match.
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_address(text: &str) -> Result<u16, String> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    }
    .map_err(|err| format!("invalid address {text:?}: {err}"))?;

    if value >= skylink_frame::ADDRESS_SPACE {
        return Err(format!(
            "address 0x{value:x} outside [0x0, 0x{:x})",
            skylink_frame::ADDRESS_SPACE
        ));
    }
    Ok(value)
}
