mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "skylink", version, about = "Telemetry bus code generator and decoder")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_repeated_files() {
        let cli = Cli::try_parse_from([
            "skylink",
            "generate",
            "--board",
            "adcs",
            "--file",
            "adcs.yaml",
            "--file",
            "eps.yaml",
            "--dest",
            "out/",
        ])
        .expect("generate args should parse");

        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.board, "adcs");
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.dest, "out/");
    }

    #[test]
    fn generate_requires_board() {
        let err = Cli::try_parse_from(["skylink", "generate", "--file", "adcs.yaml"])
            .expect_err("missing board should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn encode_rejects_address_outside_space() {
        let err = Cli::try_parse_from(["skylink", "encode", "--address", "0x800"])
            .expect_err("address 0x800 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_monitor_with_devices() {
        let cli = Cli::try_parse_from([
            "skylink",
            "monitor",
            "--catalog",
            "packets.json",
            "/dev/ttyUSB0",
            "/dev/ttyUSB1",
            "--count",
            "5",
        ])
        .expect("monitor args should parse");

        let Command::Monitor(args) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.devices.len(), 2);
        assert_eq!(args.count, Some(5));
        assert!(!args.no_verify);
    }
}
