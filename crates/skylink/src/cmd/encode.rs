use serde::Serialize;
use skylink_frame::{FrameMeta, FrameWriter};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{parse_hex, print_raw, to_hex, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    address: u16,
    rtr: bool,
    length: usize,
    meta: String,
    payload: String,
    wire: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = parse_hex(&args.payload).map_err(CliError::usage)?;

    let mut writer = FrameWriter::new(Vec::new());
    writer
        .send(args.address, args.rtr, &payload)
        .map_err(|err| frame_error("encode failed", err))?;
    let wire = writer.into_inner();

    let meta = FrameMeta {
        address: args.address,
        rtr: args.rtr,
        // Bounded by the successful send above.
        length: payload.len() as u8,
    }
    .pack();

    match format {
        OutputFormat::Json => {
            let out = EncodeOutput {
                address: args.address,
                rtr: args.rtr,
                length: payload.len(),
                meta: to_hex(&meta),
                payload: to_hex(&payload),
                wire: to_hex(&wire),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => print_raw(&wire),
        OutputFormat::Table | OutputFormat::Pretty => {
            let spaced: Vec<String> = wire.iter().map(|b| format!("{b:02x}")).collect();
            println!("{}", spaced.join(" "));
        }
    }

    Ok(SUCCESS)
}
