use std::io::BufReader;

use skylink_decode::PacketDecoder;
use skylink_frame::{FrameConfig, FrameError, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_records, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let decoder =
        PacketDecoder::from_path(&args.catalog).map_err(|err| decode_error("catalog", err))?;
    let capture = std::fs::File::open(&args.capture)
        .map_err(|err| io_error(&format!("open {}", args.capture.display()), err))?;

    let config = FrameConfig {
        verify_checksum: !args.no_verify,
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config(BufReader::new(capture), config);

    let mut records = Vec::new();
    let mut unknown = 0usize;
    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };
        match decoder.decode_frame(&frame) {
            Some(record) => records.push(record),
            None => unknown += 1,
        }
    }

    let stats = reader.stats();
    tracing::info!(
        frames = stats.frames,
        decoded = records.len(),
        undecoded = unknown,
        checksum_failures = stats.checksum_failures,
        discarded_bytes = stats.discarded_bytes,
        "capture decoded"
    );

    print_records(&records, format);
    Ok(SUCCESS)
}
