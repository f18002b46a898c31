use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use skylink_decode::{DecodedRecord, DecodingListener, PacketDecoder};
use skylink_frame::{
    ConnectionRegistry, ConnectionStatus, Device, FrameConfig, ListenerRegistry,
    DEFAULT_READ_TIMEOUT,
};

use crate::cmd::MonitorArgs;
use crate::exit::{decode_error, frame_error, io_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let decoder = Arc::new(
        PacketDecoder::from_path(&args.catalog).map_err(|err| decode_error("catalog", err))?,
    );
    let config = FrameConfig {
        verify_checksum: !args.no_verify,
        read_timeout: Some(DEFAULT_READ_TIMEOUT),
        ..FrameConfig::default()
    };

    let (tx, rx) = mpsc::channel::<(String, DecodedRecord)>();
    let mut registry = ConnectionRegistry::new();
    for device in &args.devices {
        let name = device.display().to_string();
        let (reader, writer) = open_device(device)?;

        let listeners = ListenerRegistry::new();
        let tx = tx.clone();
        let source = name.clone();
        listeners.subscribe(DecodingListener::new(
            Arc::clone(&decoder),
            move |record: DecodedRecord| {
                let _ = tx.send((source.clone(), record));
            },
        ));

        registry
            .open_timed(&name, reader, writer, config.clone(), listeners)
            .map_err(|err| frame_error(&format!("open {name}"), err))?;
    }
    drop(tx);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let limit_reached = |printed: usize| args.count.is_some_and(|count| printed >= count);

    while running.load(Ordering::SeqCst) && !limit_reached(printed) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok((source, record)) => {
                print_record(&record, Some(&source), format);
                printed = printed.saturating_add(1);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if registry.all_finished() {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    // Records decoded before the last reader exited.
    while !limit_reached(printed) {
        let Ok((source, record)) = rx.try_recv() else {
            break;
        };
        print_record(&record, Some(&source), format);
        printed = printed.saturating_add(1);
    }

    let mut code = SUCCESS;
    for (name, status) in registry.close_all() {
        tracing::info!(connection = %name, ?status, "connection closed");
        if status == ConnectionStatus::Errored {
            code = FAILURE;
        }
    }
    tracing::info!(records = printed, "monitor finished");
    Ok(code)
}

/// Open a device for reading and, when permitted, writing.
fn open_device(path: &Path) -> CliResult<(Device, Box<dyn Write + Send>)> {
    let context = format!("open {}", path.display());
    match Device::open(path) {
        Ok(device) => {
            let writer = device.try_clone().map_err(|err| io_error(&context, err))?;
            Ok((device, Box::new(writer)))
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::debug!(device = %path.display(), "device not writable, monitoring read-only");
            let device = Device::open_read_only(path).map_err(|err| io_error(&context, err))?;
            Ok((device, Box::new(std::io::sink())))
        }
        Err(err) => Err(io_error(&context, err)),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
