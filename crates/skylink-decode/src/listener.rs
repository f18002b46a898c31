use std::sync::mpsc;
use std::sync::Arc;

use skylink_frame::{Frame, FrameListener};

use crate::decoder::PacketDecoder;
use crate::record::DecodedRecord;

/// Frame listener that decodes each frame and hands the record to `sink`.
///
/// Frames at unknown addresses, or too short for their layout, are dropped.
pub struct DecodingListener<F> {
    decoder: Arc<PacketDecoder>,
    sink: F,
}

impl<F> DecodingListener<F>
where
    F: Fn(DecodedRecord) + Send + Sync,
{
    pub fn new(decoder: Arc<PacketDecoder>, sink: F) -> Self {
        Self { decoder, sink }
    }
}

impl<F> FrameListener for DecodingListener<F>
where
    F: Fn(DecodedRecord) + Send + Sync,
{
    fn on_frame(&self, frame: &Frame) {
        if let Some(record) = self.decoder.decode_frame(frame) {
            (self.sink)(record);
        }
    }
}

/// A decoding listener that queues records for a worker thread.
pub fn record_channel(
    decoder: Arc<PacketDecoder>,
) -> (
    DecodingListener<impl Fn(DecodedRecord) + Send + Sync>,
    mpsc::Receiver<DecodedRecord>,
) {
    let (tx, rx) = mpsc::channel();
    let sink = move |record: DecodedRecord| {
        if tx.send(record).is_err() {
            tracing::trace!("record receiver dropped");
        }
    };
    (DecodingListener::new(decoder, sink), rx)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use skylink_frame::ListenerRegistry;
    use skylink_schema::FieldValue;

    use super::*;

    fn decoder() -> Arc<PacketDecoder> {
        Arc::new(
            PacketDecoder::from_json_str(
                r#"[{"name": "beacon", "board": "comms", "address": 100,
                     "data": [{"name": "seq", "type": "uint16"}]}]"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn forwards_known_frames_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = Arc::clone(&seen);
            DecodingListener::new(decoder(), move |record: DecodedRecord| {
                seen.lock().unwrap().push(record);
            })
        };
        let registry = ListenerRegistry::new();
        registry.subscribe(listener);

        registry.dispatch(&Frame::new(100, false, vec![0x2A, 0x00]));
        registry.dispatch(&Frame::new(101, false, vec![0x2A, 0x00]));
        registry.dispatch(&Frame::new(100, false, vec![0x2A]));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].qualified_name(), "comms_beacon");
        assert_eq!(seen[0].get("seq"), Some(FieldValue::Unsigned(42)));
    }

    #[test]
    fn record_channel_queues_records() {
        let (listener, rx) = record_channel(decoder());
        listener.on_frame(&Frame::new(100, true, vec![0x01, 0x01]));

        let record = rx.recv().unwrap();
        assert!(record.rtr);
        assert_eq!(record.get("seq"), Some(FieldValue::Unsigned(0x0101)));
    }
}
