/// Bounded hand-off between the capture callback and a blocking sink.
///
/// `report` copies the fields into a fixed-capacity record and `try_send`s
/// it to a flush thread; it never blocks and never allocates. When the
/// queue is full the record is dropped and counted. The flush thread
/// surfaces the count as `QueueOverflow` ahead of the next message it
/// delivers.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use heapless::{String, Vec};

use crate::report::{CaptureError, Field, FieldValue, Reporter, MAX_FIELDS, PAYLOAD_PREVIEW_LEN};

/// Queue depth used by the firmware
pub const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Longest string value carried through the queue
const MAX_STR_LEN: usize = 24;

const FLUSH_STACK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
enum OwnedValue {
    Int(i64),
    Str(String<MAX_STR_LEN>),
    Bytes(Vec<u8, PAYLOAD_PREVIEW_LEN>),
}

#[derive(Debug, Clone)]
struct OwnedField {
    label: &'static str,
    value: OwnedValue,
}

impl OwnedField {
    fn copy_of(field: &Field<'_>) -> Self {
        let value = match field.value {
            FieldValue::Int(v) => OwnedValue::Int(v),
            FieldValue::Str(s) => {
                let mut out = String::new();
                for c in s.chars() {
                    if out.push(c).is_err() {
                        break;
                    }
                }
                OwnedValue::Str(out)
            }
            FieldValue::Bytes(b) => {
                let n = b.len().min(PAYLOAD_PREVIEW_LEN);
                let mut out = Vec::new();
                let _ = out.extend_from_slice(&b[..n]);
                OwnedValue::Bytes(out)
            }
        };
        Self {
            label: field.label,
            value,
        }
    }

    fn as_field(&self) -> Field<'_> {
        match &self.value {
            OwnedValue::Int(v) => Field::int(self.label, *v),
            OwnedValue::Str(s) => Field::str(self.label, s.as_str()),
            OwnedValue::Bytes(b) => Field::bytes(self.label, b.as_slice()),
        }
    }
}

type OwnedReport = Vec<OwnedField, MAX_FIELDS>;

enum Outbound {
    Report(OwnedReport),
    Error(CaptureError),
    Flush(SyncSender<()>),
}

/// [`Reporter`] front-end that queues for a sink running on its own thread.
pub struct QueuedReporter {
    tx: SyncSender<Outbound>,
    dropped: Arc<AtomicU32>,
}

impl QueuedReporter {
    /// Spawn the flush thread that drains into `sink`. A depth of zero is
    /// treated as one.
    pub fn spawn<R: Reporter + 'static>(sink: R, depth: usize) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel(depth.max(1));
        let dropped = Arc::new(AtomicU32::new(0));
        let thread_dropped = dropped.clone();
        thread::Builder::new()
            .name("report".into())
            .stack_size(FLUSH_STACK_SIZE)
            .spawn(move || flush_thread(rx, sink, thread_dropped))?;
        Ok(Self { tx, dropped })
    }

    fn enqueue(&self, msg: Outbound) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            // Flush thread gone; nothing left to deliver to
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Reporter for QueuedReporter {
    fn report(&self, fields: &[Field<'_>]) {
        let mut record = OwnedReport::new();
        for field in fields {
            let _ = record.push(OwnedField::copy_of(field));
        }
        self.enqueue(Outbound::Report(record));
    }

    fn report_error(&self, error: &CaptureError) {
        self.enqueue(Outbound::Error(*error));
    }

    fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.tx.send(Outbound::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

fn flush_thread<R: Reporter>(rx: Receiver<Outbound>, sink: R, dropped: Arc<AtomicU32>) {
    for msg in rx {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            sink.report_error(&CaptureError::QueueOverflow { dropped: lost });
        }

        match msg {
            Outbound::Report(record) => {
                let fields: Vec<Field<'_>, MAX_FIELDS> =
                    record.iter().map(OwnedField::as_field).collect();
                sink.report(&fields);
            }
            Outbound::Error(error) => sink.report_error(&error),
            Outbound::Flush(ack) => {
                sink.flush();
                let _ = ack.send(());
            }
        }
    }
    log::debug!("Report queue closed");
}
