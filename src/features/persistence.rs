use crate::features::calculator::RecordSink;
use crate::features::diagnostics::Diagnostics;
use crate::features::history_store::{CalculationRecord, HistoryStore};
use std::io;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

enum PersistJob {
    Save(CalculationRecord),
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Background writer for the calculation history.
///
/// Owns the only thread that writes evaluations to the store. Dropping the
/// worker drains pending jobs and joins the thread.
pub struct PersistenceWorker {
    sender: mpsc::Sender<PersistJob>,
    handle: Option<JoinHandle<()>>,
}

impl PersistenceWorker {
    pub fn spawn<S>(store: S, diagnostics: Arc<Diagnostics>) -> io::Result<Self>
    where
        S: HistoryStore + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PersistJob>();
        let handle = thread::Builder::new()
            .name("ganymede-persist".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    match job {
                        PersistJob::Save(record) => {
                            if let Err(err) = store.save(&record) {
                                log::warn!("history save failed for {}: {err}", record.id);
                                diagnostics.record_error("persistence", &format!("save_failed:{err}"));
                            }
                        }
                        PersistJob::Flush(ack) => {
                            let _ = ack.send(());
                        }
                        PersistJob::Shutdown => break,
                    }
                }
                log::debug!("persistence worker stopped");
            })?;

        Ok(Self {
            sender: tx,
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> PersistenceHandle {
        PersistenceHandle {
            sender: self.sender.clone(),
        }
    }

    /// Blocks until every job queued before this call has been processed.
    /// Returns false if the worker is gone or did not answer in time.
    pub fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.sender.send(PersistJob::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv_timeout(FLUSH_TIMEOUT).is_ok()
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(PersistJob::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("persistence worker panicked");
            }
        }
    }
}

/// Cheap sender half handed to the engine.
#[derive(Clone)]
pub struct PersistenceHandle {
    sender: mpsc::Sender<PersistJob>,
}

impl RecordSink for PersistenceHandle {
    fn save(&self, record: CalculationRecord) {
        if let Err(err) = self.sender.send(PersistJob::Save(record)) {
            log::warn!("persistence worker unavailable: {err}");
        }
    }
}
