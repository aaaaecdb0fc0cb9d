//! Background HTTP calls reported back to the controller over a channel.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use crate::client::{BackendClient, BackendHealth, ClientError, SamplePayload};

pub(crate) enum JobMessage {
    HealthChecked(BackendHealth),
    SampleFetched(Result<SamplePayload, ClientError>),
    Predicted(Result<i64, ClientError>),
}

/// Messages are tagged with the backend generation they were started under.
type Tagged = (u64, JobMessage);

/// At most one job of each kind runs at a time.
pub(crate) struct ControllerJobs {
    message_tx: Sender<Tagged>,
    message_rx: Receiver<Tagged>,
    generation: u64,
    health_in_progress: bool,
    sample_in_progress: bool,
    predict_in_progress: bool,
}

impl ControllerJobs {
    pub(crate) fn new() -> Self {
        let (message_tx, message_rx) = mpsc::channel();
        Self {
            message_tx,
            message_rx,
            generation: 0,
            health_in_progress: false,
            sample_in_progress: false,
            predict_in_progress: false,
        }
    }

    /// Next result from the current backend; results from earlier backends are discarded.
    pub(crate) fn try_recv_message(&self) -> Result<JobMessage, TryRecvError> {
        loop {
            let (generation, message) = self.message_rx.try_recv()?;
            if generation == self.generation {
                return Ok(message);
            }
            tracing::debug!("Dropping result from previous backend (generation {generation})");
        }
    }

    /// Forget in-flight jobs so the next ones run against a new backend.
    pub(crate) fn switch_backend(&mut self) {
        self.generation += 1;
        self.health_in_progress = false;
        self.sample_in_progress = false;
        self.predict_in_progress = false;
    }

    pub(crate) fn any_in_progress(&self) -> bool {
        self.health_in_progress || self.sample_in_progress || self.predict_in_progress
    }

    /// Returns false when a health check is already running.
    pub(crate) fn begin_health_check(&mut self, client: BackendClient) -> bool {
        if self.health_in_progress {
            return false;
        }
        self.health_in_progress = true;
        self.spawn(move || JobMessage::HealthChecked(client.check_health()));
        true
    }

    pub(crate) fn clear_health_check(&mut self) {
        self.health_in_progress = false;
    }

    pub(crate) fn begin_sample_fetch(&mut self, client: BackendClient) -> bool {
        if self.sample_in_progress {
            return false;
        }
        self.sample_in_progress = true;
        self.spawn(move || JobMessage::SampleFetched(client.random_sample()));
        true
    }

    pub(crate) fn clear_sample_fetch(&mut self) {
        self.sample_in_progress = false;
    }

    pub(crate) fn begin_predict(&mut self, client: BackendClient, input: serde_json::Value) -> bool {
        if self.predict_in_progress {
            return false;
        }
        self.predict_in_progress = true;
        self.spawn(move || JobMessage::Predicted(client.predict_value(&input)));
        true
    }

    pub(crate) fn clear_predict(&mut self) {
        self.predict_in_progress = false;
    }

    fn spawn(&self, job: impl FnOnce() -> JobMessage + Send + 'static) {
        let tx = self.message_tx.clone();
        let generation = self.generation;
        thread::spawn(move || {
            let _ = tx.send((generation, job()));
        });
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a result as if a job started under `generation` had finished.
    #[cfg(test)]
    pub(crate) fn deliver(&self, generation: u64, message: JobMessage) {
        let _ = self.message_tx.send((generation, message));
    }
}
