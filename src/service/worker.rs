//! Dedicated training thread and the shared model slot it publishes into.
//!
//! Jobs run one at a time in submission order. A job trains a complete new
//! artifact, swaps it into the slot, then persists it; readers holding the
//! previous snapshot keep using it undisturbed.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use crate::corpus::TrainingExample;
use crate::error::IntentError;
use crate::ml::{ClassificationPipeline, TrainingResult};
use crate::persistence::{ModelArtifact, ModelMetrics, Repository};

const TRAINER_THREAD_NAME: &str = "intentwise-trainer";

/// The live artifact. Readers clone the `Arc` and release the lock at once.
#[derive(Debug, Default)]
pub(crate) struct ModelSlot {
    current: RwLock<Option<Arc<ModelArtifact>>>,
}

impl ModelSlot {
    pub(crate) fn new(initial: Option<ModelArtifact>) -> Self {
        Self {
            current: RwLock::new(initial.map(Arc::new)),
        }
    }

    pub(crate) fn snapshot(&self) -> Option<Arc<ModelArtifact>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn publish(&self, artifact: Arc<ModelArtifact>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(artifact);
    }
}

/// Result of one completed training job.
#[derive(Debug, Clone)]
pub(crate) struct TrainReport {
    pub result: TrainingResult,
    pub artifact: Arc<ModelArtifact>,
    /// Artifact and metrics reached the store.
    pub persisted: bool,
}

struct TrainJob {
    corpus: Vec<TrainingExample>,
    reply: Sender<Result<TrainReport, IntentError>>,
}

struct TrainerContext {
    pipeline: ClassificationPipeline,
    repository: Repository,
    slot: Arc<ModelSlot>,
}

/// Handle to the training thread.
pub(crate) struct Trainer {
    sender: Mutex<Option<Sender<TrainJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Trainer {
    pub(crate) fn spawn(
        pipeline: ClassificationPipeline,
        repository: Repository,
        slot: Arc<ModelSlot>,
    ) -> Result<Self, IntentError> {
        let (sender, receiver) = mpsc::channel::<TrainJob>();
        let context = TrainerContext {
            pipeline,
            repository,
            slot,
        };
        let handle = thread::Builder::new()
            .name(TRAINER_THREAD_NAME.to_string())
            .spawn(move || run(context, receiver))
            .map_err(IntentError::WorkerSpawn)?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue a job and block until it finishes.
    pub(crate) fn train(&self, corpus: Vec<TrainingExample>) -> Result<TrainReport, IntentError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| IntentError::WorkerUnavailable)?
            .clone()
            .ok_or(IntentError::WorkerUnavailable)?;
        let (reply, response) = mpsc::channel();
        sender
            .send(TrainJob { corpus, reply })
            .map_err(|_| IntentError::WorkerUnavailable)?;
        response.recv().map_err(|_| IntentError::WorkerUnavailable)?
    }

    /// Stop accepting jobs, let queued ones finish, and join the thread.
    pub(crate) fn stop(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let handle = self.handle.lock().ok().and_then(|mut handle| handle.take());
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::warn!("Training thread panicked before shutdown");
        }
    }
}

impl Drop for Trainer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(context: TrainerContext, receiver: Receiver<TrainJob>) {
    tracing::debug!("Training thread started");
    for job in receiver {
        let outcome = execute(&context, &job.corpus);
        if job.reply.send(outcome).is_err() {
            tracing::debug!("Training caller went away before the result arrived");
        }
    }
    tracing::debug!("Training thread stopped");
}

fn execute(context: &TrainerContext, corpus: &[TrainingExample]) -> Result<TrainReport, IntentError> {
    tracing::info!(examples = corpus.len(), "Training started");
    let (fitted, result) = context.pipeline.train(corpus)?;
    let trained_at = time::OffsetDateTime::now_utc().unix_timestamp();
    let artifact = Arc::new(ModelArtifact::new(fitted, &result, trained_at));
    context.slot.publish(Arc::clone(&artifact));
    tracing::info!(
        id = %artifact.id,
        accuracy = result.accuracy,
        samples = result.sample_count,
        "Published model artifact"
    );

    let persisted = match persist(&context.repository, &artifact) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("Model trained but not saved; keeping it in memory only: {err}");
            false
        }
    };
    Ok(TrainReport {
        result,
        artifact,
        persisted,
    })
}

fn persist(repository: &Repository, artifact: &ModelArtifact) -> Result<(), IntentError> {
    repository.save_artifact(artifact)?;
    repository.save_metrics(&ModelMetrics::from_artifact(artifact))?;
    Ok(())
}
