use crate::catalog::{CatalogStore, RefreshOutcome};
use serde::Serialize;
use std::{
    collections::{HashMap, VecDeque},
    process::Stdio,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no image sync command configured (set IMAGE_SYNC_COMMAND)")]
    NotConfigured,
    #[error("job worker not available")]
    QueueClosed,
}

#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    statuses: Arc<Mutex<HashMap<Uuid, JobState>>>,
    command: Option<String>,
}

#[derive(Clone)]
struct Job {
    id: Uuid,
    command: String,
}

#[derive(Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed {
        code: Option<i32>,
        lines: Vec<LogLine>,
        #[serde(skip_serializing_if = "Option::is_none")]
        catalog: Option<RefreshOutcome>,
    },
    Failed {
        error: String,
        lines: Vec<LogLine>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogLine {
    pub kind: Stream,
    pub line: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Out,
    Err,
}

#[derive(Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    #[serde(flatten)]
    pub state: JobState,
}

/// Bounded tail of a process' combined output.
#[derive(Clone, Default)]
struct Tail(Arc<Mutex<VecDeque<LogLine>>>);

impl Tail {
    async fn push(&self, kind: Stream, line: String) {
        let mut lines = self.0.lock().await;
        if lines.len() == MAX_LOG_LINES {
            lines.pop_front();
        }
        lines.push_back(LogLine { kind, line });
    }

    async fn snapshot(&self) -> Vec<LogLine> {
        self.0.lock().await.iter().cloned().collect()
    }
}

impl JobQueue {
    /// Starts the worker. Jobs run one at a time; a successful run refreshes
    /// the catalog so new images show up.
    pub fn spawn(command: Option<String>, catalog: CatalogStore) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(queue_capacity_from_env());
        let statuses = Arc::new(Mutex::new(HashMap::new()));
        let statuses_bg = statuses.clone();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                {
                    let mut guard = statuses_bg.lock().await;
                    guard.insert(job.id, JobState::Running);
                }
                info!(target = "showroom.jobs", job = %job.id, command = %job.command, "image sync started");

                let tail = Tail::default();
                let state = match run_command(&job.command, &tail).await {
                    Ok(code) if code == Some(0) => {
                        let outcome = catalog.refresh().await;
                        JobState::Completed {
                            code,
                            lines: tail.snapshot().await,
                            catalog: Some(outcome),
                        }
                    }
                    Ok(code) => JobState::Completed {
                        code,
                        lines: tail.snapshot().await,
                        catalog: None,
                    },
                    Err(err) => JobState::Failed {
                        error: err.to_string(),
                        lines: tail.snapshot().await,
                    },
                };
                match &state {
                    JobState::Completed { code, .. } => {
                        info!(target = "showroom.jobs", job = %job.id, code = ?code, "image sync finished")
                    }
                    JobState::Failed { error, .. } => {
                        warn!(target = "showroom.jobs", job = %job.id, error = %error, "image sync failed")
                    }
                    _ => {}
                }
                statuses_bg.lock().await.insert(job.id, state);
            }
        });

        (
            Self {
                tx,
                statuses,
                command,
            },
            handle,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.command.is_some()
    }

    pub async fn enqueue_image_sync(&self) -> Result<Uuid, JobError> {
        let command = self.command.clone().ok_or(JobError::NotConfigured)?;
        let id = Uuid::new_v4();
        {
            let mut guard = self.statuses.lock().await;
            guard.insert(id, JobState::Queued);
        }
        if self.tx.send(Job { id, command }).await.is_err() {
            self.statuses.lock().await.remove(&id);
            return Err(JobError::QueueClosed);
        }
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<JobInfo> {
        let guard = self.statuses.lock().await;
        guard.get(&id).cloned().map(|state| JobInfo {
            id: id.to_string(),
            state,
        })
    }
}

/// Runs `command` through the platform shell, collecting output lines.
async fn run_command(command: &str, tail: &Tail) -> std::io::Result<Option<i32>> {
    let mut child = shell(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().map(|out| tokio::spawn(pump(out, Stream::Out, tail.clone())));
    let stderr = child.stderr.take().map(|err| tokio::spawn(pump(err, Stream::Err, tail.clone())));
    let status = child.wait().await?;
    for reader in [stdout, stderr].into_iter().flatten() {
        let _ = reader.await;
    }
    Ok(status.code())
}

async fn pump<R: AsyncRead + Unpin>(reader: R, kind: Stream, tail: Tail) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            tail.push(kind, line).await;
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn queue_capacity_from_env() -> usize {
    std::env::var("QUEUE_CAPACITY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(16)
}
