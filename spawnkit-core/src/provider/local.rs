//! Provider reading an OpenClaw-style state directory on the local machine.
//!
//! Layout under the root:
//!
//! ```text
//! agents/<agent>/sessions/sessions.json   list, or map keyed by session key
//! agents.json                             optional richer agent list
//! cron/jobs.json                          list, or {"jobs": [...]}
//! workspace/MEMORY.md
//! workspace/TODO.md
//! workspace/memory/*                      daily notes, listed with size/mtime
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{RawPayload, Resource, TelemetryProvider};
use crate::error::{Error, Result};

/// Default per-resource read timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Queued out-of-band payloads before pushes start failing
const PUSH_CAPACITY: usize = 16;

/// Sender side of the provider's out-of-band update channel.
#[derive(Debug, Clone)]
pub struct PushHandle {
    tx: mpsc::Sender<RawPayload>,
}

impl PushHandle {
    /// Queue a payload, waiting for space.
    pub async fn push(&self, raw: RawPayload) -> Result<()> {
        self.tx
            .send(raw)
            .await
            .map_err(|_| Error::Other("update channel closed".into()))
    }

    /// Queue a payload without waiting; fails when the queue is full.
    pub fn try_push(&self, raw: RawPayload) -> Result<()> {
        self.tx
            .try_send(raw)
            .map_err(|e| Error::Other(format!("update not queued: {e}")))
    }
}

pub struct LocalProvider {
    root: PathBuf,
    timeout: Duration,
    push_tx: mpsc::Sender<RawPayload>,
    push_rx: Mutex<Option<mpsc::Receiver<RawPayload>>>,
}

impl LocalProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (push_tx, push_rx) = mpsc::channel(PUSH_CAPACITY);
        Self {
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
            push_tx,
            push_rx: Mutex::new(Some(push_rx)),
        }
    }

    /// `$OPENCLAW_HOME`, falling back to `~/.openclaw`.
    pub fn default_root() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("OPENCLAW_HOME") {
            if !home.trim().is_empty() {
                return Some(PathBuf::from(home));
            }
        }
        dirs::home_dir().map(|h| h.join(".openclaw"))
    }

    /// Provider rooted at [`Self::default_root`].
    pub fn discover() -> Result<Self> {
        Self::default_root()
            .map(Self::new)
            .ok_or_else(|| Error::Other("No home directory".into()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle through which in-process collaborators inject updates.
    pub fn push_handle(&self) -> PushHandle {
        PushHandle {
            tx: self.push_tx.clone(),
        }
    }

    async fn bounded<T>(&self, resource: Resource, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            Error::Other(format!(
                "reading {} timed out after {}ms",
                resource,
                self.timeout.as_millis()
            ))
        })?
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource readers
    // ─────────────────────────────────────────────────────────────────────────

    async fn read_sessions(&self) -> Result<Value> {
        let agents_dir = self.root.join("agents");
        let mut entries = tokio::fs::read_dir(&agents_dir).await?;
        let mut sessions = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path().join("sessions").join("sessions.json");
            let value = match read_json(&path).await {
                Ok(value) => value,
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable sessions file");
                    continue;
                }
            };
            match value {
                Value::Array(items) => sessions.extend(items),
                Value::Object(map) => sessions.extend(flatten_keyed(map)),
                other => sessions.push(other),
            }
        }

        debug!(count = sessions.len(), "Read local sessions");
        Ok(Value::Array(sessions))
    }

    async fn read_crons(&self) -> Result<Value> {
        read_json(&self.root.join("cron").join("jobs.json")).await
    }

    async fn read_agents(&self) -> Result<Value> {
        match read_json(&self.root.join("agents.json")).await {
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Null),
            other => other,
        }
    }

    async fn read_memory(&self) -> Result<Value> {
        let workspace = self.root.join("workspace");
        if !tokio::fs::metadata(&workspace).await?.is_dir() {
            return Err(Error::Other(format!("{} is not a directory", workspace.display())));
        }

        let main = read_optional_text(&workspace.join("MEMORY.md")).await?;
        let todo = read_optional_text(&workspace.join("TODO.md")).await?;

        let mut files = Vec::new();
        match tokio::fs::read_dir(workspace.join("memory")).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let meta = entry.metadata().await?;
                    if !meta.is_file() {
                        continue;
                    }
                    let modified = meta
                        .modified()
                        .ok()
                        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis());
                    files.push(json!({
                        "name": entry.file_name().to_string_lossy(),
                        "size": meta.len(),
                        "modifiedAtMs": modified,
                    }));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "mainDocument": main,
            "todoDocument": todo,
            "files": files,
        }))
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn read_optional_text(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// `{"<key>": {...}}` → `[{"key": "<key>", ...}]`
fn flatten_keyed(map: Map<String, Value>) -> impl Iterator<Item = Value> {
    map.into_iter().map(|(key, value)| match value {
        Value::Object(mut entry) => {
            entry.entry("key").or_insert(Value::String(key));
            Value::Object(entry)
        }
        other => other,
    })
}

#[async_trait]
impl TelemetryProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_all(&self) -> Result<RawPayload> {
        let (sessions, crons, memory, agents) = tokio::join!(
            self.bounded(Resource::Sessions, self.read_sessions()),
            self.bounded(Resource::Crons, self.read_crons()),
            self.bounded(Resource::Memory, self.read_memory()),
            self.bounded(Resource::Agents, self.read_agents()),
        );

        let mut raw = RawPayload::default();
        raw.set(Resource::Sessions, sessions);
        raw.set(Resource::Crons, crons);
        raw.set(Resource::Memory, memory);
        raw.set(Resource::Agents, agents);

        if raw.is_total_failure() {
            return Err(Error::unavailable(self.name(), raw.soft_error_summary()));
        }
        if !raw.soft_errors.is_empty() {
            debug!(errors = %raw.soft_error_summary(), "Partial local fetch");
        }
        Ok(raw)
    }

    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn take_updates(&self) -> Option<mpsc::Receiver<RawPayload>> {
        self.push_rx.lock().ok()?.take()
    }
}
