//! JsonFileQueueStore - 永続キュー（本番用）
//!
//! # 保存形式
//! - `<storage_dir>/<namespace>.queue.json` に 1 ファイル
//! - 書き込みは一時ファイル + rename（途中でクラッシュしても壊れない）
//! - 変更のたびにファイル全体を書き直す（キューは小さい前提）

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ledger::Ledger;
use crate::config::validate_namespace;
use crate::domain::errors::QueueResult;
use crate::domain::{QueueError, QueueRecord, RecordId, RecordKind};
use crate::ports::{Clock, IdGenerator, QueueStore, SystemClock, UlidGenerator};

const FORMAT_VERSION: u32 = 1;

/// On-disk document.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedQueue {
    version: u32,
    namespace: String,
    records: Ledger,
}

pub struct JsonFileQueueStore {
    path: PathBuf,
    namespace: String,
    ledger: Mutex<Ledger>,
    clock: Arc<dyn Clock>,
    ids: UlidGenerator<Arc<dyn Clock>>,
}

impl JsonFileQueueStore {
    /// Open (or create) the queue for `namespace` under `dir`, reloading any
    /// records left over from a previous run.
    pub async fn open(dir: impl AsRef<Path>, namespace: &str) -> QueueResult<Self> {
        Self::open_with_clock(dir, namespace, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        dir: impl AsRef<Path>,
        namespace: &str,
        clock: Arc<dyn Clock>,
    ) -> QueueResult<Self> {
        validate_namespace(namespace)
            .map_err(|e| QueueError::storage_with("opening queue", e))?;

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            QueueError::storage_with(format!("creating {}", dir.display()), e)
        })?;

        let path = dir.join(format!("{namespace}.queue.json"));
        let ledger = load_ledger(&path, namespace).await?;
        info!(
            path = %path.display(),
            pending = ledger.len(),
            "opened offline queue"
        );

        Ok(Self {
            path,
            namespace: namespace.to_string(),
            ledger: Mutex::new(ledger),
            ids: UlidGenerator::new(Arc::clone(&clock)),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, ledger: &Ledger) -> QueueResult<()> {
        let doc = PersistedQueue {
            version: FORMAT_VERSION,
            namespace: self.namespace.clone(),
            records: ledger.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| QueueError::storage_with("encoding queue", e))?;

        write_atomically(&self.path, &bytes).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to write queue file");
            QueueError::storage_with(format!("writing {}", self.path.display()), e)
        })
    }
}

#[async_trait]
impl QueueStore for JsonFileQueueStore {
    async fn enqueue(
        &self,
        kind: RecordKind,
        payload: serde_json::Value,
    ) -> QueueResult<RecordId> {
        let mut ledger = self.ledger.lock().await;
        let id = self.ids.generate_record_id();

        // 書き込みに成功してから反映する
        let mut next = ledger.clone();
        next.push(QueueRecord::new(id, kind, payload, self.clock.now()));
        self.persist(&next).await?;
        *ledger = next;

        debug!(record_id = %id, depth = ledger.len(), "record enqueued");
        Ok(id)
    }

    async fn count(&self) -> QueueResult<usize> {
        Ok(self.ledger.lock().await.len())
    }

    async fn list(&self) -> QueueResult<Vec<QueueRecord>> {
        Ok(self.ledger.lock().await.records().to_vec())
    }

    async fn get(&self, id: RecordId) -> QueueResult<Option<QueueRecord>> {
        Ok(self.ledger.lock().await.get(id).cloned())
    }

    async fn remove(&self, id: RecordId) -> QueueResult<()> {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        if next.remove(id) {
            self.persist(&next).await?;
            *ledger = next;
        }
        Ok(())
    }

    async fn update_retry_count(&self, id: RecordId, retry_count: u32) -> QueueResult<()> {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        if next.set_retry_count(id, retry_count) {
            self.persist(&next).await?;
            *ledger = next;
        }
        Ok(())
    }
}

async fn load_ledger(path: &Path, namespace: &str) -> QueueResult<Ledger> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Ledger::default()),
        Err(e) => {
            return Err(QueueError::storage_with(
                format!("reading {}", path.display()),
                e,
            ));
        }
    };
    if bytes.is_empty() {
        return Ok(Ledger::default());
    }

    let doc: PersistedQueue =
        serde_json::from_slice(&bytes).map_err(|source| QueueError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    if doc.namespace != namespace {
        warn!(
            path = %path.display(),
            expected = namespace,
            found = %doc.namespace,
            "queue file namespace mismatch; loading anyway"
        );
    }
    Ok(doc.records)
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    if let Err(e) = write_and_rename(&tmp_path, path, bytes).await {
        // 書きかけの一時ファイルは残さない
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    // rename 済みなので失敗しても内容は見えている。警告だけ出す
    if let Err(e) = sync_parent_dir(path).await {
        warn!(path = %path.display(), error = %e, "could not sync queue directory");
    }
    Ok(())
}

async fn write_and_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp_path, path).await
}

/// Make the rename itself durable.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
