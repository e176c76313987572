//! Append-only audit log for gateway activity.
//!
//! One JSON object per line. With the hash chain enabled, every event
//! carries `hash_prev` (the previous event's `hash_self`) and `hash_self`
//! (SHA-256 of the event's canonical JSON without `hash_self`), so any edit,
//! insertion or deletion is detected by [`verify_hash_chain`].
//!
//! Reopening an existing log resumes the chain where it ended.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Namespace for deterministic event ids.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d74_6761_7564_6974_8000_0000_0000_0001);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    /// Writer instance that appended the event.
    pub session_id: Uuid,
    /// Zero-based position in the log.
    pub seq: u64,
    pub ts_utc: DateTime<Utc>,
    /// `orders` or `webhook`.
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

pub struct AuditWriter {
    path: PathBuf,
    file: File,
    hash_chain: bool,
    session_id: Uuid,
    /// Where the next event goes.
    tail: ChainTail,
}

/// End of a log: the next sequence number and the hash to link to.
#[derive(Debug, Default)]
struct ChainTail {
    seq: u64,
    hash: Option<String>,
}

impl AuditWriter {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create audit dir {}", dir.display()))?;
        }

        let mut tail = match fs::read_to_string(&path) {
            Ok(existing) => scan_tail(&existing)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ChainTail::default(),
            Err(e) => return Err(e).with_context(|| format!("read audit log {}", path.display())),
        };
        if !hash_chain {
            tail.hash = None;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open audit log {}", path.display()))?;

        Ok(Self {
            path,
            file,
            hash_chain,
            session_id: Uuid::new_v4(),
            tail,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifies this writer instance (one per daemon process).
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.tail.hash.as_deref()
    }

    /// Number of events in the log.
    pub fn seq(&self) -> u64 {
        self.tail.seq
    }

    /// Append one event as a single write.
    pub fn append(&mut self, topic: &str, event_type: &str, payload: Value) -> Result<AuditEvent> {
        let mut ev = AuditEvent {
            event_id: event_id(self.tail.hash.as_deref(), self.tail.seq, &payload)?,
            session_id: self.session_id,
            seq: self.tail.seq,
            ts_utc: Utc::now(),
            topic: topic.to_string(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };
        if self.hash_chain {
            ev.hash_prev = self.tail.hash.clone();
            ev.hash_self = Some(compute_event_hash(&ev)?);
        }

        let mut line = canonical_json(&ev)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .with_context(|| format!("append to audit log {}", self.path.display()))?;

        self.tail.seq += 1;
        if self.hash_chain {
            self.tail.hash = ev.hash_self.clone();
        }
        Ok(ev)
    }
}

/// UUIDv5 over chain position and payload.
fn event_id(prev_hash: Option<&str>, seq: u64, payload: &Value) -> Result<Uuid> {
    let material = format!("{}|{seq}|{}", prev_hash.unwrap_or("-"), canonical_json(payload)?);
    Ok(Uuid::new_v5(&EVENT_ID_NAMESPACE, material.as_bytes()))
}

/// Non-blank lines of a log, parsed, with 1-based line numbers.
fn parse_events(content: &str) -> impl Iterator<Item = Result<(usize, AuditEvent)>> + '_ {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line.trim())
                .map(|ev| (i + 1, ev))
                .with_context(|| format!("parse audit event at line {}", i + 1))
        })
}

fn scan_tail(content: &str) -> Result<ChainTail> {
    let mut tail = ChainTail::default();
    for parsed in parse_events(content) {
        let (_, ev) = parsed?;
        tail.seq += 1;
        tail.hash = ev.hash_self;
    }
    Ok(tail)
}

/// Compact JSON with object keys in sorted order. `serde_json::Map` is
/// key-ordered, so a round trip through `Value` sorts every level.
fn canonical_json<T: Serialize>(v: &T) -> Result<String> {
    let value = serde_json::to_value(v).context("serialize audit event")?;
    serde_json::to_string(&value).context("encode audit event")
}

/// SHA-256 of the event's canonical JSON with `hash_self` cleared.
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let unsealed = AuditEvent {
        hash_self: None,
        ..ev.clone()
    };
    Ok(hex::encode(Sha256::digest(canonical_json(&unsealed)?.as_bytes())))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    /// First line (1-based) where the chain does not hold.
    Broken { line: usize, reason: String },
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("read audit log {}", path.display()))?;
    verify_hash_chain_str(&content)
}

/// [`verify_hash_chain`] over in-memory JSONL.
///
/// Checks, per event: `seq` follows the previous event, `hash_prev` links to
/// the previous `hash_self`, and `hash_self` (when present) matches the
/// recomputed hash.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut expected = ChainTail::default();

    for parsed in parse_events(content) {
        let (line, ev) = parsed?;

        let broken = |reason: String| Ok(VerifyResult::Broken { line, reason });
        if ev.seq != expected.seq {
            return broken(format!("seq gap: expected {}, got {}", expected.seq, ev.seq));
        }
        if ev.hash_prev != expected.hash {
            return broken(format!(
                "hash_prev mismatch: expected {:?}, got {:?}",
                expected.hash, ev.hash_prev
            ));
        }
        if let Some(claimed) = ev.hash_self.as_deref() {
            let recomputed = compute_event_hash(&ev)?;
            if claimed != recomputed {
                return broken(format!(
                    "hash_self mismatch: claimed {claimed}, recomputed {recomputed}"
                ));
            }
        }

        expected.seq += 1;
        expected.hash = ev.hash_self;
    }

    Ok(VerifyResult::Valid {
        lines: expected.seq as usize,
    })
}
