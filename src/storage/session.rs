//! Fix sessions
//!
//! A session snapshots one source file and accumulates the patch built
//! up over successive AI rounds. The lifecycle is explicit: created by
//! `session new`, updated by each absorbed response, removed by
//! `session delete`. Everything derivable - numbered text, the merged
//! document, the fixed file, the diff - is recomputed on demand and
//! never stored.
//!
//! ID Format: `s-{7-char-hash}` (e.g. `s-7f2b4c1`), hash derived from
//! the session name and creation timestamp.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    diff_report, merge, number_lines, parse_patch, AnchorMap, DiffReport, MergeNote,
    MergeOutcome, SkippedLine,
};

use super::kv::{KvStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Invalid session ID format: expected 's-{{7-char-hash}}', got '{0}'")]
    InvalidId(String),

    #[error("Corrupt session record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Session ID in the format `s-{7-char-hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId {
    hash: String,
}

impl SessionId {
    /// Creates a new session ID from name and timestamp
    pub fn new(name: &str, timestamp: DateTime<Utc>) -> Self {
        let input = format!("{}{}", name, timestamp.timestamp_nanos_opt().unwrap_or(0));
        let hash = blake3::hash(input.as_bytes());
        Self {
            hash: hash.to_hex()[..7].to_string(),
        }
    }

    /// Returns the hash portion of the ID
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s-{}", self.hash)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(hash) = s.strip_prefix("s-") else {
            return Err(SessionError::InvalidId(s.to_string()));
        };
        if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SessionError::InvalidId(s.to_string()));
        }

        Ok(Self {
            hash: hash.to_string(),
        })
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

/// What one absorbed AI response did to a session
#[derive(Debug, Default)]
pub struct AbsorbOutcome {
    /// Lines folded into the cumulative patch
    pub absorbed: usize,

    /// Lines the parser could not place
    pub skipped: Vec<SkippedLine>,

    /// Patch anchors referencing lines outside the original numbering
    pub stale: Vec<MergeNote>,
}

/// One fix session: a source snapshot plus the cumulative patch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// The raw source exactly as uploaded; the base map is derived from
    /// it and immutable for the life of the session
    pub source: String,

    /// Cumulative patch across all absorbed responses, last write wins
    #[serde(default)]
    pub patch: AnchorMap,
}

impl Session {
    /// Creates a new session snapshotting `source`
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        let id = SessionId::new(&name, now);

        Self {
            id,
            name,
            created_at: now,
            updated_at: now,
            source: source.into(),
            patch: AnchorMap::new(),
        }
    }

    /// The dense base map derived from the source snapshot
    pub fn base_map(&self) -> AnchorMap {
        AnchorMap::base_map(&self.source)
    }

    /// The anchored text handed to the AI
    pub fn numbered(&self) -> String {
        number_lines(&self.source)
    }

    /// Parses an AI response and folds its lines into the cumulative
    /// patch; lines from this round supersede earlier rounds
    pub fn absorb(&mut self, response: &str) -> AbsorbOutcome {
        let outcome = parse_patch(response);
        let base = self.base_map();

        let stale = outcome
            .patch
            .iter()
            .filter(|(anchor, _)| !base.contains_base(anchor.base()))
            .map(|(anchor, _)| MergeNote::StaleAnchor {
                anchor: anchor.clone(),
            })
            .collect();

        let absorbed = outcome.patch.len();
        self.patch.overlay(&outcome.patch);
        if absorbed > 0 {
            self.updated_at = Utc::now();
        }

        AbsorbOutcome {
            absorbed,
            skipped: outcome.skipped,
            stale,
        }
    }

    /// Merges the cumulative patch into the base map
    pub fn merged(&self) -> MergeOutcome {
        merge(&self.base_map(), &self.patch)
    }

    /// The fixed, anchor-free deliverable text
    pub fn fixed_text(&self) -> String {
        self.merged().merged.to_plain_text()
    }

    /// Diff of the original source against the patched rendering
    pub fn diff(&self) -> DiffReport {
        diff_report(&self.base_map(), &self.patch)
    }
}

/// One-line view of a session, for listings
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_lines: usize,
    pub patch_lines: usize,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            name: session.name.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            source_lines: session.source.lines().count(),
            patch_lines: session.patch.len(),
        }
    }
}

const INDEX_KEY: &str = "index.json";

fn session_key(id: &SessionId) -> String {
    format!("session-{}.json", id.hash())
}

/// Persists sessions as JSON records through a [`KvStore`]
pub struct SessionStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes a session record, registering it in the index if new
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let record = serde_json::to_vec_pretty(session)?;
        self.store.put(&session_key(&session.id), &record)?;

        let mut index = self.load_index()?;
        let id = session.id.to_string();
        if !index.contains(&id) {
            index.push(id);
            self.save_index(&index)?;
        }
        Ok(())
    }

    /// Loads a session by ID
    pub fn load(&self, id: &SessionId) -> Result<Session, SessionError> {
        let bytes = self
            .store
            .get(&session_key(id))?
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Deletes a session and drops it from the index
    pub fn delete(&self, id: &SessionId) -> Result<bool, SessionError> {
        let existed = self.store.remove(&session_key(id))?;
        if existed {
            let id = id.to_string();
            let mut index = self.load_index()?;
            index.retain(|entry| entry != &id);
            self.save_index(&index)?;
        }
        Ok(existed)
    }

    /// Lists summaries of all sessions, oldest first
    pub fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let mut summaries = Vec::new();
        for entry in self.load_index()? {
            let Ok(id) = entry.parse::<SessionId>() else {
                continue;
            };
            match self.load(&id) {
                Ok(session) => summaries.push(SessionSummary::from(&session)),
                // A record deleted behind the index's back is skipped.
                Err(SessionError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(summaries)
    }

    fn load_index(&self) -> Result<Vec<String>, SessionError> {
        match self.store.get(INDEX_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_index(&self, index: &[String]) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec(index)?;
        Ok(self.store.put(INDEX_KEY, &bytes)?)
    }
}
