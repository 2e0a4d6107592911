//! SessionId - Cheap-to-clone activity session identifier
//!
//! Uses Arc<str> internally so live snapshots, track updates and the summary
//! can all carry it without allocating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Session identifier with cheap cloning.
///
/// # Examples
/// ```
/// use contracts::SessionId;
///
/// let id: SessionId = "act-1".into();
/// let id2 = id.clone();
/// assert_eq!(id, id2);
/// assert_eq!(id.as_str(), "act-1");
/// ```
#[derive(Clone, Default)]
pub struct SessionId(Arc<str>);

impl SessionId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Build an identifier from the session start time.
    ///
    /// A process-wide sequence number keeps ids unique when two sessions
    /// start within the same millisecond.
    pub fn generate(started_at: DateTime<Utc>) -> Self {
        Self::format_id(started_at, SEQUENCE.fetch_add(1, Ordering::Relaxed))
    }

    // the sequence is never truncated; `{:04}` only pads
    fn format_id(started_at: DateTime<Utc>, seq: u32) -> Self {
        Self::from(format!(
            "act-{}-{:04}",
            started_at.format("%Y%m%dT%H%M%S%3f"),
            seq
        ))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SessionId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SessionId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({:?})", self.0)
    }
}

impl PartialEq for SessionId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SessionId {}

impl PartialEq<&str> for SessionId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for SessionId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clone_is_cheap() {
        let id1: SessionId = "act-1".into();
        let id2 = id1.clone();
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_generate_is_unique() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap();
        let a = SessionId::generate(at);
        let b = SessionId::generate(at);

        assert!(a.starts_with("act-20260301T073000000-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequence_does_not_wrap() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap();
        let early = SessionId::format_id(at, 7);
        let late = SessionId::format_id(at, 10_007);

        assert_eq!(early, "act-20260301T073000000-0007");
        assert_eq!(late, "act-20260301T073000000-10007");
        assert_ne!(early, late);
    }

    #[test]
    fn test_serde() {
        let id: SessionId = "act-7".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"act-7\"");

        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
