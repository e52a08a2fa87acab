//! Identity types for capture sessions and media streams
//!
//! A capture generation is bumped every time a new capture session is
//! created. Anything produced against an older generation (a late detection
//! sample, a stream that finished acquiring after a revocation) is stale and
//! must be discarded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Capture session generation - monotonically increasing per supervisor
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SessionGeneration(pub u64);

impl SessionGeneration {
    pub const ZERO: SessionGeneration = SessionGeneration(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        SessionGeneration(value)
    }

    /// The generation that follows this one
    #[inline]
    pub fn next(self) -> Self {
        SessionGeneration(self.0.wrapping_add(1))
    }

    /// Is `other` newer than this generation?
    #[inline]
    pub fn is_superseded_by(self, other: SessionGeneration) -> bool {
        other.0 > self.0
    }
}

impl fmt::Debug for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen({})", self.0)
    }
}

impl fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-assigned identifier of a live media stream
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        StreamId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which tracks a media acquisition must deliver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    /// Video only - the supervised stream
    pub const VIDEO: MediaConstraints = MediaConstraints {
        video: true,
        audio: false,
    };

    /// Audio only - the one-off microphone request
    pub const AUDIO: MediaConstraints = MediaConstraints {
        video: false,
        audio: true,
    };

    /// Does this request any track at all?
    pub fn is_empty(&self) -> bool {
        !self.video && !self.audio
    }

    /// Would a stream acquired with `self` satisfy `other`?
    pub fn satisfies(&self, other: &MediaConstraints) -> bool {
        (self.video || !other.video) && (self.audio || !other.audio)
    }
}
