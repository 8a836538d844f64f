//! Download plans for the audio and video tracks of one video.
//!
//! A [`ResourceSpec`] pairs an ordered [`SegmentSource`] with the file the
//! segments are appended to; a [`MediaSpec`] holds one for each track.
//! Sources are pull-based and receive the content length observed for the
//! previous segment on every call, so a source whose total size is unknown
//! can decide on its own when the resource is exhausted.

use std::fmt;
use std::path::PathBuf;

/// Kind of media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Audio track.
    Audio,
    /// Video track.
    Video,
}

impl MediaKind {
    /// Lower-case name as used in manifests and MIME types.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Classifies a MIME type such as `video/mp4` by its top-level type.
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let top_level = mime_type.trim().split('/').next()?.to_ascii_lowercase();
        match top_level.as_str() {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fetchable piece of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Signed URL of the segment.
    pub url: String,
    /// Size the segment should have if the resource is not yet exhausted.
    ///
    /// `None` accepts any positive length.
    pub expected_size: Option<u64>,
}

impl Segment {
    /// Segment of unknown size.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_size: None,
        }
    }

    /// Segment that should carry exactly `expected_size` bytes unless it is the last.
    #[must_use]
    pub fn sized(url: impl Into<String>, expected_size: u64) -> Self {
        Self {
            url: url.into(),
            expected_size: Some(expected_size),
        }
    }
}

/// Ordered, possibly lazy supply of segments.
pub trait SegmentSource: Send {
    /// Returns the next segment, or `None` once the resource is exhausted.
    ///
    /// `previous` is the content length observed for the segment returned by
    /// the prior call (`None` on the first call).
    fn next_segment(&mut self, previous: Option<u64>) -> Option<Segment>;
}

/// A fixed list of segments, yielded in order.
#[derive(Debug, Clone, Default)]
pub struct SegmentList {
    segments: std::collections::VecDeque<Segment>,
}

impl SegmentList {
    /// Creates a source over `segments`.
    #[must_use]
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Number of segments not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.segments.len()
    }
}

impl SegmentSource for SegmentList {
    fn next_segment(&mut self, _previous: Option<u64>) -> Option<Segment> {
        self.segments.pop_front()
    }
}

/// Download plan for one track.
pub struct ResourceSpec {
    /// Segments to fetch, in order.
    pub source: Box<dyn SegmentSource>,
    /// File the segments are appended to.
    pub target: PathBuf,
}

impl ResourceSpec {
    /// Creates a plan appending `source` to `target`.
    pub fn new(source: impl SegmentSource + 'static, target: impl Into<PathBuf>) -> Self {
        Self {
            source: Box::new(source),
            target: target.into(),
        }
    }
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Paired download plans for the audio and video tracks of one video.
#[derive(Debug)]
pub struct MediaSpec {
    /// Audio track plan.
    pub audio: ResourceSpec,
    /// Video track plan.
    pub video: ResourceSpec,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_mime_type() {
        assert_eq!(MediaKind::from_mime_type("audio/mp4"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime_type("Video/webm"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime_type("application/dash+xml"), None);
        assert_eq!(MediaKind::from_mime_type(""), None);
    }

    #[test]
    fn test_segment_list_yields_in_order_then_ends() {
        let mut list = SegmentList::new([Segment::new("a"), Segment::sized("b", 10)]);
        assert_eq!(list.remaining(), 2);
        assert_eq!(list.next_segment(None).unwrap().url, "a");
        assert_eq!(list.next_segment(Some(5)).unwrap().expected_size, Some(10));
        assert!(list.next_segment(Some(10)).is_none());
    }
}
