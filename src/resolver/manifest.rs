//! DASH-like manifest resolution.
//!
//! [`ManifestResolver`] turns an MPD document into per-track
//! [`TemplateSegments`] sources for a target quality:
//!
//! 1. Root attributes outside the allow-list are stripped and the document is
//!    parsed into an element tree.
//! 2. The first `Period` is searched for adaptation sets of the requested
//!    media kind (`contentType`, else the `mimeType` prefix).
//! 3. Video representations must match the target quality exactly; audio
//!    representations are ranked through a fixed tier table.
//! 4. The chosen representation's `SegmentTemplate` and `SegmentTimeline`
//!    give the init URL and the numbered media URLs.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

use super::mpd::{self, Element};
use super::{QualitySet, ResolveError};
use crate::media::{MediaKind, MediaSpec, ResourceSpec, Segment, SegmentSource};

/// Audio quality tiers and the video quality each one accompanies.
pub const AUDIO_TIERS: [(&str, u32); 4] = [
    ("low", 240),
    ("medium", 480),
    ("high", 720),
    ("very_high", 1080),
];

/// `Number` or `Number%0<width>d`, the identifier between two `$`.
#[allow(clippy::expect_used)]
static NUMBER_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Number(?:%0(\d+)d)?$").expect("number placeholder regex is valid")
});

/// Maps an audio tier name to its quality value.
#[must_use]
pub fn audio_tier_quality(tier: &str) -> Option<u32> {
    AUDIO_TIERS
        .iter()
        .find(|(name, _)| *name == tier)
        .map(|(_, quality)| *quality)
}

/// A parsed manifest and the URL it was fetched from.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    manifest_url: Url,
    root: Element,
}

/// A representation together with the adaptation set that holds it.
struct Candidate<'a> {
    adaptation_set: &'a Element,
    representation: &'a Element,
}

impl ManifestResolver {
    /// Parses `text`, which was fetched from `manifest_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` if the URL or the XML is malformed.
    pub fn parse(text: &str, manifest_url: &str) -> Result<Self, ResolveError> {
        let manifest_url = Url::parse(manifest_url).map_err(|e| {
            ResolveError::invalid_manifest(format!("bad manifest URL '{manifest_url}': {e}"))
        })?;
        let root = mpd::parse_document(&mpd::strip_root_attributes(text)?)?;
        if root.name != "MPD" {
            return Err(ResolveError::invalid_manifest(format!(
                "root element is <{}>, expected <MPD>",
                root.name
            )));
        }
        Ok(Self { manifest_url, root })
    }

    /// Qualities of every video representation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` if the video tracks cannot be enumerated.
    pub fn video_qualities(&self) -> Result<QualitySet, ResolveError> {
        self.candidates(MediaKind::Video)?
            .iter()
            .map(|c| video_quality(c.representation))
            .collect()
    }

    /// Segment source for `kind` at `quality`.
    ///
    /// # Errors
    ///
    /// - `InvalidManifest` for structural problems
    /// - `MediaNotFound` if no video representation has exactly `quality`
    #[instrument(level = "debug", skip(self), fields(manifest = %self.manifest_url))]
    pub fn resolve(&self, quality: u32, kind: MediaKind) -> Result<TemplateSegments, ResolveError> {
        let candidates = self.candidates(kind)?;
        let chosen = match kind {
            MediaKind::Video => select_video(&candidates, quality)?,
            MediaKind::Audio => select_audio(&candidates, quality)?,
        };
        self.segments_for(chosen)
    }

    /// Audio and video plans for `quality`, writing into `directory`.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn media_spec(&self, quality: u32, directory: &Path) -> Result<MediaSpec, ResolveError> {
        let audio = self.resolve(quality, MediaKind::Audio)?;
        let video = self.resolve(quality, MediaKind::Video)?;
        Ok(MediaSpec {
            audio: ResourceSpec::new(audio, directory.join("audio.mp4")),
            video: ResourceSpec::new(video, directory.join("video.mp4")),
        })
    }

    fn period(&self) -> Result<&Element, ResolveError> {
        self.root
            .child("Period")
            .ok_or_else(|| ResolveError::invalid_manifest("no <Period> element"))
    }

    fn candidates(&self, kind: MediaKind) -> Result<Vec<Candidate<'_>>, ResolveError> {
        let period = self.period()?;
        let sets: Vec<&Element> = period
            .children_named("AdaptationSet")
            .filter(|set| adaptation_set_kind(set) == Some(kind))
            .collect();
        if sets.is_empty() {
            return Err(ResolveError::invalid_manifest(format!(
                "no {kind} adaptation set"
            )));
        }

        let candidates: Vec<Candidate<'_>> = sets
            .into_iter()
            .flat_map(|set| {
                set.children_named("Representation")
                    .map(move |representation| Candidate {
                        adaptation_set: set,
                        representation,
                    })
            })
            .collect();
        if candidates.is_empty() {
            return Err(ResolveError::invalid_manifest(format!(
                "{kind} adaptation set has no representations"
            )));
        }
        Ok(candidates)
    }

    fn base_url(&self, candidate: &Candidate<'_>) -> Result<Url, ResolveError> {
        let period = self.period()?;
        let levels = [
            &self.root,
            period,
            candidate.adaptation_set,
            candidate.representation,
        ];
        let mut base = self.manifest_url.clone();
        for level in levels {
            if let Some(base_url) = level.child("BaseURL").map(Element::text)
                && !base_url.is_empty()
            {
                base = base.join(base_url).map_err(|e| {
                    ResolveError::invalid_manifest(format!("bad BaseURL '{base_url}': {e}"))
                })?;
            }
        }
        Ok(base)
    }

    fn segments_for(&self, candidate: &Candidate<'_>) -> Result<TemplateSegments, ResolveError> {
        let representation = candidate.representation;
        let template = representation
            .child("SegmentTemplate")
            .or_else(|| candidate.adaptation_set.child("SegmentTemplate"))
            .ok_or_else(|| ResolveError::invalid_manifest("no <SegmentTemplate> element"))?;

        let substitutions = Substitutions {
            representation_id: representation.attr("id"),
            bandwidth: representation.attr("bandwidth"),
        };
        let init = UrlTemplate::parse(template.required_attr("initialization")?, &substitutions)?;
        let media = UrlTemplate::parse(template.required_attr("media")?, &substitutions)?;
        if media.number_placeholders() != 1 {
            return Err(ResolveError::invalid_manifest(
                "media template must contain exactly one $Number$ placeholder",
            ));
        }

        let start_number = parse_optional_u64(template, "startNumber")?.unwrap_or(1);
        let timescale = parse_optional_u64(template, "timescale")?.unwrap_or(1).max(1);
        let timeline = template
            .child("SegmentTimeline")
            .ok_or_else(|| ResolveError::invalid_manifest("no <SegmentTimeline> element"))?;
        let total = self.count_segments(timeline, timescale)?;
        let end_number = start_number.checked_add(total).ok_or_else(timeline_overflow)?;

        let base = self.base_url(candidate)?;
        let init_url = base
            .join(&init.expand(start_number))
            .map_err(|e| ResolveError::invalid_manifest(format!("bad init URL: {e}")))?;
        // Validates the media template once; later numbers only change digits.
        base.join(&media.expand(start_number))
            .map_err(|e| ResolveError::invalid_manifest(format!("bad media URL: {e}")))?;

        debug!(
            representation = representation.attr("id").unwrap_or_default(),
            start_number,
            total,
            "segment template resolved"
        );

        Ok(TemplateSegments {
            base,
            init_url: Some(init_url.to_string()),
            media,
            next_number: start_number,
            end_number,
        })
    }

    fn count_segments(&self, timeline: &Element, timescale: u64) -> Result<u64, ResolveError> {
        let entries: Vec<&Element> = timeline.children_named("S").collect();
        if entries.is_empty() {
            return Err(ResolveError::invalid_manifest("<SegmentTimeline> has no <S> entries"));
        }

        let mut total: u64 = 0;
        let mut time: u64 = 0;
        for entry in entries {
            let duration = entry
                .required_attr("d")?
                .parse::<u64>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| ResolveError::invalid_manifest("<S> duration must be positive"))?;
            if let Some(start) = parse_optional_u64(entry, "t")? {
                time = start;
            }
            let repeat: i64 = match entry.attr("r") {
                Some(r) => r
                    .parse()
                    .map_err(|_| ResolveError::invalid_manifest(format!("bad repeat count '{r}'")))?,
                None => 0,
            };

            let count = if repeat < 0 {
                self.open_ended_count(time, duration, timescale)?
            } else {
                #[allow(clippy::cast_sign_loss)]
                let repeat = repeat as u64;
                repeat.checked_add(1).ok_or_else(timeline_overflow)?
            };
            total = total.checked_add(count).ok_or_else(timeline_overflow)?;
            time = count
                .checked_mul(duration)
                .and_then(|span| time.checked_add(span))
                .ok_or_else(timeline_overflow)?;
        }
        Ok(total)
    }

    /// Segments of an `r < 0` entry: repeat until the presentation ends.
    fn open_ended_count(&self, start: u64, duration: u64, timescale: u64) -> Result<u64, ResolveError> {
        let presentation = self
            .root
            .required_attr("mediaPresentationDuration")
            .and_then(|value| {
                mpd::parse_iso8601_duration(value).ok_or_else(|| {
                    ResolveError::invalid_manifest(format!("bad mediaPresentationDuration '{value}'"))
                })
            })?;

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let end = (presentation * timescale as f64).round() as u64;
        Ok(end.saturating_sub(start).div_ceil(duration))
    }
}

fn timeline_overflow() -> ResolveError {
    ResolveError::invalid_manifest("<SegmentTimeline> segment count out of range")
}

fn adaptation_set_kind(set: &Element) -> Option<MediaKind> {
    if let Some(content_type) = set.attr("contentType") {
        return match content_type {
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            _ => None,
        };
    }
    set.attr("mimeType")
        .or_else(|| {
            set.child("Representation")
                .and_then(|r| r.attr("mimeType"))
        })
        .and_then(MediaKind::from_mime_type)
}

fn video_quality(representation: &Element) -> Result<u32, ResolveError> {
    let dimension = |name: &str| representation.attr(name).and_then(|v| v.parse::<u32>().ok());
    if let (Some(width), Some(height)) = (dimension("width"), dimension("height")) {
        return Ok(width.min(height));
    }
    representation
        .attr("quality")
        .and_then(|q| q.trim_end_matches('p').parse::<u32>().ok())
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            ResolveError::invalid_manifest("video representation has neither dimensions nor quality")
        })
}

fn select_video<'c, 'a>(
    candidates: &'c [Candidate<'a>],
    quality: u32,
) -> Result<&'c Candidate<'a>, ResolveError> {
    for candidate in candidates {
        if video_quality(candidate.representation)? == quality {
            return Ok(candidate);
        }
    }
    Err(ResolveError::media_not_found(MediaKind::Video, quality))
}

fn select_audio<'c, 'a>(
    candidates: &'c [Candidate<'a>],
    quality: u32,
) -> Result<&'c Candidate<'a>, ResolveError> {
    let mut ranked = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let tier = candidate.representation.required_attr("quality")?;
        let mapped = audio_tier_quality(tier).ok_or_else(|| {
            ResolveError::invalid_manifest(format!("unknown audio quality tier '{tier}'"))
        })?;
        ranked.push((mapped, candidate));
    }

    let at_or_above = ranked
        .iter()
        .filter(|(mapped, _)| *mapped >= quality)
        .min_by_key(|(mapped, _)| *mapped);
    let chosen = at_or_above.or_else(|| ranked.iter().max_by_key(|(mapped, _)| *mapped));
    chosen
        .map(|(_, candidate)| *candidate)
        .ok_or_else(|| ResolveError::media_not_found(MediaKind::Audio, quality))
}

fn parse_optional_u64(element: &Element, name: &str) -> Result<Option<u64>, ResolveError> {
    element
        .attr(name)
        .map(|value| {
            value.parse::<u64>().map_err(|_| {
                ResolveError::invalid_manifest(format!(
                    "<{}> attribute '{name}' is not a number: '{value}'",
                    element.name
                ))
            })
        })
        .transpose()
}

struct Substitutions<'a> {
    representation_id: Option<&'a str>,
    bandwidth: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Number { width: usize },
}

/// A URL template with `$Number$` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlTemplate {
    parts: Vec<TemplatePart>,
}

impl UrlTemplate {
    fn parse(template: &str, substitutions: &Substitutions<'_>) -> Result<Self, ResolveError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('$') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('$').ok_or_else(|| {
                ResolveError::invalid_manifest(format!("unterminated placeholder in '{template}'"))
            })?;
            let identifier = &after[..close];
            rest = &after[close + 1..];

            match identifier {
                "" => literal.push('$'),
                "RepresentationID" => literal.push_str(substitute(
                    substitutions.representation_id,
                    identifier,
                )?),
                "Bandwidth" => literal.push_str(substitute(substitutions.bandwidth, identifier)?),
                other => {
                    let captures = NUMBER_PLACEHOLDER.captures(other).ok_or_else(|| {
                        ResolveError::invalid_manifest(format!(
                            "unsupported placeholder '${other}$'"
                        ))
                    })?;
                    let width = captures
                        .get(1)
                        .map_or(Ok(0), |w| w.as_str().parse::<usize>())
                        .map_err(|_| ResolveError::invalid_manifest("bad $Number$ width"))?;
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Number { width });
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }
        Ok(Self { parts })
    }

    fn number_placeholders(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, TemplatePart::Number { .. }))
            .count()
    }

    fn expand(&self, number: u64) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Number { width } => {
                    let width = *width;
                    out.push_str(&format!("{number:0width$}"));
                }
            }
        }
        out
    }
}

fn substitute<'a>(value: Option<&'a str>, identifier: &str) -> Result<&'a str, ResolveError> {
    value.ok_or_else(|| {
        ResolveError::invalid_manifest(format!(
            "${identifier}$ used but the representation does not define it"
        ))
    })
}

/// Lazy segment source over a manifest's init and numbered media URLs.
#[derive(Debug, Clone)]
pub struct TemplateSegments {
    base: Url,
    init_url: Option<String>,
    media: UrlTemplate,
    next_number: u64,
    end_number: u64,
}

impl TemplateSegments {
    /// Number of segments, including the init segment, not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        u64::from(self.init_url.is_some()) + self.end_number.saturating_sub(self.next_number)
    }
}

impl SegmentSource for TemplateSegments {
    fn next_segment(&mut self, _previous: Option<u64>) -> Option<Segment> {
        if let Some(init_url) = self.init_url.take() {
            return Some(Segment::new(init_url));
        }
        if self.next_number >= self.end_number {
            return None;
        }
        let number = self.next_number;
        self.next_number += 1;
        match self.base.join(&self.media.expand(number)) {
            Ok(url) => Some(Segment::new(url.to_string())),
            Err(error) => {
                tracing::warn!(number, error = %error, "cannot build segment URL, ending source");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MANIFEST_URL: &str = "https://cdn.example.com/videos/42/manifest.mpd";

    fn manifest(video_timeline: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT12S">
  <Period>
    <AdaptationSet contentType="video" mimeType="video/mp4">
      <Representation id="v720" width="1280" height="720" bandwidth="2000000">
        <SegmentTemplate initialization="v720/init.mp4" media="v720/seg-$Number$.m4s" startNumber="7" timescale="1000">
          <SegmentTimeline>{video_timeline}</SegmentTimeline>
        </SegmentTemplate>
      </Representation>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <SegmentTemplate initialization="$RepresentationID$/init.mp4" media="$RepresentationID$/$Number%05d$.m4s" timescale="1000">
        <SegmentTimeline><S t="0" d="4000" r="2"/></SegmentTimeline>
      </SegmentTemplate>
      <Representation id="a-low" quality="low"/>
      <Representation id="a-high" quality="high"/>
      <Representation id="a-top" quality="very_high"/>
    </AdaptationSet>
  </Period>
</MPD>"#
        )
    }

    fn drain(mut source: impl SegmentSource) -> Vec<String> {
        let mut urls = Vec::new();
        while let Some(segment) = source.next_segment(None) {
            urls.push(segment.url);
        }
        urls
    }

    #[test]
    fn test_timeline_with_repeat_yields_init_and_five_segments() {
        let text = manifest(r#"<S t="0" d="2000"/><S d="2000" r="3"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        let urls = drain(resolver.resolve(720, MediaKind::Video).unwrap());

        let base = "https://cdn.example.com/videos/42/v720";
        let mut expected = vec![format!("{base}/init.mp4")];
        expected.extend((7..=11).map(|n| format!("{base}/seg-{n}.m4s")));
        assert_eq!(urls, expected);
    }

    #[test]
    fn test_negative_repeat_runs_to_presentation_end() {
        let text = manifest(r#"<S t="0" d="2000" r="-1"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        let segments = resolver.resolve(720, MediaKind::Video).unwrap();

        // 12 s at 2 s per segment, plus the init segment.
        assert_eq!(segments.remaining(), 7);
    }

    #[test]
    fn test_huge_repeat_count_is_invalid_manifest() {
        let text = manifest(r#"<S d="2000" r="9223372036854775807"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        assert!(matches!(
            resolver.resolve(720, MediaKind::Video),
            Err(ResolveError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_segment_numbers_past_u64_are_invalid_manifest() {
        let text = manifest(r#"<S d="1" r="9223372036854775807"/><S d="1" r="9223372036854775807"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        assert!(matches!(
            resolver.resolve(720, MediaKind::Video),
            Err(ResolveError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_missing_video_quality_is_media_not_found() {
        let text = manifest(r#"<S d="2000"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        match resolver.resolve(1080, MediaKind::Video) {
            Err(ResolveError::MediaNotFound { kind, quality }) => {
                assert_eq!(kind, MediaKind::Video);
                assert_eq!(quality, 1080);
            }
            other => panic!("Expected MediaNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn test_audio_picks_lowest_tier_at_or_above_target() {
        let text = manifest(r#"<S d="2000"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        let urls = drain(resolver.resolve(480, MediaKind::Audio).unwrap());

        assert_eq!(urls[0], "https://cdn.example.com/videos/42/a-high/init.mp4");
        assert_eq!(urls[1], "https://cdn.example.com/videos/42/a-high/00001.m4s");
        assert_eq!(urls.len(), 4);
    }

    #[test]
    fn test_audio_falls_back_to_highest_tier() {
        let text = manifest(r#"<S d="2000"/>"#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        let urls = drain(resolver.resolve(2160, MediaKind::Audio).unwrap());

        assert!(urls[0].contains("/a-top/"));
    }

    #[test]
    fn test_unknown_audio_tier_is_invalid_manifest() {
        let text = manifest(r#"<S d="2000"/>"#).replace(r#"quality="low""#, r#"quality="lossless""#);
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        assert!(matches!(
            resolver.resolve(720, MediaKind::Audio),
            Err(ResolveError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_base_urls_are_joined_outermost_first() {
        let text = manifest(r#"<S d="2000"/>"#)
            .replace("<Period>", "<BaseURL>https://media.example.org/root/</BaseURL><Period>")
            .replace(
                r#"<AdaptationSet contentType="video" mimeType="video/mp4">"#,
                r#"<AdaptationSet contentType="video" mimeType="video/mp4"><BaseURL>hd/</BaseURL>"#,
            );
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        let urls = drain(resolver.resolve(720, MediaKind::Video).unwrap());

        assert_eq!(urls[0], "https://media.example.org/root/hd/v720/init.mp4");
    }

    #[test]
    fn test_video_qualities_use_smaller_dimension() {
        let text = manifest(r#"<S d="2000"/>"#).replace(
            r#"width="1280" height="720""#,
            r#"width="720" height="1280""#,
        );
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        assert_eq!(
            resolver.video_qualities().unwrap(),
            QualitySet::from([720])
        );
    }

    #[test]
    fn test_missing_timeline_is_invalid_manifest() {
        let text = manifest(r#"<S d="2000"/>"#).replace(
            r#"<SegmentTimeline><S d="2000"/></SegmentTimeline>"#,
            "",
        );
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        assert!(matches!(
            resolver.resolve(720, MediaKind::Video),
            Err(ResolveError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_media_template_needs_one_number_placeholder() {
        let text = manifest(r#"<S d="2000"/>"#).replace("seg-$Number$.m4s", "seg.m4s");
        let resolver = ManifestResolver::parse(&text, MANIFEST_URL).unwrap();

        assert!(matches!(
            resolver.resolve(720, MediaKind::Video),
            Err(ResolveError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_malformed_manifest_is_rejected() {
        let result = ManifestResolver::parse("<MPD><Period></MPD>", MANIFEST_URL);
        assert!(matches!(result, Err(ResolveError::InvalidManifest { .. })));
    }

    #[test]
    fn test_url_template_escaped_dollar_and_width() {
        let substitutions = Substitutions {
            representation_id: Some("r1"),
            bandwidth: None,
        };
        let template = UrlTemplate::parse("$RepresentationID$/$$x-$Number%03d$.m4s", &substitutions).unwrap();
        assert_eq!(template.expand(7), "r1/$x-007.m4s");
        assert_eq!(template.number_placeholders(), 1);
    }

    #[test]
    fn test_audio_tier_table() {
        assert_eq!(audio_tier_quality("low"), Some(240));
        assert_eq!(audio_tier_quality("very_high"), Some(1080));
        assert_eq!(audio_tier_quality("ultra"), None);
    }
}
