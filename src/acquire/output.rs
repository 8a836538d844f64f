//! Output path rules for the muxed file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::AcquireError;

/// Extension appended to generated file names.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Container extensions kept on a user-supplied file name.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mkv", "webm", "mov", "avi", "ogv", "flv", "ts"];

/// Turns a page title into a file stem.
///
/// Whitespace runs become a single `_`; every other character that is not
/// alphanumeric or `_` is dropped.
#[must_use]
pub fn format_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_sep = false;
    for ch in title.chars() {
        if ch.is_whitespace() {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_alphanumeric() || ch == '_' {
            out.push(ch);
            prev_sep = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// Final output file for `output`.
///
/// A path without an extension, or an existing directory, names a
/// directory: the formatted title (or `video_<unix-secs>`) plus `.mp4` is
/// appended to it. Any other path names the file; an extension that is not
/// a video container is replaced with `.mp4`.
#[must_use]
pub fn resolve_output_path(output: &Path, title: Option<&str>) -> PathBuf {
    if let Some(extension) = output.extension()
        && !output.is_dir()
    {
        let extension = extension.to_string_lossy().to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            return output.to_path_buf();
        }
        warn!(output = %output.display(), "not a video extension, using .{DEFAULT_EXTENSION}");
        return output.with_extension(DEFAULT_EXTENSION);
    }

    let stem = title.map(format_title).filter(|s| !s.is_empty());
    if let Some(original) = title
        && stem.is_none()
    {
        warn!(title = %original, "title has no usable characters, using a timestamp name");
    }
    let stem = stem.unwrap_or_else(|| format!("video_{}", unix_timestamp()));
    debug!(stem = %stem, directory = %output.display(), "output name chosen");
    output.join(format!("{stem}.{DEFAULT_EXTENSION}"))
}

/// Fails if `path` exists and `overwrite` is off.
///
/// # Errors
///
/// Returns `AcquireError::FileExists`.
pub fn check_output(path: &Path, overwrite: bool) -> Result<(), AcquireError> {
    if !overwrite && path.exists() {
        return Err(AcquireError::file_exists(path));
    }
    Ok(())
}

/// `path`, or `<stem>_<unix-secs>.<ext>` next to it when `path` is taken.
pub(crate) fn collision_free(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().into_owned());
    let extension = path
        .extension()
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), |s| s.to_string_lossy().into_owned());
    let renamed = path.with_file_name(format!("{stem}_{}.{extension}", unix_timestamp()));
    warn!(
        taken = %path.display(),
        renamed = %renamed.display(),
        "output appeared during download, writing next to it"
    );
    renamed
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn test_format_title_collapses_whitespace_and_drops_punctuation() {
        assert_eq!(format_title("Launch  day, part 2"), "Launch_day_part_2");
        assert_eq!(format_title("  C'est\tla vie!  "), "Cest_la_vie");
        assert_eq!(format_title("snake_case stays"), "snake_case_stays");
    }

    #[test]
    fn test_format_title_keeps_unicode_letters() {
        assert_eq!(format_title("Über café"), "Über_café");
    }

    #[test]
    fn test_path_with_extension_is_a_file() {
        let path = resolve_output_path(Path::new("out/clip.mkv"), Some("ignored"));
        assert_eq!(path, PathBuf::from("out/clip.mkv"));
    }

    #[test]
    fn test_non_video_extension_is_replaced() {
        assert_eq!(
            resolve_output_path(Path::new("out/notes.txt"), None),
            PathBuf::from("out/notes.mp4")
        );
        assert_eq!(
            resolve_output_path(Path::new("out/clip.v2.json"), Some("ignored")),
            PathBuf::from("out/clip.v2.mp4")
        );
        assert_eq!(
            resolve_output_path(Path::new("out/Clip.WEBM"), None),
            PathBuf::from("out/Clip.WEBM")
        );
    }

    #[test]
    fn test_path_without_extension_gets_title() {
        let path = resolve_output_path(Path::new("out"), Some("My video"));
        assert_eq!(path, PathBuf::from("out/My_video.mp4"));
    }

    #[test]
    fn test_missing_title_falls_back_to_timestamp() {
        for title in [None, Some("?!")] {
            let path = resolve_output_path(Path::new("out"), title);
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("video_"), "unexpected name: {name}");
            assert!(name.ends_with(".mp4"));
        }
    }

    #[test]
    fn test_existing_directory_with_dot_is_a_directory() {
        let dir = TempDir::new().unwrap();
        let videos = dir.path().join("my.videos");
        std::fs::create_dir(&videos).unwrap();

        let path = resolve_output_path(&videos, Some("clip"));
        assert_eq!(path, videos.join("clip.mp4"));
    }

    #[test]
    fn test_check_output_respects_overwrite() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("clip.mp4");
        assert!(check_output(&file, false).is_ok());

        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            check_output(&file, false),
            Err(AcquireError::FileExists { .. })
        ));
        assert!(check_output(&file, true).is_ok());
    }

    #[test]
    fn test_collision_free_renames_taken_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("clip.mp4");
        assert_eq!(collision_free(&file), file);

        std::fs::write(&file, b"x").unwrap();
        let renamed = collision_free(&file);
        let name = renamed.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("clip_"), "unexpected name: {name}");
        assert!(name.ends_with(".mp4"));
    }
}
