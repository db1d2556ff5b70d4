//! Audio input: file validation and base64 encoding for transcription.

use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use thiserror::Error;

/// Maximum recording size in bytes (10 MB).
const MAX_AUDIO_SIZE: u64 = 10 * 1024 * 1024;

const SUPPORTED: &str = "wav, mp3, ogg, webm, m4a, flac";

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("no file extension: {0}")]
    NoExtension(PathBuf),

    #[error("unsupported audio format '.{ext}' (supported: {supported})", supported = SUPPORTED)]
    Unsupported { ext: String },

    #[error("file too large: {size} bytes (max {max_mb} MB)", max_mb = MAX_AUDIO_SIZE / 1024 / 1024)]
    TooLarge { size: u64 },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Map file extension to MIME type. Returns `None` for unsupported formats.
fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "ogg" | "oga" => Some("audio/ogg"),
        "webm" => Some("audio/webm"),
        "m4a" => Some("audio/mp4"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

/// A validated recording ready to send for transcription.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub filename: String,
    pub media_type: &'static str,
    /// Base64 (standard alphabet) file contents.
    pub data: String,
}

/// Load and validate an audio file.
pub fn load_audio(path: &Path) -> Result<AudioClip, AudioError> {
    if !path.exists() {
        return Err(AudioError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| AudioError::NoExtension(path.to_path_buf()))?;

    let media_type =
        mime_type_for_extension(ext).ok_or_else(|| AudioError::Unsupported {
            ext: ext.to_string(),
        })?;

    let io_err = |source: io::Error| AudioError::Io {
        path: path.to_path_buf(),
        source,
    };
    let metadata = std::fs::metadata(path).map_err(io_err)?;
    if metadata.len() > MAX_AUDIO_SIZE {
        return Err(AudioError::TooLarge {
            size: metadata.len(),
        });
    }

    let data = std::fs::read(path).map_err(io_err)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&data);

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(AudioClip {
        filename,
        media_type,
        data: encoded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for_extension("wav"), Some("audio/wav"));
        assert_eq!(mime_type_for_extension("WAV"), Some("audio/wav"));
        assert_eq!(mime_type_for_extension("mp3"), Some("audio/mpeg"));
        assert_eq!(mime_type_for_extension("m4a"), Some("audio/mp4"));
        assert_eq!(mime_type_for_extension("png"), None);
        assert_eq!(mime_type_for_extension("txt"), None);
    }

    #[test]
    fn load_valid_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("question.wav");
        std::fs::write(&path, b"RIFF\0\0\0\0WAVE").unwrap();

        let clip = load_audio(&path).unwrap();
        assert_eq!(clip.filename, "question.wav");
        assert_eq!(clip.media_type, "audio/wav");
        assert!(!clip.data.is_empty());
    }

    #[test]
    fn load_missing_file() {
        let result = load_audio(Path::new("/nonexistent/question.wav"));
        assert!(matches!(result, Err(AudioError::NotFound(_))));
    }

    #[test]
    fn load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();
        let err = load_audio(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported audio format '.txt'"));
    }

    #[test]
    fn load_no_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noext");
        std::fs::write(&path, b"data").unwrap();
        assert!(matches!(load_audio(&path), Err(AudioError::NoExtension(_))));
    }

    #[test]
    fn oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.ogg");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_AUDIO_SIZE + 1).unwrap();
        assert!(matches!(
            load_audio(&path),
            Err(AudioError::TooLarge { size }) if size == MAX_AUDIO_SIZE + 1
        ));
    }

    #[test]
    fn base64_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round.webm");
        let original = b"hello world audio data";
        std::fs::write(&path, original).unwrap();

        let clip = load_audio(&path).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&clip.data)
            .unwrap();
        assert_eq!(decoded, original);
    }
}
