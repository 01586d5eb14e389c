// Filesystem access to the transcoder's HLS output
//
// Files are addressed by a bare filename inside the output directory.
// Names are whitelisted before touching the filesystem, so no request can
// escape the directory.

use std::path::PathBuf;
use tokio::fs;

use crate::config::StreamConfig;
use crate::{Error, Result};

/// Longest filename accepted
const MAX_FILENAME_LEN: usize = 255;

/// A file ready to be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// `Cache-Control` value, set for playlists which change on every segment
    pub cache_control: Option<&'static str>,
}

/// Read-only view of the HLS output directory
#[derive(Debug, Clone)]
pub struct HlsFiles {
    base_path: PathBuf,
}

impl HlsFiles {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    /// Map a requested filename to a path inside the output directory
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        if !is_safe_filename(filename) {
            return Err(Error::InvalidInput("Invalid file name".to_string()));
        }
        Ok(self.base_path.join(filename))
    }

    pub async fn read(&self, filename: &str) -> Result<HlsFile> {
        let path = self.resolve(filename)?;

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("File {filename} not found")));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::trace!("Read: {:?} ({} bytes)", path, bytes.len());

        let content_type = content_type_for(filename);
        let cache_control = is_playlist(filename).then_some("no-cache");
        Ok(HlsFile {
            bytes,
            content_type,
            cache_control,
        })
    }
}

/// Single path component made of `[A-Za-z0-9._-]`, not starting with a dot
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILENAME_LEN
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

fn extension(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

fn is_playlist(name: &str) -> bool {
    extension(name).eq_ignore_ascii_case("m3u8")
}

/// Content type by file extension
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).to_ascii_lowercase().as_str() {
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "m4s" => "video/iso.segment",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
