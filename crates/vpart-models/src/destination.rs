//! Remote upload destinations.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where an artifact is uploaded: an opaque collection, a display name and a MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDestination {
    pub collection_id: String,
    pub display_name: String,
    pub mime_type: String,
}

impl RemoteDestination {
    pub fn new(
        collection_id: impl Into<String>,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Destination for a local file, with the MIME type guessed from its extension.
    pub fn for_file(collection_id: impl Into<String>, path: &Path) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = guess_mime_type(path).unwrap_or("video/mp4");
        Self::new(collection_id, display_name, mime_type)
    }
}

/// Provider-assigned identifier of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: String,
    pub public_url: Option<String>,
}

impl RemoteObject {
    /// The public URL when there is one, otherwise the identifier.
    pub fn url_or_id(&self) -> &str {
        self.public_url.as_deref().unwrap_or(&self.id)
    }
}

/// Guess a MIME type from a file extension.
pub fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "gif" => "image/gif",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}
