use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

/// Where a serialized model comes from.
#[derive(Clone, Debug)]
pub enum ModelArtifact {
    OnnxPath(PathBuf),
    OnnxBytes(Bytes),
}

impl From<PathBuf> for ModelArtifact {
    fn from(path: PathBuf) -> Self {
        ModelArtifact::OnnxPath(path)
    }
}

impl fmt::Display for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelArtifact::OnnxPath(path) => write!(f, "{}", path.display()),
            ModelArtifact::OnnxBytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}
