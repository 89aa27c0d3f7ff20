use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::map::MapId;

/// Failures surfaced to the user while working with a project and its maps.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("there is already a map named {0:?}")]
    DuplicateMapName(String),

    #[error("{0:?} is not a valid map name")]
    InvalidMapName(String),

    #[error("no map with id {0}")]
    UnknownMap(MapId),

    #[error("no project is open")]
    NoProject,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load texture {}: {source}", path.display())]
    TextureLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("sprite rect of {} lies outside the image", path.display())]
    SpriteOutOfBounds { path: PathBuf },
}

impl ProjectError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        ProjectError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        ProjectError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;
