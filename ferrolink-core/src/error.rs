use thiserror::Error;

use crate::{EdgeId, VertexId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Origin and destination both split edge {0:?}")]
    TrivialPath(EdgeId),
    #[error("Vertex {0:?} is not an entity that can be linked")]
    NotLinkable(VertexId),
    #[error("Invalid vertex index")]
    InvalidVertexIndex,
    #[error("Invalid edge index")]
    InvalidEdgeIndex,
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Feed error: {0}")]
    FeedError(String),
    #[error("Graph writer is shut down")]
    WriterClosed,
    #[error("Unrecoverable error: {0}")]
    UnrecoverableError(&'static str),
}
