//! Build error types.

use std::io;

/// Error from a documentation build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Source archive could not be requested.
    #[error("failed to fetch {url}")]
    Fetch {
        /// Archive URL.
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// Archive server answered with an error status.
    #[error("fetching {url} returned HTTP {status}")]
    FetchStatus {
        /// Archive URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Archive body could not be saved.
    #[error("failed to download {url}")]
    Download {
        /// Archive URL.
        url: String,
        #[source]
        source: io::Error,
    },

    /// Archive is not a valid `.tar.gz`.
    #[error("failed to extract {url}")]
    Extract {
        /// Archive URL.
        url: String,
        #[source]
        source: io::Error,
    },

    /// Temporary build directory could not be created.
    #[error("failed to create build directory")]
    TempDir(#[source] io::Error),

    /// Build command could not be started.
    #[error("failed to run `{command}`")]
    Spawn {
        /// Command line.
        command: String,
        #[source]
        source: io::Error,
    },

    /// Build command exited unsuccessfully.
    #[error("`{command}` failed ({status}): {output}")]
    Failed {
        /// Command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Combined stdout and stderr.
        output: String,
    },
}
