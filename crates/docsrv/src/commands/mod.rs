//! CLI command implementations.

pub(crate) mod releases;
pub(crate) mod serve;

pub(crate) use releases::ReleasesArgs;
pub(crate) use serve::ServeArgs;
