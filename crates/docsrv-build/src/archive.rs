//! Source archive extraction.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

/// Unpack a gzip-compressed tarball into `dest`.
///
/// Entries escaping `dest` are skipped by [`tar::Archive::unpack`].
pub(crate) fn extract_tar_gz(reader: impl Read, dest: &Path) -> io::Result<()> {
    let decoder = GzDecoder::new(reader);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest)
}

/// Unpack the tarball at `archive` into `dest`.
pub(crate) fn extract_file(archive: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    extract_tar_gz(File::open(archive)?, dest)
}

/// Directory the build command runs in.
///
/// Release tarballs wrap the tree in a single top-level directory
/// (`owner-project-sha/`); that directory is used when present, otherwise
/// `dest` itself.
pub(crate) fn working_tree(dest: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(dest)?.collect::<io::Result<Vec<_>>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries.remove(0).path());
    }
    Ok(dest.to_path_buf())
}

#[cfg(test)]
pub(crate) mod tests {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    use super::*;

    /// Build a `.tar.gz` from `(path, contents, mode)` entries.
    pub(crate) fn tarball(entries: &[(&str, &str, u32)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let encoder = GzEncoder::new(&mut bytes, Compression::default());
            let mut builder = Builder::new(encoder);
            for (path, contents, mode) in entries {
                let mut header = Header::new_gnu();
                header.set_size(contents.len() as u64);
                header.set_mode(*mode);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, contents.as_bytes())
                    .unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }
        bytes
    }

    #[test]
    fn test_extract_single_root() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = tarball(&[
            ("acme-widget-abc123/Makefile", "docs:\n", 0o644),
            ("acme-widget-abc123/docs/index.md", "# Widget\n", 0o644),
        ]);

        extract_tar_gz(&bytes[..], temp_dir.path()).unwrap();
        let tree = working_tree(temp_dir.path()).unwrap();

        assert_eq!(tree, temp_dir.path().join("acme-widget-abc123"));
        assert!(tree.join("docs/index.md").exists());
    }

    #[test]
    fn test_extract_flat_archive() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = tarball(&[("Makefile", "docs:\n", 0o644), ("README", "hi\n", 0o644)]);

        extract_tar_gz(&bytes[..], temp_dir.path()).unwrap();

        assert_eq!(working_tree(temp_dir.path()).unwrap(), temp_dir.path());
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        assert!(extract_tar_gz(&b"not a tarball"[..], temp_dir.path()).is_err());
    }
}
