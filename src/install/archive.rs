//! Safe extraction of release archives
//!
//! Archives come from the network and are treated as hostile. Every entry is
//! checked before any byte of it is written:
//!
//! 1. Entry count limit
//! 2. Path normalization and containment in the destination
//! 3. Directory depth limit
//! 4. Declared size per entry and running total; the copy itself is capped
//!    too, so an entry that under-declares its size cannot write past the cap
//!
//! Files are written owner-only and non-executable, except the tool binary.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::install::error::ArchiveError;

const DIR_MODE: u32 = 0o750;
const FILE_MODE: u32 = 0o600;
const EXECUTABLE_MODE: u32 = 0o755;

/// Hard limits applied to every extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
    pub max_depth: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_file_bytes: 100 * 1024 * 1024,
            max_total_bytes: 500 * 1024 * 1024,
            max_depth: 10,
        }
    }
}

/// One member of an archive, after its path has been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized path relative to the destination
    pub path: PathBuf,
    pub declared_size: u64,
    pub is_dir: bool,
}

/// A version directory populated by a successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: String,
    pub path: PathBuf,
    pub executable: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

/// Extracts release archives into `<destination_root>/<version>/`
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    limits: ArchiveLimits,
    executable_name: String,
}

impl ArchiveInstaller {
    pub fn new(limits: ArchiveLimits, executable_name: &str) -> Self {
        Self {
            limits,
            executable_name: executable_name.to_string(),
        }
    }

    /// Extract the archive stored at `archive_path`.
    pub fn extract_file(
        &self,
        archive_path: &Path,
        destination_root: &Path,
        version: &str,
    ) -> Result<InstalledVersion, ArchiveError> {
        let file = File::open(archive_path)
            .map_err(ArchiveError::io("Failed to open archive", archive_path))?;
        self.extract(file, destination_root, version)
    }

    /// Extract an archive into `<destination_root>/<version>/`.
    ///
    /// The first violation aborts the extraction; entries written before it
    /// stay on disk and are the caller's to clean up.
    pub fn extract<R: Read + Seek>(
        &self,
        archive: R,
        destination_root: &Path,
        version: &str,
    ) -> Result<InstalledVersion, ArchiveError> {
        if !is_single_component(version) {
            return Err(ArchiveError::PathTraversal {
                entry: version.to_string(),
            });
        }

        let mut archive = ZipArchive::new(archive)?;
        if archive.len() > self.limits.max_entries {
            return Err(ArchiveError::TooManyEntries {
                limit: self.limits.max_entries,
            });
        }

        let destination = destination_root.join(version);
        create_private_dir(&destination)?;
        let root = destination
            .canonicalize()
            .map_err(ArchiveError::io("Failed to resolve destination", &destination))?;

        let mut total: u64 = 0;
        let mut files = 0;
        let mut bytes = 0;

        for index in 0..archive.len() {
            let mut member = archive.by_index(index)?;
            let name = member.name().to_string();

            let Some(entry) = self.check_entry(&name, member.size(), member.is_dir())? else {
                debug!("Skipping empty entry name {:?}", name);
                continue;
            };

            let target = root.join(&entry.path);
            ensure_contained(&root, &target, &name)?;

            total = self.add_to_total(total, entry.declared_size)?;

            if entry.is_dir {
                debug!("Creating directory {}", target.display());
                create_private_dir(&target)?;
                continue;
            }

            if let Some(parent) = target.parent() {
                create_private_dir(parent)?;
                ensure_contained(&root, parent, &name)?;
            }

            // Only the top-level executable gets the execute bit.
            let executable = entry.path == Path::new(&self.executable_name);
            let mode = if executable { EXECUTABLE_MODE } else { FILE_MODE };

            let written = {
                let mut output = create_file(&target, mode)?;
                let written =
                    copy_capped(&mut member, &mut output, self.limits.max_file_bytes, &name)?;
                output
                    .flush()
                    .map_err(ArchiveError::io("Failed to write", &target))?;
                written
            };
            set_mode(&target, mode)?;

            if written != entry.declared_size {
                return Err(ArchiveError::SizeMismatch {
                    entry: name,
                    declared: entry.declared_size,
                    actual: written,
                });
            }

            files += 1;
            bytes += written;
        }

        let executable = root.join(&self.executable_name);
        info!(
            "Extracted {} files ({} bytes) into {}",
            files,
            bytes,
            root.display()
        );

        Ok(InstalledVersion {
            version: version.to_string(),
            path: root,
            executable,
            files,
            bytes,
        })
    }

    /// Validate an entry's path, depth and declared size.
    ///
    /// Returns `Ok(None)` for names that normalize to nothing (`./`).
    pub fn check_entry(
        &self,
        name: &str,
        declared_size: u64,
        is_dir: bool,
    ) -> Result<Option<ArchiveEntry>, ArchiveError> {
        let Some(path) = normalize_entry_path(name)? else {
            return Ok(None);
        };

        if path.components().count() > self.limits.max_depth {
            return Err(ArchiveError::PathTooDeep {
                entry: name.to_string(),
                limit: self.limits.max_depth,
            });
        }

        if declared_size > self.limits.max_file_bytes {
            return Err(ArchiveError::SizeLimitExceeded {
                entry: name.to_string(),
                limit: self.limits.max_file_bytes,
            });
        }

        Ok(Some(ArchiveEntry {
            path,
            declared_size,
            is_dir,
        }))
    }

    fn add_to_total(&self, total: u64, size: u64) -> Result<u64, ArchiveError> {
        let total = total.saturating_add(size);
        if total > self.limits.max_total_bytes {
            return Err(ArchiveError::TotalSizeExceeded {
                limit: self.limits.max_total_bytes,
            });
        }
        Ok(total)
    }
}

/// Clean a slash-separated entry name into a relative path.
///
/// Absolute names, drive prefixes and any `..` segment are rejected outright,
/// even when the `..` would stay inside the destination.
pub fn normalize_entry_path(name: &str) -> Result<Option<PathBuf>, ArchiveError> {
    let traversal = || ArchiveError::PathTraversal {
        entry: name.to_string(),
    };

    if name.starts_with(['/', '\\']) || name.contains('\0') {
        return Err(traversal());
    }

    let mut path = PathBuf::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(traversal()),
            segment if is_single_component(segment) && !segment.contains(':') => path.push(segment),
            _ => return Err(traversal()),
        }
    }

    if path.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(path))
    }
}

fn is_single_component(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Check that `target` resolves inside `root`.
///
/// The nearest existing ancestor is canonicalized, so a symlink planted
/// anywhere on the way out is caught. An existing symlink at the target itself
/// is refused because opening it would follow the link.
fn ensure_contained(root: &Path, target: &Path, entry: &str) -> Result<(), ArchiveError> {
    let traversal = || ArchiveError::PathTraversal {
        entry: entry.to_string(),
    };

    if fs::symlink_metadata(target).is_ok_and(|meta| meta.file_type().is_symlink()) {
        return Err(traversal());
    }

    let mut existing = target;
    loop {
        match fs::symlink_metadata(existing) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                existing = existing.parent().ok_or_else(traversal)?;
            }
            Err(source) => {
                return Err(ArchiveError::Io {
                    message: "Failed to inspect",
                    path: existing.to_path_buf(),
                    source,
                });
            }
        }
    }

    let resolved = existing
        .canonicalize()
        .map_err(ArchiveError::io("Failed to resolve", existing))?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(traversal())
    }
}

/// Copy at most `cap` bytes; fail if the reader still has data afterwards.
///
/// The limit is enforced on the bytes actually produced by the reader, not on
/// any size the archive declares, and byte `cap + 1` is never written.
pub fn copy_capped<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    cap: u64,
    entry: &str,
) -> Result<u64, ArchiveError> {
    let copy_error = |source| ArchiveError::Io {
        message: "Failed to copy contents of",
        path: PathBuf::from(entry),
        source,
    };

    let written = io::copy(&mut reader.by_ref().take(cap), writer).map_err(copy_error)?;

    if written == cap {
        let mut probe = [0u8; 1];
        let more = loop {
            match reader.read(&mut probe) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(copy_error(e)),
            }
        };
        if more > 0 {
            return Err(ArchiveError::SizeLimitExceeded {
                entry: entry.to_string(),
                limit: cap,
            });
        }
    }

    Ok(written)
}

fn create_private_dir(path: &Path) -> Result<(), ArchiveError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
        .create(path)
        .map_err(ArchiveError::io("Failed to create directory", path))
}

fn create_file(path: &Path, mode: u32) -> Result<File, ArchiveError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options
        .open(path)
        .map_err(ArchiveError::io("Failed to create file", path))
}

/// Apply the mode explicitly; an overwritten file keeps its old mode otherwise.
fn set_mode(path: &Path, mode: u32) -> Result<(), ArchiveError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(ArchiveError::io("Failed to set permissions on", path))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn installer() -> ArchiveInstaller {
        ArchiveInstaller::new(ArchiveLimits::default(), "terraform")
    }

    fn zip_with(entries: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[rstest]
    #[case("terraform", Some("terraform"))]
    #[case("./docs/README.md", Some("docs/README.md"))]
    #[case("a//b/./c", Some("a/b/c"))]
    #[case("./", None)]
    #[case("", None)]
    fn normalize_entry_path_cleans_relative_names(
        #[case] name: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            normalize_entry_path(name).unwrap(),
            expected.map(PathBuf::from)
        );
    }

    #[rstest]
    #[case("../../etc/passwd")]
    #[case("a/../b")]
    #[case("a/..")]
    #[case("/etc/passwd")]
    #[case("\\windows\\system32")]
    #[case("..\\evil")]
    #[case("C:/evil")]
    #[case("c:evil")]
    #[case("bad\0name")]
    fn normalize_entry_path_rejects_escapes(#[case] name: &str) {
        assert!(matches!(
            normalize_entry_path(name),
            Err(ArchiveError::PathTraversal { .. })
        ));
    }

    #[test]
    fn check_entry_rejects_deep_paths() {
        let name = (0..11).map(|i| format!("d{i}")).collect::<Vec<_>>().join("/");
        assert!(matches!(
            installer().check_entry(&name, 0, false),
            Err(ArchiveError::PathTooDeep { limit: 10, .. })
        ));
    }

    #[test]
    fn check_entry_rejects_oversized_declaration() {
        let installer = ArchiveInstaller::new(
            ArchiveLimits {
                max_file_bytes: 1024,
                ..ArchiveLimits::default()
            },
            "terraform",
        );
        assert!(matches!(
            installer.check_entry("terraform", 1025, false),
            Err(ArchiveError::SizeLimitExceeded { limit: 1024, .. })
        ));
        assert!(installer.check_entry("terraform", 1024, false).unwrap().is_some());
    }

    #[test]
    fn copy_capped_stops_at_cap_for_endless_stream() {
        let mut endless = io::repeat(0);
        let mut sink = Vec::new();

        let result = copy_capped(&mut endless, &mut sink, 1024, "bomb");

        assert!(matches!(
            result,
            Err(ArchiveError::SizeLimitExceeded { limit: 1024, .. })
        ));
        assert_eq!(sink.len(), 1024);
    }

    #[test]
    fn copy_capped_accepts_exactly_cap_bytes() {
        let mut reader = Cursor::new(vec![7u8; 1024]);
        let mut sink = Vec::new();

        assert_eq!(copy_capped(&mut reader, &mut sink, 1024, "exact").unwrap(), 1024);
        assert_eq!(sink.len(), 1024);
    }

    #[test]
    fn extract_writes_files_with_restrictive_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let archive = zip_with(&[
            ("terraform", "#!/bin/sh\necho terraform\n"),
            ("LICENSE.txt", "license"),
            ("docs/", ""),
            ("docs/README.md", "readme"),
        ]);

        let installed = installer()
            .extract(archive, temp_dir.path(), "1.5.0")
            .unwrap();

        let root = temp_dir.path().join("1.5.0").canonicalize().unwrap();
        assert_eq!(installed.path, root);
        assert_eq!(installed.executable, root.join("terraform"));
        assert_eq!(installed.files, 3);
        assert_eq!(fs::read(root.join("docs/README.md")).unwrap(), b"readme");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode(&root.join("terraform")), 0o755);
            assert_eq!(mode(&root.join("LICENSE.txt")), 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn extract_marks_only_top_level_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let archive = zip_with(&[
            ("terraform", "binary"),
            ("docs/", ""),
            ("docs/terraform", "not the binary"),
            ("plugins/bin/terraform", "not the binary either"),
        ]);

        installer()
            .extract(archive, temp_dir.path(), "1.5.0")
            .unwrap();

        let root = temp_dir.path().join("1.5.0");
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&root.join("terraform")), 0o755);
        assert_eq!(mode(&root.join("docs/terraform")), 0o600);
        assert_eq!(mode(&root.join("plugins/bin/terraform")), 0o600);
    }

    #[test]
    fn extract_rejects_invalid_version_identifier() {
        let temp_dir = TempDir::new().unwrap();
        let archive = zip_with(&[("terraform", "bin")]);

        assert!(matches!(
            installer().extract(archive, temp_dir.path(), "../1.5.0"),
            Err(ArchiveError::PathTraversal { .. })
        ));
    }

    #[test]
    fn extract_rejects_non_zip_input() {
        let temp_dir = TempDir::new().unwrap();
        let result = installer().extract(
            Cursor::new(b"<html>not found</html>".to_vec()),
            temp_dir.path(),
            "1.5.0",
        );
        assert!(matches!(result, Err(ArchiveError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn extract_refuses_to_write_through_planted_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let destination = temp_dir.path().join("1.5.0");
        fs::create_dir_all(&destination).unwrap();
        std::os::unix::fs::symlink(outside.path(), destination.join("docs")).unwrap();

        let archive = zip_with(&[("docs/README.md", "payload")]);
        let result = installer().extract(archive, temp_dir.path(), "1.5.0");

        assert!(matches!(result, Err(ArchiveError::PathTraversal { .. })));
        assert!(!outside.path().join("README.md").exists());
    }

    #[test]
    fn security_violations_are_classified() {
        assert!(ArchiveError::TooManyEntries { limit: 1 }.is_security_violation());
        assert!(
            ArchiveError::PathTraversal {
                entry: "..".into()
            }
            .is_security_violation()
        );
        assert!(
            ArchiveError::SizeMismatch {
                entry: "terraform".into(),
                declared: 16,
                actual: 64,
            }
            .is_security_violation()
        );
        assert!(
            !ArchiveError::Corrupt(zip::result::ZipError::FileNotFound).is_security_violation()
        );
    }
}
