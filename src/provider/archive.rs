use crate::error::FmError;
use crate::provider::FileProvider;
use crate::utils::path::{normalize_logical, parent_and_name};
use std::fs;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// What the transport layer streams back: either the raw file or an
/// anonymous temp file holding a finished zip archive, already rewound.
#[derive(Debug)]
pub enum DownloadPayload {
    File {
        path: std::path::PathBuf,
        name: String,
    },
    Archive {
        file: fs::File,
        name: String,
    },
}

impl FileProvider {
    /// Resolve a single file for inline preview streaming (image
    /// thumbnails and the like). Requires `read` on the file.
    pub fn preview(&self, path: &str, role: Option<&str>) -> Result<PathBuf, FmError> {
        let logical = normalize_logical(path);
        let physical = self.physical(&logical);
        let meta = fs::metadata(&physical)?;
        if !meta.is_file() {
            return Err(FmError::NotFound(format!(
                "{} not found in given location.",
                logical
            )));
        }
        let (parent, name) = parent_and_name(&logical);
        if let Some(p) = self.access().resolve(&parent, &name, true, role) {
            if !p.read {
                return Err(FmError::denied(Some(&p), &name, "read"));
            }
        }
        Ok(physical)
    }

    /// Prepare a download for the named entries under `path`. Every
    /// entry needs `read` and `download`. A single file streams raw; a
    /// single folder zips its subtree under the folder's name, and any
    /// other selection zips the entries at their relative paths. Any
    /// failure while archiving aborts with no partial payload.
    pub fn download(
        &self,
        path: &str,
        names: &[String],
        role: Option<&str>,
    ) -> Result<DownloadPayload, FmError> {
        if names.is_empty() {
            return Err(FmError::Other("no files to download".to_string()));
        }

        let mut all_files = true;
        for name in names {
            let physical = self.physical(&format!("{}/{}", path, name));
            let meta = fs::metadata(&physical)?;
            let is_file = meta.is_file();
            if !is_file {
                all_files = false;
            }
            if let Some(p) = self.access().resolve(path, name, is_file, role) {
                if !p.read || !p.download {
                    return Err(FmError::denied(Some(&p), name, "download"));
                }
            }
        }

        if names.len() == 1 {
            let name = &names[0];
            let physical = self.physical(&format!("{}/{}", path, name));
            if all_files {
                return Ok(DownloadPayload::File {
                    path: physical,
                    name: name.clone(),
                });
            }
            // One folder: archive its subtree prefixed with its name.
            let mut archive = tempfile::tempfile().map_err(FmError::from)?;
            {
                let mut writer = ZipWriter::new(&mut archive);
                add_dir(&mut writer, &physical, name)?;
                writer.finish().map_err(zip_err)?;
            }
            archive.rewind().map_err(FmError::from)?;
            return Ok(DownloadPayload::Archive {
                file: archive,
                name: format!("{}.zip", name),
            });
        }

        let mut archive = tempfile::tempfile().map_err(FmError::from)?;
        {
            let mut writer = ZipWriter::new(&mut archive);
            for name in names {
                let physical = self.physical(&format!("{}/{}", path, name));
                if physical.is_dir() {
                    add_dir(&mut writer, &physical, name)?;
                } else {
                    add_file(&mut writer, &physical, name)?;
                }
            }
            writer.finish().map_err(zip_err)?;
        }
        archive.rewind().map_err(FmError::from)?;
        let archive_name = if all_files { "files.zip" } else { "folders.zip" };
        Ok(DownloadPayload::Archive {
            file: archive,
            name: archive_name.to_string(),
        })
    }
}

fn zip_err(err: zip::result::ZipError) -> FmError {
    FmError::Other(err.to_string())
}

fn add_file<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    physical: &Path,
    entry_name: &str,
) -> Result<(), FmError> {
    writer
        .start_file(entry_name, SimpleFileOptions::default())
        .map_err(zip_err)?;
    let mut file = fs::File::open(physical)?;
    io::copy(&mut file, writer)?;
    Ok(())
}

/// Walk `dir` depth-first, writing each file under `prefix/…`. Empty
/// directories become zero-length directory entries so they survive
/// extraction.
fn add_dir<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    dir: &Path,
    prefix: &str,
) -> Result<(), FmError> {
    let mut stack = vec![(dir.to_path_buf(), prefix.to_string())];
    while let Some((current, current_prefix)) = stack.pop() {
        let mut entries = fs::read_dir(&current)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        if entries.is_empty() {
            writer
                .add_directory(format!("{}/", current_prefix), SimpleFileOptions::default())
                .map_err(zip_err)?;
            continue;
        }
        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            let child_prefix = format!("{}/{}", current_prefix, name);
            let path = entry.path();
            if path.is_dir() {
                stack.push((path, child_prefix));
            } else {
                add_file(writer, &path, &child_prefix)?;
            }
        }
    }
    Ok(())
}
