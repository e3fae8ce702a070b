// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Safe extraction of zip and tar family archives.

use crate::error::{DistError, Result};
use crate::platform::file_ops;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive as TarArchive;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    Tar,
    TarGz,
    TarXz,
    TarBz2,
}

/// Extract an archive into `destination`, creating it when missing.
///
/// The archive type comes from the file extension, falling back to the
/// leading magic bytes. On Windows extraction goes through the extended-length
/// form of `destination`.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<()> {
    let destination = file_ops::long_path(destination);
    fs::create_dir_all(&destination)?;

    let archive_type = detect_archive_type(archive_path)?;
    log::debug!(
        "Extracting {} ({archive_type:?}) to {}",
        archive_path.display(),
        destination.display()
    );

    match archive_type {
        ArchiveType::Zip => extract_zip(archive_path, &destination),
        tar_type => extract_tar(archive_path, tar_type, &destination),
    }
}

pub fn detect_archive_type(path: &Path) -> Result<ArchiveType> {
    if let Some(archive_type) = archive_type_from_name(&path.to_string_lossy()) {
        return Ok(archive_type);
    }

    detect_by_content(path)
}

/// Archive type implied by a file name, if any.
pub fn archive_type_from_name(name: &str) -> Option<ArchiveType> {
    let name = name.to_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveType::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveType::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(ArchiveType::TarXz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(ArchiveType::TarBz2)
    } else if name.ends_with(".tar") {
        Some(ArchiveType::Tar)
    } else {
        None
    }
}

fn detect_by_content(path: &Path) -> Result<ArchiveType> {
    let mut file = File::open(path)?;
    let mut header = Vec::with_capacity(512);
    file.by_ref().take(512).read_to_end(&mut header)?;

    if header.starts_with(&[0x50, 0x4b])
        && header.len() >= 4
        && matches!(header[2], 0x03 | 0x05 | 0x07)
    {
        return Ok(ArchiveType::Zip);
    }
    if header.starts_with(&[0x1f, 0x8b]) {
        return Ok(ArchiveType::TarGz);
    }
    if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
        return Ok(ArchiveType::TarXz);
    }
    if header.starts_with(b"BZh") {
        return Ok(ArchiveType::TarBz2);
    }
    if header.len() >= 262 && &header[257..262] == b"ustar" {
        return Ok(ArchiveType::Tar);
    }

    Err(DistError::Extract(format!(
        "Unsupported archive format: {}",
        path.display()
    )))
}

fn tar_reader(archive_path: &Path, archive_type: ArchiveType) -> Result<Box<dyn Read>> {
    let file = File::open(archive_path)?;
    let reader: Box<dyn Read> = match archive_type {
        ArchiveType::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
        ArchiveType::TarXz => Box::new(xz2::read::XzDecoder::new(file)),
        ArchiveType::TarBz2 => Box::new(bzip2::read::BzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(reader)
}

fn extract_tar(archive_path: &Path, archive_type: ArchiveType, destination: &Path) -> Result<()> {
    let mut archive = TarArchive::new(tar_reader(archive_path, archive_type)?);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);

    let mut extracted_count = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        validate_entry_path(&path)?;

        let entry_type = entry.header().entry_type();
        if (entry_type.is_symlink() || entry_type.is_hard_link())
            && let Some(target) = entry.link_name()?
        {
            // Hard link targets are relative to the archive root.
            let base = if entry_type.is_symlink() {
                path.parent()
            } else {
                None
            };
            validate_link_target(&path, base, &target)?;
        }

        // unpack_in refuses entries whose parent resolves outside `destination`,
        // including through symlinks unpacked earlier.
        if !entry.unpack_in(destination)? {
            return Err(DistError::SecurityError(format!(
                "Archive entry would extract outside destination: {path:?}"
            )));
        }
        extracted_count += 1;

        if extracted_count % 100 == 0 {
            log::debug!("Extracted {extracted_count} files...");
        }
    }

    log::info!("Extracted {extracted_count} files from {archive_type:?} archive");
    Ok(())
}

fn extract_zip(archive_path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let total_files = archive.len();

    for i in 0..total_files {
        let mut file = archive.by_index(i)?;
        let raw_name = file.name().to_string();
        validate_entry_path(Path::new(&raw_name))?;
        let outpath = match file.enclosed_name() {
            Some(path) => destination.join(path),
            None => {
                return Err(DistError::SecurityError(format!(
                    "Archive entry would extract outside destination: {raw_name}"
                )));
            }
        };

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut file, &mut outfile)?;

        if let Some(mode) = file.unix_mode() {
            file_ops::set_permissions_from_mode(&outpath, mode)?;
        }

        if (i + 1) % 100 == 0 {
            log::debug!("Extracted {}/{} files...", i + 1, total_files);
        }
    }

    log::info!("Extracted {total_files} files from zip archive");
    Ok(())
}

fn validate_entry_path(entry_path: &Path) -> Result<()> {
    for component in entry_path.components() {
        match component {
            Component::ParentDir => {
                return Err(DistError::SecurityError(format!(
                    "Archive contains path traversal: {entry_path:?}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(DistError::SecurityError(format!(
                    "Archive contains absolute path: {entry_path:?}"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Link entries must point at a relative path that stays inside the archive
/// root when resolved from `base`.
fn validate_link_target(entry_path: &Path, base: Option<&Path>, target: &Path) -> Result<()> {
    let escape = || {
        DistError::SecurityError(format!(
            "Archive link {entry_path:?} points outside destination: {target:?}"
        ))
    };

    let mut depth = base
        .map(|base| {
            base.components()
                .filter(|component| matches!(component, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1).ok_or_else(escape)?,
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(())
}

/// File name of an archive without its archive extension (`pkg.tar.gz` -> `pkg`).
pub fn strip_archive_extension(file_name: &str) -> String {
    const EXTENSIONS: [&str; 8] = [
        ".tar.gz", ".tar.xz", ".tar.bz2", ".tgz", ".txz", ".tbz2", ".tar", ".zip",
    ];
    let lower = file_name.to_lowercase();
    for extension in EXTENSIONS {
        if lower.ends_with(extension) {
            return file_name[..file_name.len() - extension.len()].to_string();
        }
    }
    PathBuf::from(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
