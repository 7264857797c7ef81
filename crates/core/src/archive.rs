use crate::budget::ExpansionMeter;
use crate::error::IngestError;
use crate::models::{ArchiveEntry, RejectedEntry, SkippedFile};
use crate::sanitizer::check_entry_path;
use crate::scratch::ScratchTracker;
use serde::Serialize;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub original_name: String,
    pub entry_path: String,
}

#[derive(Debug, Default)]
pub struct UnpackedArchive {
    pub root: Option<PathBuf>,
    pub files: Vec<ExtractedFile>,
    pub rejected: Vec<RejectedEntry>,
    pub refused: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryVerdict {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub rejection: Option<String>,
}

pub fn unpack(
    bytes: &[u8],
    archive_name: &str,
    tracker: &mut ScratchTracker,
    meter: &mut ExpansionMeter,
) -> Result<UnpackedArchive, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut unpacked = UnpackedArchive::default();

    if archive.is_empty() {
        return Ok(unpacked);
    }

    let root = tracker.allocate()?;
    unpacked.root = Some(root.clone());

    for index in 0..archive.len() {
        let entry_name = archive
            .by_index_raw(index)
            .map(|file| file.name().to_string())
            .unwrap_or_else(|_| format!("{archive_name}#{index}"));

        let entry = match read_entry(&mut archive, index, archive_name, meter, &mut unpacked) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(IngestError::BudgetExceeded(reason)) => {
                warn!(archive = %archive_name, %reason, "expansion budget exhausted, stopping unpack");
                unpacked.refused.push(SkippedFile {
                    filename: archive_name.to_string(),
                    reason,
                });
                break;
            }
            Err(error) => {
                warn!(archive = %archive_name, entry = %entry_name, error = %error, "unreadable archive entry");
                unpacked.refused.push(SkippedFile {
                    filename: entry_name,
                    reason: error.to_string(),
                });
                continue;
            }
        };

        match materialize(&root, &entry) {
            Ok(path) => {
                debug!(archive = %archive_name, entry = %entry.raw_path, path = %path.display(), "extracted entry");
                unpacked.files.push(ExtractedFile {
                    path,
                    original_name: leaf_name(&entry.raw_path),
                    entry_path: entry.raw_path,
                });
            }
            Err(error) => {
                warn!(archive = %archive_name, entry = %entry.raw_path, error = %error, "failed to write entry");
                unpacked.refused.push(SkippedFile {
                    filename: entry.raw_path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(unpacked)
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    index: usize,
    archive_name: &str,
    meter: &mut ExpansionMeter,
    unpacked: &mut UnpackedArchive,
) -> Result<Option<ArchiveEntry>, IngestError> {
    let file = archive.by_index(index)?;
    if file.is_dir() {
        return Ok(None);
    }

    let raw_path = file.name().to_string();
    let rejection = match check_entry_path(&raw_path) {
        Err(reason) => Some(reason.to_string()),
        Ok(()) if file.enclosed_name().is_none() => {
            Some("entry escapes the extraction root".to_string())
        }
        Ok(()) => None,
    };

    if let Some(reason) = rejection {
        warn!(target: "security", archive = %archive_name, entry = %raw_path, %reason, "rejected archive entry");
        unpacked.rejected.push(RejectedEntry {
            archive: archive_name.to_string(),
            entry_path: raw_path,
            reason,
        });
        return Ok(None);
    }

    meter.admit_file()?;

    let limit = meter.entry_read_limit();
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;

    let len = bytes.len() as u64;
    if len > meter.budget().max_entry_bytes {
        unpacked.refused.push(SkippedFile {
            filename: raw_path,
            reason: format!(
                "entry larger than {} bytes",
                meter.budget().max_entry_bytes
            ),
        });
        return Ok(None);
    }
    meter.charge_bytes(len)?;

    Ok(Some(ArchiveEntry {
        raw_path,
        bytes,
        is_directory: false,
    }))
}

fn path_segments(raw_path: &str) -> impl DoubleEndedIterator<Item = &str> {
    raw_path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
}

fn materialize(root: &Path, entry: &ArchiveEntry) -> Result<PathBuf, IngestError> {
    let relative = path_segments(&entry.raw_path).collect::<PathBuf>();
    let target = root.join(relative);

    if target.exists() {
        return Err(IngestError::InvalidArgument(format!(
            "duplicate entry {}",
            entry.raw_path
        )));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, &entry.bytes)?;
    Ok(target)
}

fn leaf_name(raw_path: &str) -> String {
    path_segments(raw_path)
        .next_back()
        .unwrap_or(raw_path)
        .to_string()
}

pub fn inspect(bytes: &[u8]) -> Result<Vec<EntryVerdict>, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut verdicts = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let file = match archive.by_index_raw(index) {
            Ok(file) => file,
            Err(error) => {
                verdicts.push(EntryVerdict {
                    name: format!("#{index}"),
                    is_directory: false,
                    size: 0,
                    rejection: Some(format!("unreadable entry: {error}")),
                });
                continue;
            }
        };
        let name = file.name().to_string();
        let rejection = match check_entry_path(&name) {
            _ if file.is_dir() => None,
            Err(reason) => Some(reason.to_string()),
            Ok(()) if file.enclosed_name().is_none() => {
                Some("entry escapes the extraction root".to_string())
            }
            Ok(()) => None,
        };

        verdicts.push(EntryVerdict {
            is_directory: file.is_dir(),
            size: file.size(),
            rejection,
            name,
        });
    }

    Ok(verdicts)
}
