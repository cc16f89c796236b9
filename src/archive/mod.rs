//! Deterministic gzipped tar archives
//!
//! The archive places the source directory's contents at the archive root.
//! Entries are written in sorted path order with zeroed timestamps and
//! ownership, so two archives of identical trees are byte-identical and
//! produce the same CID.

use crate::error::{Result, TpkmError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, EntryType, Header};

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .map_err(|e| TpkmError::Io(format!("cannot read {}: {e}", dir.display())))?
    {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|e| TpkmError::Io(format!("path escape in {}: {e}", path.display())))?
            .to_path_buf();
        out.push(rel);
        if path.is_dir() {
            collect_entries(root, &path, out)?;
        }
    }
    Ok(())
}

fn base_header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Build a gzipped tar of `source`'s contents into the file at `dest`
pub fn archive_dir(source: &Path, dest: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(TpkmError::Validation(format!(
            "{} is not a directory",
            source.display()
        )));
    }
    let mut entries = Vec::new();
    collect_entries(source, source, &mut entries)?;
    entries.sort();

    let file = File::create(dest)
        .map_err(|e| TpkmError::Io(format!("cannot create {}: {e}", dest.display())))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);

    for rel in entries {
        let full = source.join(&rel);
        let metadata = match fs::metadata(&full) {
            Ok(m) => m,
            // A symlink whose target is gone: warn and move on
            Err(e) if full.symlink_metadata().map(|m| m.is_symlink()).unwrap_or(false) => {
                log::warn!("skipping broken symlink {}: {e}", full.display());
                continue;
            }
            Err(e) => {
                return Err(TpkmError::Io(format!("cannot stat {}: {e}", full.display())));
            }
        };
        if metadata.is_dir() {
            let mut header = base_header(EntryType::Directory, DIR_MODE, 0);
            builder
                .append_data(&mut header, &rel, io::empty())
                .map_err(|e| TpkmError::Io(format!("cannot archive {}: {e}", rel.display())))?;
        } else {
            let mut header = base_header(EntryType::Regular, FILE_MODE, metadata.len());
            let reader = File::open(&full)
                .map_err(|e| TpkmError::Io(format!("cannot open {}: {e}", full.display())))?;
            builder
                .append_data(&mut header, &rel, reader)
                .map_err(|e| TpkmError::Io(format!("cannot archive {}: {e}", rel.display())))?;
        }
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| TpkmError::Io(format!("cannot finish archive: {e}")))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| TpkmError::Io(format!("cannot finish compression: {e}")))?;
    writer
        .flush()
        .map_err(|e| TpkmError::Io(format!("cannot flush archive: {e}")))?;
    Ok(())
}

/// Stream a gzipped tar into `target`, creating it and any parents
pub fn extract<R: Read>(reader: R, target: &Path) -> Result<()> {
    fs::create_dir_all(target)
        .map_err(|e| TpkmError::Io(format!("cannot create {}: {e}", target.display())))?;
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive
        .unpack(target)
        .map_err(|e| TpkmError::Io(format!("cannot extract into {}: {e}", target.display())))?;
    Ok(())
}
