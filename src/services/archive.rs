use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::services::error::Result;

/// A file to pack and the name it gets inside the archive.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    pub name: String,
    pub path: PathBuf,
}

/// Write `members` into a new zip at `dest`. Blocking; a failed write removes
/// the partial archive.
pub fn write_archive(members: &[ArchiveMember], dest: &Path) -> Result<()> {
    let result = write_members(members, dest);
    if result.is_err() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

fn write_members(members: &[ArchiveMember], dest: &Path) -> Result<()> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for member in members {
        zip.start_file(member.name.as_str(), options)?;
        let mut source = File::open(&member.path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}
