//! Tarball packing and unpacking.
//!
//! `.tar.gz` archives are produced in-process with `tar` + `flate2`. `.tar.xz`
//! archives stream the same tar bytes through the external `xz` tool. Every
//! archive holds a single root directory named after the packed workspace.

use crate::bundler::error::{Context, Error, ErrorExt, Result};
use crate::bundler::utils::{fs, process::require_tool};
use crate::keys::ArchiveFormat;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Packs directory `from` into the archive at `to`.
///
/// The archive's single root entry is the basename of `from`. Symlinks are
/// stored as links and header metadata is normalized, so packing the same
/// tree twice yields identical tar bytes.
pub async fn pack(from: &Path, to: &Path, format: ArchiveFormat) -> Result<()> {
    let root_name = from
        .file_name()
        .with_context(|| format!("cannot pack {}: no directory name", from.display()))?
        .to_owned();
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent, false).await?;
    }
    fs::remove_file(to).await?;

    log::info!("packing tarball from {} to {}", from.display(), to.display());

    let xz = match format {
        ArchiveFormat::Gzip => None,
        ArchiveFormat::Xz => Some(require_tool("xz")?),
    };

    let from = from.to_path_buf();
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || match xz {
        None => pack_gzip(&from, &root_name, &to),
        Some(xz) => pack_xz(&xz, &from, &root_name, &to),
    })
    .await
    .map_err(|e| Error::GenericError(format!("archive task failed: {e}")))?
}

fn tar_into<W: Write>(writer: W, from: &Path, root_name: &std::ffi::OsStr) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(root_name, from)
        .fs_context("adding directory to archive", from)?;
    Ok(builder.into_inner()?)
}

fn pack_gzip(from: &Path, root_name: &std::ffi::OsStr, to: &Path) -> Result<()> {
    let file = std::fs::File::create(to).fs_context("creating archive", to)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let encoder = tar_into(encoder, from, root_name)?;
    encoder.finish().fs_context("finishing gzip stream", to)?;
    Ok(())
}

fn pack_xz(xz: &Path, from: &Path, root_name: &std::ffi::OsStr, to: &Path) -> Result<()> {
    use std::process::{Command, Stdio};

    let out = std::fs::File::create(to).fs_context("creating archive", to)?;
    let command = format!("{} -z -c", xz.display());
    let mut child = Command::new(xz)
        .args(["-z", "-c"])
        .stdin(Stdio::piped())
        .stdout(out)
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| Error::CommandFailed {
            command: command.clone(),
            error,
        })?;

    let stdin = child
        .stdin
        .take()
        .context("xz stdin was not captured")?;
    // stdin is dropped here, closing the pipe so xz can finish.
    let written = tar_into(stdin, from, root_name).map(drop);

    let output = child.wait_with_output().map_err(|error| Error::CommandFailed {
        command: command.clone(),
        error,
    })?;
    if !output.status.success() {
        return Err(Error::ProcessFailed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    written
}

/// Unpacks the `.tar.gz` at `archive` into `dest`, dropping the leading
/// `strip` directory from every entry.
///
/// Entries that would land outside `dest` are rejected.
pub async fn unpack_gzip(archive: &Path, dest: &Path, strip: &str) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let strip = strip.to_string();
    tokio::task::spawn_blocking(move || unpack_gzip_blocking(&archive, &dest, &strip))
        .await
        .map_err(|e| Error::GenericError(format!("extract task failed: {e}")))?
}

fn unpack_gzip_blocking(archive: &Path, dest: &Path, strip: &str) -> Result<()> {
    let file = std::fs::File::open(archive).fs_context("opening archive", archive)?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    tar.set_preserve_permissions(true);

    for entry in tar.entries().fs_context("reading archive", archive)? {
        let mut entry = entry.fs_context("reading archive entry", archive)?;
        let path = entry.path().fs_context("reading entry path", archive)?.into_owned();
        let relative = match path.strip_prefix(strip) {
            Ok(rest) => rest.to_path_buf(),
            Err(_) => path.clone(),
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = safe_join(dest, &relative).with_context(|| {
            format!("archive entry {} escapes {}", path.display(), dest.display())
        })?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }
        entry.unpack(&target).fs_context("extracting entry", &target)?;
    }
    Ok(())
}

fn safe_join(dest: &Path, relative: &Path) -> Option<PathBuf> {
    let mut joined = dest.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(joined)
}

/// Extracts the single file `member` from the `.tar.gz` at `archive` to `dest`.
pub async fn extract_member(archive: &Path, member: &str, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let member = PathBuf::from(member);
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&archive).fs_context("opening archive", &archive)?;
        let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
        for entry in tar.entries().fs_context("reading archive", &archive)? {
            let mut entry = entry.fs_context("reading archive entry", &archive)?;
            if entry.path().fs_context("reading entry path", &archive)?.as_ref() == member.as_path() {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
                }
                entry.unpack(&dest).fs_context("extracting entry", &dest)?;
                return Ok(());
            }
        }
        Err(Error::GenericError(format!(
            "{} not found in {}",
            member.display(),
            archive.display()
        )))
    })
    .await
    .map_err(|e| Error::GenericError(format!("extract task failed: {e}")))?
}
