//! IDX record files.
//!
//! A split lives in a directory with two files:
//!
//! ```text
//! patches.idx   0x00 0x00 <dtype> <rank>   dims (rank × big-endian u32)   data
//! labels.idx    0x00 0x00 0x08    0x01     N (big-endian u32)             N × u8
//! ```
//!
//! `dtype` is `0x08` (u8, scaled to `[0, 1]` by dividing by 255) or `0x0D`
//! (big-endian f32, used as is). The first patch dimension is the record
//! count; the rest is the patch shape.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecordError;

pub const PATCHES_FILE: &str = "patches.idx";
pub const LABELS_FILE: &str = "labels.idx";

const DTYPE_U8: u8 = 0x08;
const DTYPE_F32: u8 = 0x0D;

/// A fully decoded split held in memory.
#[derive(Debug, Clone)]
pub struct Split {
    pub patch_shape: Vec<usize>,
    pub patches: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn patch_len(&self) -> usize {
        self.patch_shape.iter().product()
    }
}

/// Reads `patches.idx` and `labels.idx` from `dir`.
pub fn load_split(dir: &Path) -> Result<Split, RecordError> {
    let patches_path = dir.join(PATCHES_FILE);
    let labels_path = dir.join(LABELS_FILE);

    let patch_bytes = read(&patches_path)?;
    let label_bytes = read(&labels_path)?;

    let (dims, patches) = parse_patches(&patch_bytes)
        .map_err(|reason| RecordError::Format { path: patches_path.clone(), reason })?;
    let labels = parse_labels(&label_bytes)
        .map_err(|reason| RecordError::Format { path: labels_path.clone(), reason })?;

    if labels.len() != patches.len() {
        return Err(RecordError::Format {
            path: labels_path,
            reason: format!(
                "patch file declares {} records but label file declares {}",
                patches.len(),
                labels.len()
            ),
        });
    }

    Ok(Split { patch_shape: dims[1..].to_vec(), patches, labels })
}

fn read(path: &Path) -> Result<Vec<u8>, RecordError> {
    fs::read(path).map_err(|source| RecordError::Io { path: path.to_path_buf(), source })
}

fn be_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

/// Validates the 4-byte magic and the dimension table. Returns the dims and
/// the offset of the first data byte.
fn parse_header(bytes: &[u8]) -> Result<(u8, Vec<usize>, usize), String> {
    if bytes.len() < 4 {
        return Err(format!("expected at least 4 header bytes, got {}", bytes.len()));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(format!(
            "bytes 0-1 must be 0x00 0x00 (reserved), got 0x{:02X} 0x{:02X}",
            bytes[0], bytes[1]
        ));
    }
    let dtype = bytes[2];
    if dtype != DTYPE_U8 && dtype != DTYPE_F32 {
        return Err(format!("unsupported dtype 0x{:02X} (expected 0x08 or 0x0D)", dtype));
    }
    let rank = bytes[3] as usize;
    if rank == 0 {
        return Err("rank must be at least 1".to_owned());
    }
    let data_start = 4 + 4 * rank;
    if bytes.len() < data_start {
        return Err(format!(
            "header declares rank {} ({} header bytes) but file is only {} bytes",
            rank, data_start, bytes.len()
        ));
    }
    let dims = (0..rank).map(|i| be_u32(bytes, 4 + 4 * i)).collect();
    Ok((dtype, dims, data_start))
}

fn parse_patches(bytes: &[u8]) -> Result<(Vec<usize>, Vec<Vec<f64>>), String> {
    let (dtype, dims, start) = parse_header(bytes)?;
    if dims.len() < 2 {
        return Err(format!("patch file must have rank >= 2, got {}", dims.len()));
    }

    let patch_len = dims[1..].iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("patch dims {:?} overflow usize", &dims[1..]))?;
    if patch_len == 0 {
        return Err(format!("patch dims {:?} contain a zero", &dims[1..]));
    }
    let width = if dtype == DTYPE_F32 { 4 } else { 1 };
    let needed = dims[0]
        .checked_mul(patch_len)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| "data length overflows usize".to_owned())?;
    if bytes.len() - start < needed {
        return Err(format!(
            "header declares {} patches of {:?} ({} data bytes) but only {} follow the header",
            dims[0], &dims[1..], needed, bytes.len() - start
        ));
    }

    let data = &bytes[start..start + needed];
    let patches = if dtype == DTYPE_F32 {
        data.chunks_exact(patch_len * 4)
            .map(|chunk| {
                chunk.chunks_exact(4)
                    .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64)
                    .collect()
            })
            .collect()
    } else {
        data.chunks_exact(patch_len)
            .map(|chunk| chunk.iter().map(|&px| px as f64 / 255.0).collect())
            .collect()
    };
    Ok((dims, patches))
}

fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>, String> {
    let (dtype, dims, start) = parse_header(bytes)?;
    if dtype != DTYPE_U8 {
        return Err(format!("label dtype must be 0x08 (uint8), got 0x{:02X}", dtype));
    }
    if dims.len() != 1 {
        return Err(format!("label file must have rank 1, got {}", dims.len()));
    }
    let n = dims[0];
    if bytes.len() - start < n {
        return Err(format!(
            "header declares {} labels but only {} bytes follow the header",
            n, bytes.len() - start
        ));
    }
    Ok(bytes[start..start + n].iter().map(|&b| b as usize).collect())
}

/// Encodes patches as an f32 IDX file with the given patch shape.
pub fn encode_patches(patch_shape: &[usize], patches: &[Vec<f64>]) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, DTYPE_F32, (patch_shape.len() + 1) as u8];
    out.extend_from_slice(&(patches.len() as u32).to_be_bytes());
    for &d in patch_shape {
        out.extend_from_slice(&(d as u32).to_be_bytes());
    }
    for patch in patches {
        for &v in patch {
            out.extend_from_slice(&(v as f32).to_be_bytes());
        }
    }
    out
}

/// Encodes class indices as a u8 IDX1 file.
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, DTYPE_U8, 0x01];
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}

/// Writes a split directory readable by `load_split`.
pub fn write_split(
    dir: &Path,
    patch_shape: &[usize],
    patches: &[Vec<f64>],
    labels: &[u8],
) -> Result<(), RecordError> {
    let io_err = |path: PathBuf| move |source| RecordError::Io { path, source };
    fs::create_dir_all(dir).map_err(io_err(dir.to_path_buf()))?;
    let patches_path = dir.join(PATCHES_FILE);
    fs::write(&patches_path, encode_patches(patch_shape, patches))
        .map_err(io_err(patches_path.clone()))?;
    let labels_path = dir.join(LABELS_FILE);
    fs::write(&labels_path, encode_labels(labels)).map_err(io_err(labels_path.clone()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_patches_are_scaled() {
        let mut bytes = vec![0x00, 0x00, 0x08, 0x03];
        for d in [2u32, 1, 2] {
            bytes.extend_from_slice(&d.to_be_bytes());
        }
        bytes.extend_from_slice(&[0, 255, 51, 102]);
        let (dims, patches) = parse_patches(&bytes).unwrap();
        assert_eq!(dims, vec![2, 1, 2]);
        assert_eq!(patches, vec![vec![0.0, 1.0], vec![0.2, 0.4]]);
    }

    #[test]
    fn split_written_to_disk_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let patches = vec![vec![0.5, -1.0, 2.0, 0.25], vec![0.0, 0.0, 1.0, 1.0]];
        write_split(dir.path(), &[2, 2], &patches, &[1, 0]).unwrap();
        let split = load_split(dir.path()).unwrap();
        assert_eq!(split.patch_shape, vec![2, 2]);
        assert_eq!(split.patches, patches);
        assert_eq!(split.labels, vec![1, 0]);
    }

    #[test]
    fn rejects_bad_magic_and_truncation() {
        assert!(parse_header(&[0x01, 0x00, 0x08, 0x01]).is_err());
        assert!(parse_header(&[0x00, 0x00, 0x09, 0x01]).is_err());
        let mut truncated = encode_labels(&[1, 2, 3]);
        truncated.pop();
        assert!(parse_labels(&truncated).is_err());
    }

    #[test]
    fn count_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PATCHES_FILE), encode_patches(&[1], &[vec![0.0], vec![1.0]])).unwrap();
        fs::write(dir.path().join(LABELS_FILE), encode_labels(&[0])).unwrap();
        let err = load_split(dir.path()).unwrap_err();
        assert!(matches!(err, RecordError::Format { .. }));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_split(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
    }
}
