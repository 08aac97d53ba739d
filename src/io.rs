//! Binary buffer files exchanged with the CLI host.
//!
//! Layout (little-endian): magic `b"SMXB"`, dtype `u8`, rows `u32`, cols `u32`, then
//! `rows * cols` elements in row-major order. Labels are stored as a `u8` vector with
//! one of the two dimensions equal to 1.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::mem::size_of;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::epoch::BatchedSoftmaxUpdater;
use crate::matrix::Matrix;

const MAGIC: u32 = 0x4258_4d53; /* b"SMXB" */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
    U8,
}

impl DType {
    fn tag(self) -> u8 {
        match self {
            DType::F32 => 0,
            DType::U8 => 1,
        }
    }

    fn from_tag(tag: u8) -> anyhow::Result<Self> {
        match tag {
            0 => Ok(DType::F32),
            1 => Ok(DType::U8),
            _ => Err(anyhow::anyhow!("unsupported dtype tag: {}", tag)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub dtype: DType,
    pub rows: usize,
    pub cols: usize,
}

impl Header {
    pub fn read<R: Read>(reader: &mut R) -> anyhow::Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != MAGIC {
            return Err(anyhow::anyhow!("not a buffer file (magic {:#010x})", magic));
        }
        let dtype = DType::from_tag(reader.read_u8()?)?;
        let rows = reader.read_u32::<LittleEndian>()? as usize;
        let cols = reader.read_u32::<LittleEndian>()? as usize;
        Ok(Self { dtype, rows, cols })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        writer.write_u32::<LittleEndian>(MAGIC)?;
        writer.write_u8(self.dtype.tag())?;
        writer.write_u32::<LittleEndian>(u32::try_from(self.rows)?)?;
        writer.write_u32::<LittleEndian>(u32::try_from(self.cols)?)?;
        Ok(())
    }

    fn len(&self) -> anyhow::Result<usize> {
        self.rows.checked_mul(self.cols)
            .ok_or_else(|| anyhow::anyhow!("buffer of {}x{} elements is too large", self.rows, self.cols))
    }

    /// Reads exactly the payload announced by the header; the allocation is bounded by
    /// what the reader actually delivers, not by the header.
    fn read_payload<R: Read>(&self, reader: &mut R, elem_size: usize) -> anyhow::Result<Vec<u8>> {
        let bytes = self.len()?.checked_mul(elem_size)
            .ok_or_else(|| anyhow::anyhow!("buffer of {}x{} elements is too large", self.rows, self.cols))?;
        let mut payload = Vec::new();
        reader.take(bytes as u64).read_to_end(&mut payload)?;
        if payload.len() != bytes {
            return Err(anyhow::anyhow!("buffer of {}x{} elements exceeds file size", self.rows, self.cols));
        }
        Ok(payload)
    }

    fn expect(&self, dtype: DType) -> anyhow::Result<()> {
        if self.dtype != dtype {
            return Err(anyhow::anyhow!("expected {:?} buffer, found {:?}", dtype, self.dtype));
        }
        Ok(())
    }
}

pub fn read_f32_matrix<R: Read>(reader: &mut R) -> anyhow::Result<Matrix> {
    let header = Header::read(reader)?;
    header.expect(DType::F32)?;
    let payload = header.read_payload(reader, size_of::<f32>())?;
    let mut data = vec![0.0; payload.len() / size_of::<f32>()];
    (&payload[..]).read_f32_into::<LittleEndian>(&mut data)?;
    Ok(Matrix::from_buffer("matrix", data, header.rows, header.cols)?)
}

pub fn write_f32_matrix<W: Write, S: AsRef<[f32]>>(writer: &mut W, matrix: &Matrix<S>) -> anyhow::Result<()> {
    Header { dtype: DType::F32, rows: matrix.rows(), cols: matrix.cols() }.write(writer)?;
    for &value in matrix.as_slice() {
        writer.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

pub fn read_labels<R: Read>(reader: &mut R) -> anyhow::Result<Vec<u8>> {
    let header = Header::read(reader)?;
    header.expect(DType::U8)?;
    if header.rows != 1 && header.cols != 1 {
        return Err(anyhow::anyhow!("labels must be a vector, found {}x{}", header.rows, header.cols));
    }
    header.read_payload(reader, size_of::<u8>())
}

pub fn write_labels<W: Write>(writer: &mut W, labels: &[u8]) -> anyhow::Result<()> {
    Header { dtype: DType::U8, rows: labels.len(), cols: 1 }.write(writer)?;
    writer.write_all(labels)?;
    Ok(())
}

pub fn load_matrix(path: &Path) -> anyhow::Result<Matrix> {
    let mut reader = BufReader::new(File::open(path)?);
    read_f32_matrix(&mut reader)
}

pub fn load_labels(path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    read_labels(&mut reader)
}

/// Writes to a sibling `.tmp` file and renames it over `path`, so an interrupted
/// write never leaves a truncated matrix behind.
pub fn save_matrix<S: AsRef<[f32]>>(path: &Path, matrix: &Matrix<S>) -> anyhow::Result<()> {
    let tmp = path.with_extension("tmp");
    let written = File::create(&tmp).map_err(anyhow::Error::from).and_then(|file| {
        let mut writer = BufWriter::new(file);
        write_f32_matrix(&mut writer, matrix)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(())
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// One epoch over buffer files: loads X, y and theta, runs the update and stores theta
/// in `out`. Nothing is written unless the epoch succeeded.
pub fn epoch_files(
    updater: &BatchedSoftmaxUpdater,
    x: &Path,
    y: &Path,
    theta: &Path,
    out: &Path,
) -> anyhow::Result<Matrix> {
    let x_matrix = load_matrix(x)?;
    let labels = load_labels(y)?;
    let mut theta_matrix = load_matrix(theta)?;
    let config = updater.config();
    log::info!(
        "epoch over {} examples: n={}, k={}, lr={}, batch={}",
        x_matrix.rows(), x_matrix.cols(), theta_matrix.cols(), config.lr, config.batch
    );
    updater.run_epoch(&x_matrix, &labels, &mut theta_matrix)?;
    save_matrix(out, &theta_matrix)?;
    log::info!("wrote {}", out.display());
    Ok(theta_matrix)
}
