//! Reader for recorded execution-data files.
//!
//! The on-disk format is a sequence of tagged blocks: a file header carrying a
//! magic number and format version, session-info blocks and execution-data
//! blocks. Scalars are big-endian, strings are u16-length-prefixed UTF-8, and
//! probe arrays are stored as a var-int count followed by bit-packed bytes.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{ExecFileData, ExecutionRecord, SessionInfo};

pub const BLOCK_HEADER: u8 = 0x01;
pub const BLOCK_SESSION_INFO: u8 = 0x10;
pub const BLOCK_EXEC_DATA: u8 = 0x11;

pub const MAGIC: u16 = 0xC0C0;
pub const FORMAT_VERSION: u16 = 0x1007;

/// Load one execution-data file into its in-memory model. Duplicate records
/// for the same class are merged by OR-ing their probe arrays.
pub fn read_exec_file(path: &Path) -> Result<ExecFileData> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read execution data file: {}", path.display()))?;
    parse(&bytes).with_context(|| format!("invalid execution data file: {}", path.display()))
}

fn parse(bytes: &[u8]) -> Result<ExecFileData> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut data = ExecFileData::default();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    while !reader.at_end() {
        let block = reader.read_u8()?;
        match block {
            BLOCK_HEADER => {
                let magic = reader.read_u16()?;
                if magic != MAGIC {
                    bail!("bad magic number: 0x{magic:04X}");
                }
                let version = reader.read_u16()?;
                if version != FORMAT_VERSION {
                    bail!("unsupported format version: 0x{version:04X}");
                }
            }
            BLOCK_SESSION_INFO => {
                let id = reader.read_utf()?;
                let start = reader.read_i64()?;
                let dump = reader.read_i64()?;
                data.sessions.push(SessionInfo { id, start, dump });
            }
            BLOCK_EXEC_DATA => {
                let id = reader.read_i64()?;
                let name = reader.read_utf()?;
                let probes = reader.read_bool_array()?;
                merge_record(&mut data.records, &mut by_name, id, name, probes)?;
            }
            other => bail!("unknown block type: 0x{other:02X}"),
        }
    }

    Ok(data)
}

fn merge_record(
    records: &mut Vec<ExecutionRecord>,
    by_name: &mut HashMap<String, usize>,
    id: i64,
    name: String,
    probes: Vec<bool>,
) -> Result<()> {
    if let Some(&idx) = by_name.get(&name) {
        let existing = &mut records[idx];
        if existing.id != id {
            bail!("conflicting class id for {name}: {} vs {id}", existing.id);
        }
        if existing.probes.len() != probes.len() {
            bail!(
                "incompatible probe array for {name}: {} vs {} probes",
                existing.probes.len(),
                probes.len()
            );
        }
        for (slot, probe) in existing.probes.iter_mut().zip(probes) {
            *slot |= probe;
        }
    } else {
        by_name.insert(name.clone(), records.len());
        records.push(ExecutionRecord { id, name, probes });
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let end = self.pos.checked_add(len).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => bail!("truncated input at offset {}", self.pos),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let raw = self.take(2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let raw = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(i64::from_be_bytes(buf))
    }

    fn read_utf(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).context("string is not valid UTF-8")
    }

    /// Var-ints store 7 bits per byte, least significant group first, with the
    /// high bit marking continuation.
    fn read_var_int(&mut self) -> Result<usize> {
        let mut value = 0usize;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 28 {
                bail!("var-int is too long");
            }
        }
    }

    fn read_bool_array(&mut self) -> Result<Vec<bool>> {
        let count = self.read_var_int()?;
        let mut probes = Vec::with_capacity(count);
        let mut buffer = 0u8;
        for i in 0..count {
            if i % 8 == 0 {
                buffer = self.read_u8()?;
            }
            probes.push(buffer & (1 << (i % 8)) != 0);
        }
        Ok(probes)
    }
}
