// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Event Log Writer
//!
//! This is the durability layer. A record is written and fsync'd before the
//! in-memory ledger sees it.
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header: magic `MAMS`, version u32 (1), reserved u64 (0).
//!
//! Frame: `[len: u32 LE][crc32: u32 LE][bincode(LogEntry)]`.

use chrono::{DateTime, Utc};
use mams_kernel::event::EventRecord;
use mams_kernel::types::EventKind;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"MAMS";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: usize = 16;
const FRAME_PREFIX: usize = 8;

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid header")]
    InvalidHeader,

    #[error("Event log corrupted at offset {offset}")]
    Corrupted { offset: usize },
}

pub type Result<T> = std::result::Result<T, EventLogError>;

/// One durable log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogEntry {
    Event(EventRecord),
    /// Events of `kind` appended before this marker are hidden from listings.
    Retract { kind: EventKind, at: DateTime<Utc> },
}

fn header_bytes() -> [u8; HEADER_LEN] {
    let mut bytes = [0u8; HEADER_LEN];
    bytes[0..4].copy_from_slice(&MAGIC);
    bytes[4..8].copy_from_slice(&VERSION.to_le_bytes());
    bytes
}

fn check_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < HEADER_LEN || bytes[0..4] != MAGIC {
        return Err(EventLogError::InvalidHeader);
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    if u32::from_le_bytes(version) != VERSION {
        return Err(EventLogError::InvalidHeader);
    }
    Ok(())
}

pub fn encode_frame(entry: &LogEntry) -> Result<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(entry, bincode::config::standard())
        .map_err(|e| EventLogError::Serialization(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| EventLogError::Serialization("entry too large".to_string()))?;

    let mut frame = Vec::with_capacity(FRAME_PREFIX + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decoded contents of a log file.
#[derive(Debug, Default)]
pub struct LogScan {
    pub entries: Vec<LogEntry>,
    /// Bytes covered by the header and complete frames.
    pub valid_len: u64,
    /// A partial frame was found after `valid_len` (crash mid-append).
    pub torn_tail: bool,
}

/// Decodes a whole log image. A short final frame is tolerated; a checksum
/// or decode failure anywhere is corruption.
pub fn scan_log(bytes: &[u8]) -> Result<LogScan> {
    check_header(bytes)?;

    let mut scan = LogScan::default();
    let mut offset = HEADER_LEN;
    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < FRAME_PREFIX {
            scan.torn_tail = true;
            break;
        }
        let len = read_u32(&rest[0..4]) as usize;
        let crc = read_u32(&rest[4..8]);
        let Some(payload) = rest.get(FRAME_PREFIX..FRAME_PREFIX + len) else {
            scan.torn_tail = true;
            break;
        };
        if crc32fast::hash(payload) != crc {
            return Err(EventLogError::Corrupted { offset });
        }
        let (entry, _) = bincode::serde::decode_from_slice::<LogEntry, _>(payload, bincode::config::standard())
            .map_err(|_| EventLogError::Corrupted { offset })?;
        scan.entries.push(entry);
        offset += FRAME_PREFIX + len;
    }
    scan.valid_len = offset as u64;
    Ok(scan)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

/// Reads the log at `path`. A missing file reads as empty.
pub fn read_event_log(path: impl AsRef<Path>) -> Result<LogScan> {
    let mut file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LogScan::default()),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    if bytes.is_empty() {
        return Ok(LogScan::default());
    }
    scan_log(&bytes)
}

/// Append-Only Event Log Writer
///
/// # Safety Guarantees
/// - Write + fsync before returning
/// - A torn tail left by a crash is cut off on open
pub struct EventLogWriter {
    path: PathBuf,
    file: BufWriter<File>,
    entry_count: u64,
}

impl EventLogWriter {
    /// Open or create an event log file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let entry_count = if bytes.is_empty() {
            file.write_all(&header_bytes())?;
            file.sync_all()?;
            0
        } else {
            let scan = scan_log(&bytes)?;
            if scan.torn_tail {
                tracing::warn!(
                    "Truncating incomplete frame at end of {:?} (offset {})",
                    path,
                    scan.valid_len
                );
                file.set_len(scan.valid_len)?;
                file.sync_all()?;
            }
            scan.entries.len() as u64
        };

        Ok(Self {
            path,
            file: BufWriter::new(file),
            entry_count,
        })
    }

    /// Append an entry; returns only after the bytes are on disk.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let frame = encode_frame(entry)?;
        self.file.write_all(&frame)?;
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.entry_count += 1;
        Ok(())
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
