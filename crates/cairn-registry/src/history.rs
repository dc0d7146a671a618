//! Ownership history — the versioned record of which node owned a named
//! service slot, and the two policies for persisting it.
//!
//! Both serializers share one record shape; they differ only in how many
//! entries they write. The full policy keeps the whole chain (minus
//! anything a pruning boundary releases); the non-historical policy
//! collapses the chain to its newest version, for persistence targets that
//! need current state only.
//!
//! Records are `#[repr(C, packed)]` with zerocopy derives, like every other
//! fixed-layout record in cairn.

use std::io::{self, Read, Write};

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use cairn_core::{NodeKey, ServiceId};

use crate::pruning::PruningBoundary;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("cannot serialize an empty history")]
    Empty,
    #[error("history stream ended early")]
    Truncated,
    #[error("history versions are not strictly increasing")]
    NonMonotonic,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One link in an ownership chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipEntry {
    pub version: u64,
    pub owner: NodeKey,
}

/// The ordered-by-version ownership chain of one service slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipHistory {
    service: ServiceId,
    entries: Vec<OwnershipEntry>,
}

impl OwnershipHistory {
    pub fn new(service: ServiceId) -> Self {
        Self {
            service,
            entries: Vec::new(),
        }
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest to newest.
    pub fn entries(&self) -> &[OwnershipEntry] {
        &self.entries
    }

    /// The newest version, if any.
    pub fn current(&self) -> Option<&OwnershipEntry> {
        self.entries.last()
    }

    /// Append the next version. Versions must be strictly increasing.
    pub fn push(&mut self, version: u64, owner: NodeKey) -> Result<(), HistoryError> {
        if let Some(last) = self.entries.last() {
            if version <= last.version {
                return Err(HistoryError::NonMonotonic);
            }
        }
        self.entries.push(OwnershipEntry { version, owner });
        Ok(())
    }
}

// ── Record shape ──────────────────────────────────────────────────────────────

/// Stream prefix: which service the chain belongs to and how many entry
/// records follow.
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
struct HistoryHeader {
    service: u32,
    entry_count: u64,
}

assert_eq_size!(HistoryHeader, [u8; 12]);

/// One serialized version entry. Shared by both policies.
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
struct OwnershipRecord {
    version: u64,
    owner: [u8; 32],
}

assert_eq_size!(OwnershipRecord, [u8; 40]);

fn read_record<const N: usize>(
    input: &mut impl Read,
) -> Result<[u8; N], HistoryError> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            HistoryError::Truncated
        } else {
            HistoryError::Io(e)
        }
    })?;
    Ok(buf)
}

fn write_entries(
    history: &OwnershipHistory,
    entries: &[&OwnershipEntry],
    output: &mut impl Write,
) -> Result<(), HistoryError> {
    let header = HistoryHeader {
        service: history.service.0,
        entry_count: entries.len() as u64,
    };
    output.write_all(header.as_bytes())?;
    for entry in entries {
        let record = OwnershipRecord {
            version: entry.version,
            owner: entry.owner,
        };
        output.write_all(record.as_bytes())?;
    }
    Ok(())
}

fn read_header(input: &mut impl Read) -> Result<(ServiceId, u64), HistoryError> {
    let buf = read_record::<12>(input)?;
    let header = HistoryHeader::read_from(&buf[..]).ok_or(HistoryError::Truncated)?;
    let service = header.service;
    let entry_count = header.entry_count;
    Ok((ServiceId(service), entry_count))
}

fn read_entry(input: &mut impl Read) -> Result<OwnershipEntry, HistoryError> {
    let buf = read_record::<40>(input)?;
    let record = OwnershipRecord::read_from(&buf[..]).ok_or(HistoryError::Truncated)?;
    let version = record.version;
    Ok(OwnershipEntry {
        version,
        owner: record.owner,
    })
}

// ── Policies ──────────────────────────────────────────────────────────────────

/// Saves and loads the entire ownership chain, oldest to newest.
pub struct HistoryFullSerializer;

impl HistoryFullSerializer {
    /// Write `history` to `output`. When `boundary` is set, entries with a
    /// version strictly before the cut are omitted; the newest entry is
    /// always retained.
    pub fn save(
        history: &OwnershipHistory,
        output: &mut impl Write,
        boundary: &PruningBoundary<u64>,
    ) -> Result<(), HistoryError> {
        if history.is_empty() {
            return Err(HistoryError::Empty);
        }

        let retained: Vec<&OwnershipEntry> = match boundary.get() {
            Some(&cut) => {
                let mut kept: Vec<_> = history
                    .entries
                    .iter()
                    .filter(|entry| entry.version >= cut)
                    .collect();
                if kept.is_empty() {
                    // boundary past the end of the chain; current state stays
                    kept.push(history.entries.last().ok_or(HistoryError::Empty)?);
                }
                kept
            }
            None => history.entries.iter().collect(),
        };

        write_entries(history, &retained, output)
    }

    pub fn load(input: &mut impl Read) -> Result<OwnershipHistory, HistoryError> {
        let (service, entry_count) = read_header(input)?;
        if entry_count == 0 {
            return Err(HistoryError::Empty);
        }

        let mut history = OwnershipHistory::new(service);
        for _ in 0..entry_count {
            let entry = read_entry(input)?;
            history.push(entry.version, entry.owner)?;
        }
        Ok(history)
    }
}

/// Saves and loads only the current version, collapsing the chain.
pub struct HistoryNonHistoricalSerializer;

impl HistoryNonHistoricalSerializer {
    /// Write only the newest version of `history` to `output`.
    pub fn save(
        history: &OwnershipHistory,
        output: &mut impl Write,
    ) -> Result<(), HistoryError> {
        let current = history.current().ok_or(HistoryError::Empty)?;
        write_entries(history, &[current], output)
    }

    /// Read a chain and collapse it: the result always holds exactly one
    /// version, the newest present in the stream.
    pub fn load(input: &mut impl Read) -> Result<OwnershipHistory, HistoryError> {
        let (service, entry_count) = read_header(input)?;
        if entry_count == 0 {
            return Err(HistoryError::Empty);
        }

        let mut newest = read_entry(input)?;
        for _ in 1..entry_count {
            newest = read_entry(input)?;
        }

        let mut history = OwnershipHistory::new(service);
        history.push(newest.version, newest.owner)?;
        Ok(history)
    }
}
