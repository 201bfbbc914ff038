use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coordinator::ClearingOutcome;
use crate::error::JournalError;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One durable entry in the intent journal.
///
/// On-disk format, one frame per record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized JournalRecord)]
/// ```
///
/// `Reserved` is written before the ledger submission, `Completed` after
/// finality, `Failed` when the clearing definitely did not happen. A
/// `Reserved` with no later `Completed` or `Failed` therefore marks an
/// intent whose fate is unknown after a crash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JournalRecord {
    Reserved {
        intent_id: String,
        payload_hash: [u8; 32],
    },
    Completed {
        intent_id: String,
        payload_hash: [u8; 32],
        outcome: ClearingOutcome,
    },
    Failed {
        intent_id: String,
        payload_hash: [u8; 32],
        reason: String,
    },
}

impl JournalRecord {
    fn intent_id(&self) -> &str {
        match self {
            JournalRecord::Reserved { intent_id, .. }
            | JournalRecord::Completed { intent_id, .. }
            | JournalRecord::Failed { intent_id, .. } => intent_id,
        }
    }
}

/// What recovery knows about a previously seen intent.
#[derive(Clone, Debug, PartialEq)]
pub enum RecoveredIntent {
    /// A reservation with no completion record. The transfer may or may not
    /// have reached the ledger; only reconciliation can tell.
    Indeterminate { payload_hash: [u8; 32] },
    /// The intent cleared and its outcome is replayable.
    Done {
        payload_hash: [u8; 32],
        outcome: ClearingOutcome,
    },
}

struct JournalWriter {
    writer: BufWriter<File>,
    offset: u64,
}

/// Append-only, crash-recoverable record of every intent the coordinator has
/// accepted. This is the durable half of the idempotency barrier: the
/// in-process slot map is rebuilt from it on startup.
///
/// Every append is flushed and fsynced before the caller proceeds. Recovery
/// reads front-to-back and stops at the first torn frame, so a crash mid-write
/// loses at most the record being written.
pub struct IntentJournal {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
}

impl IntentJournal {
    /// Open (or create) the journal and replay it into a recovery map.
    ///
    /// Later records win: a `Completed` overwrites the `Reserved` it follows,
    /// and a `Failed` removes the intent entirely so the caller may retry it.
    pub fn open(path: &Path) -> Result<(Self, HashMap<String, RecoveredIntent>), JournalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let recovered = Self::replay(path)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        let journal = Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                offset,
            }),
        };
        Ok((journal, recovered))
    }

    /// Record that an intent has been accepted and is about to be submitted.
    pub fn reserve(&self, intent_id: &str, payload_hash: [u8; 32]) -> Result<(), JournalError> {
        self.append(&JournalRecord::Reserved {
            intent_id: intent_id.to_string(),
            payload_hash,
        })
    }

    /// Record the final outcome of a cleared intent. May be written more than
    /// once for the same intent (honoring status upgrades); the last record
    /// wins on replay.
    pub fn complete(
        &self,
        intent_id: &str,
        payload_hash: [u8; 32],
        outcome: &ClearingOutcome,
    ) -> Result<(), JournalError> {
        self.append(&JournalRecord::Completed {
            intent_id: intent_id.to_string(),
            payload_hash,
            outcome: outcome.clone(),
        })
    }

    /// Record that the clearing definitely did not happen.
    pub fn fail(
        &self,
        intent_id: &str,
        payload_hash: [u8; 32],
        reason: &str,
    ) -> Result<(), JournalError> {
        self.append(&JournalRecord::Failed {
            intent_id: intent_id.to_string(),
            payload_hash,
            reason: reason.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        let payload = bincode::serialize(record)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let mut w = self.writer.lock().expect("journal mutex poisoned");
        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;
        w.writer.get_ref().sync_all()?;
        w.offset += HEADER_SIZE as u64 + payload.len() as u64;

        debug!(intent = record.intent_id(), len = payload.len(), "journal append");
        Ok(())
    }

    /// Read the journal front-to-back into the per-intent recovery state.
    ///
    /// Frames with a bad length, a CRC mismatch, or a truncated payload end
    /// the scan: anything past a torn write is unreliable.
    fn replay(path: &Path) -> Result<HashMap<String, RecoveredIntent>, JournalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut recovered: HashMap<String, RecoveredIntent> = HashMap::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            reader.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || (offset + HEADER_SIZE as u64 + length as u64) > file_len {
                warn!(offset, length, file_len, "invalid journal frame length; stopping replay");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated journal frame; stopping replay");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "journal CRC mismatch; stopping replay"
                );
                break;
            }

            match bincode::deserialize::<JournalRecord>(&payload) {
                Ok(JournalRecord::Reserved {
                    intent_id,
                    payload_hash,
                }) => {
                    recovered
                        .entry(intent_id)
                        .or_insert(RecoveredIntent::Indeterminate { payload_hash });
                }
                Ok(JournalRecord::Completed {
                    intent_id,
                    payload_hash,
                    outcome,
                }) => {
                    recovered.insert(
                        intent_id,
                        RecoveredIntent::Done {
                            payload_hash,
                            outcome,
                        },
                    );
                }
                Ok(JournalRecord::Failed { intent_id, .. }) => {
                    // A definite failure releases the key for resubmission.
                    recovered.remove(&intent_id);
                }
                Err(e) => {
                    warn!(offset, error = %e, "undecodable journal record; stopping replay");
                    break;
                }
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        debug!(intents = recovered.len(), "journal replay complete");
        Ok(recovered)
    }
}
