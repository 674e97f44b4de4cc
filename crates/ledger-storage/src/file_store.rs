use ledger_core::{genesis_block, Block, ChainStore, LedgerError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const LENGTH_FILE: &str = "chain-length.txt";

pub fn block_file_name(index: u64) -> String {
    format!("block-{index}.json")
}

/// One pretty-printed JSON document per block plus a plain decimal length
/// marker, all in a single directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    length: u64,
}

impl FileStore {
    /// Opens `dir`, creating it and writing genesis if no length marker exists.
    pub fn init<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let length_path = dir.join(LENGTH_FILE);
        if !length_path.exists() {
            let mut store = Self { dir, length: 0 };
            let genesis = genesis_block();
            store.append_block(&genesis)?;
            info!(dir = %store.dir.display(), hash = %genesis.hash, "created genesis block");
            return Ok(store);
        }

        let raw = fs::read_to_string(&length_path)?;
        let length = raw
            .trim()
            .parse::<u64>()
            .map_err(|e| LedgerError::CorruptLength(format!("{raw:?}: {e}")))?;
        if length == 0 {
            return Err(LedgerError::CorruptLength(
                "chain must hold at least the genesis block".to_string(),
            ));
        }
        info!(dir = %dir.display(), length, "file store opened");
        Ok(Self { dir, length })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn block_path(&self, index: u64) -> PathBuf {
        self.dir.join(block_file_name(index))
    }

    pub fn length_path(&self) -> PathBuf {
        self.dir.join(LENGTH_FILE)
    }

    fn write_record(&self, block: &Block) -> Result<()> {
        let json = serde_json::to_string_pretty(block)?;
        write_replace(&self.block_path(block.index), json.as_bytes())
    }

    fn write_length(&self, length: u64) -> Result<()> {
        write_replace(&self.length_path(), length.to_string().as_bytes())
    }
}

/// Writes to a sibling temp file and renames it over `path`, so a reader never
/// observes a half-written file.
fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl ChainStore for FileStore {
    fn append_block(&mut self, block: &Block) -> Result<()> {
        if block.index != self.length {
            return Err(LedgerError::OutOfOrder {
                expected: self.length,
                got: block.index,
            });
        }
        self.write_record(block)?;
        // commit point
        self.write_length(self.length + 1)?;
        self.length += 1;
        debug!(index = block.index, "block committed");
        Ok(())
    }

    fn read_block(&self, index: u64) -> Result<Block> {
        if index >= self.length {
            return Err(LedgerError::NotFound(index));
        }
        let raw = match fs::read_to_string(self.block_path(index)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LedgerError::NotFound(index))
            }
            Err(e) => return Err(e.into()),
        };
        let block: Block = serde_json::from_str(&raw).map_err(|e| LedgerError::Corrupt {
            index,
            reason: e.to_string(),
        })?;
        if block.index != index {
            return Err(LedgerError::Corrupt {
                index,
                reason: format!("record holds block {}", block.index),
            });
        }
        Ok(block)
    }

    fn length(&self) -> u64 {
        self.length
    }
}
