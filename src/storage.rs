//! Snapshot I/O for populated strategy tables.
//!
//! Format: a gzip stream of bincode records, each `(game: u32, value: V)`.
//! Records are length-delimited by the encoding itself, so loading streams
//! until EOF; later records override earlier ones for the same key. Saves
//! write keys in ascending order to a temporary file and rename it over the
//! target, so a failed run never leaves a partial snapshot and a
//! save → load → save cycle is byte-identical.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_GAME;
use crate::game_mechanics::GameState;
use crate::observables::Observable;
use crate::state_computation::StrategyTable;

/// Snapshot failure with file context.
#[derive(Debug)]
pub enum SnapshotError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Decode {
        path: PathBuf,
        source: bincode::Error,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io { path, source } => {
                write!(f, "snapshot I/O error for {}: {}", path.display(), source)
            }
            SnapshotError::Decode { path, source } => {
                write!(f, "snapshot decode error for {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io { source, .. } => Some(source),
            SnapshotError::Decode { source, .. } => Some(source),
        }
    }
}

impl SnapshotError {
    fn io(path: &Path, source: io::Error) -> Self {
        SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn decode(path: &Path, source: bincode::Error) -> Self {
        SnapshotError::Decode {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Unwrap bincode's I/O wrapper so file errors keep their kind.
    fn codec(path: &Path, source: bincode::Error) -> Self {
        match *source {
            bincode::ErrorKind::Io(io_err) => SnapshotError::io(path, io_err),
            other => SnapshotError::decode(path, Box::new(other)),
        }
    }
}

#[derive(Serialize)]
struct RecordRef<'a, V> {
    game: u32,
    value: &'a V,
}

#[derive(Deserialize)]
struct Record<V> {
    game: u32,
    value: V,
}

/// Write every populated entry to a gzip snapshot, atomically replacing
/// `path`.
pub fn save_table<V: Observable>(table: &StrategyTable<V>, path: &Path) -> Result<(), SnapshotError> {
    let start = Instant::now();
    let tmp = path.with_extension("tmp");

    let file = File::create(&tmp).map_err(|e| SnapshotError::io(&tmp, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    let mut written = 0usize;
    for (game, value) in table.iter_set() {
        let record = RecordRef {
            game: game.0,
            value,
        };
        bincode::serialize_into(&mut encoder, &record)
            .map_err(|e| SnapshotError::codec(&tmp, e))?;
        written += 1;
    }

    encoder
        .finish()
        .and_then(|w| w.into_inner().map_err(|e| e.into_error()))
        .and_then(|f| f.sync_all().map(|_| f))
        .map_err(|e| SnapshotError::io(&tmp, e))?;

    fs::rename(&tmp, path).map_err(|e| SnapshotError::io(path, e))?;

    println!(
        "Saved {} states to {} in {:.2}s",
        written,
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Load a snapshot into a fresh table. A decode failure discards the
/// partial load.
pub fn load_table<V: Observable>(path: &Path) -> Result<StrategyTable<V>, SnapshotError> {
    let start = Instant::now();
    let file = File::open(path).map_err(|e| SnapshotError::io(path, e))?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(file));

    let mut table = StrategyTable::new();
    let mut loaded = 0usize;
    loop {
        match bincode::deserialize_from::<_, Record<V>>(&mut decoder) {
            Ok(record) => {
                if record.game as usize >= MAX_GAME {
                    let msg = format!("game key {} out of range", record.game);
                    return Err(SnapshotError::decode(
                        path,
                        Box::new(bincode::ErrorKind::Custom(msg)),
                    ));
                }
                table.set(GameState(record.game), record.value);
                loaded += 1;
            }
            Err(e) => {
                let clean_eof = matches!(
                    &*e,
                    bincode::ErrorKind::Io(io_err)
                        if io_err.kind() == io::ErrorKind::UnexpectedEof
                );
                if clean_eof {
                    break;
                }
                return Err(SnapshotError::decode(path, e));
            }
        }
    }

    println!(
        "Loaded {} states from {} in {:.2}s",
        loaded,
        path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(table)
}
