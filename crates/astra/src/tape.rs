//! File-backed preprocessing tapes.
//!
//! The prep-phase parties 1 and 2 append length-prefixed batches of raw
//! limbs; the online parties consume them strictly in order. A tape is
//! written by exactly one protocol instance and read by exactly one, both
//! identified by party and thread number. All failures are fatal.
use crate::errors::Error;
use crate::octets::Octets;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `Player-Data/3-<protocol>-Z2k<bits>/<name>-P<party>-T<thread>`
pub fn tape_path(
    player_data: &Path,
    protocol: &str,
    bits: usize,
    name: &str,
    party: usize,
    thread: usize,
) -> PathBuf {
    player_data
        .join(format!("3-{protocol}-Z2k{bits}"))
        .join(format!("{name}-P{party}-T{thread}"))
}

pub struct TapeWriter {
    file: BufWriter<File>,
    path: PathBuf,
    party: usize,
    thread: usize,
    batches: usize,
}

impl TapeWriter {
    pub fn create(path: PathBuf, party: usize, thread: usize) -> Result<Self, Error> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| Error::Io {
                path: path.clone(),
                party,
                thread,
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| Error::Io {
            path: path.clone(),
            party,
            thread,
            source,
        })?;
        debug!(?path, party, "created preprocessing tape");
        Ok(Self {
            file: BufWriter::new(file),
            path,
            party,
            thread,
            batches: 0,
        })
    }

    /// Append one batch and flush it to disk.
    pub fn write_batch(&mut self, os: &Octets) -> Result<(), Error> {
        os.write_to(&mut self.file)
            .and_then(|()| self.file.flush())
            .map_err(|source| Error::Io {
                path: self.path.clone(),
                party: self.party,
                thread: self.thread,
                source,
            })?;
        self.batches += 1;
        Ok(())
    }

    pub fn batches_written(&self) -> usize {
        self.batches
    }
}

pub struct TapeReader {
    file: BufReader<File>,
    path: PathBuf,
    party: usize,
    thread: usize,
    offset: u64,
}

impl TapeReader {
    pub fn open(path: PathBuf, party: usize, thread: usize) -> Result<Self, Error> {
        let file = File::open(&path).map_err(|source| Error::Io {
            path: path.clone(),
            party,
            thread,
            source,
        })?;
        Ok(Self {
            file: BufReader::new(file),
            path,
            party,
            thread,
            offset: 0,
        })
    }

    /// Consume the next batch. Exhaustion or a short read means the online
    /// phase requested more preprocessing than was produced.
    pub fn read_batch(&mut self) -> Result<Octets, Error> {
        match Octets::read_from(&mut self.file) {
            Ok(os) => {
                self.offset += 8 + os.len() as u64;
                Ok(os)
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                Err(Error::InsufficientPreprocessing {
                    party: self.party,
                    offset: self.offset,
                    batch_size: 0,
                    needed: 1,
                })
            }
            Err(source) => Err(Error::Io {
                path: self.path.clone(),
                party: self.party,
                thread: self.thread,
                source,
            }),
        }
    }

    /// Like [`Self::read_batch`], but reports the expected batch size on
    /// exhaustion.
    pub fn read_batch_of<R: crate::ring::Ring>(
        &mut self,
        n_items: usize,
    ) -> Result<Octets, Error> {
        let os = self.read_batch().map_err(|err| match err {
            Error::InsufficientPreprocessing { party, offset, .. } => {
                Error::InsufficientPreprocessing {
                    party,
                    offset,
                    batch_size: n_items,
                    needed: n_items * R::BYTES,
                }
            }
            other => other,
        })?;
        if os.len() < n_items * R::BYTES {
            return Err(Error::InsufficientPreprocessing {
                party: self.party,
                offset: self.offset,
                batch_size: n_items,
                needed: n_items * R::BYTES - os.len(),
            });
        }
        Ok(os)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Ring;

    #[test]
    fn write_then_read_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = tape_path(dir.path(), "astra", <u64 as Ring>::BITS, "Protocol", 1, 0);
        let mut writer = TapeWriter::create(path.clone(), 1, 0).unwrap();
        for batch in 0..3u64 {
            let mut os = Octets::new();
            os.store(batch);
            os.store(batch * 10);
            writer.write_batch(&os).unwrap();
        }
        assert_eq!(writer.batches_written(), 3);

        let mut reader = TapeReader::open(path, 1, 0).unwrap();
        for batch in 0..3u64 {
            let mut os = reader.read_batch_of::<u64>(2).unwrap();
            assert_eq!(os.get::<u64>().unwrap(), batch);
            assert_eq!(os.get::<u64>().unwrap(), batch * 10);
        }
        let err = reader.read_batch().unwrap_err();
        assert!(matches!(err, Error::InsufficientPreprocessing { .. }));
    }

    #[test]
    fn short_batch_is_insufficient_preprocessing() {
        let dir = tempfile::tempdir().unwrap();
        let path = tape_path(dir.path(), "trio", <u64 as Ring>::BITS, "Protocol", 2, 0);
        let mut writer = TapeWriter::create(path.clone(), 2, 0).unwrap();
        let mut os = Octets::new();
        os.store(1u64);
        writer.write_batch(&os).unwrap();

        let mut reader = TapeReader::open(path, 2, 0).unwrap();
        let err = reader.read_batch_of::<u64>(2).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPreprocessing { party: 2, .. }
        ));
    }
}
