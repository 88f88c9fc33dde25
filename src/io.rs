//! Reading sequence records from FASTA files.
//!
//! Files ending in `.gz` or `.bgz` are decompressed on the fly.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use flate2::read::MultiGzDecoder;
use noodles::fasta;

use crate::error::Result;

pub struct FastaSource {
    reader: fasta::io::Reader<Box<dyn BufRead + Send>>,
}

impl FastaSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let inner: Box<dyn BufRead + Send> = if is_gzipped(path) {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self::from_reader(inner))
    }

    pub fn from_reader(inner: Box<dyn BufRead + Send>) -> Self {
        Self {
            reader: fasta::io::Reader::new(inner),
        }
    }

    /// The sequences of all records. A malformed or unreadable record yields an error.
    pub fn records(&mut self) -> impl Iterator<Item = std::io::Result<Vec<u8>>> + '_ {
        self.reader
            .records()
            .map(|result| result.map(|record| record.sequence().as_ref().to_vec()))
    }
}

fn is_gzipped(path: &Path) -> bool {
    let path = path.to_string_lossy().to_lowercase();
    path.ends_with(".gz") || path.ends_with(".bgz")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::{write::GzEncoder, Compression};
    use tempfile::NamedTempFile;

    use super::FastaSource;

    #[test]
    fn reads_multiline_records() {
        let input = ">first\nACGT\nacgt\n>second description\nNNAC\n";
        let mut source = FastaSource::from_reader(Box::new(Cursor::new(input)));
        let records: Vec<_> = source.records().map(Result::unwrap).collect();
        assert_eq!(records, [b"ACGTacgt".to_vec(), b"NNAC".to_vec()]);
    }

    #[test]
    fn reads_gzipped_files() {
        let mut file = tempfile::Builder::new().suffix(".fa.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">chr\nGATTACA\n").unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();
        file.flush().unwrap();

        let mut source = FastaSource::open(file.path()).unwrap();
        let records: Vec<_> = source.records().map(Result::unwrap).collect();
        assert_eq!(records, [b"GATTACA".to_vec()]);
    }

    #[test]
    fn missing_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("missing");
        assert!(FastaSource::open(path).is_err());
    }
}
