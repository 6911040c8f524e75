use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta::{self as fasta, record::{Definition, Sequence}, Record};
use rustc_hash::FxHashSet;

use crate::aligner::ThreewayAlignment;
use crate::errors::ThreewayError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedSequence {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Open a FASTA file, transparently decompressing it if the file name ends with `.gz`.
pub fn open_fasta(path: &Path) -> Result<fasta::io::Reader<Box<dyn BufRead>>, ThreewayError> {
    let is_gzipped = path
        .file_name()
        .map(|v| v.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false);

    let reader_inner: Box<dyn BufRead> = if is_gzipped {
        Box::new(
            File::open(path)
                .map(MultiGzDecoder::new)
                .map(BufReader::new)?,
        )
    } else {
        Box::new(File::open(path).map(BufReader::new)?)
    };

    Ok(fasta::io::Reader::new(reader_inner))
}

/// Read all records, in file order. Empty sequences and duplicate identifiers are errors.
pub fn read_sequences<R: BufRead>(reader: &mut fasta::io::Reader<R>) -> Result<Vec<NamedSequence>, ThreewayError> {
    let mut seen = FxHashSet::default();
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result?;
        let name = String::from_utf8_lossy(record.name()).to_string();

        let sequence: &[u8] = record.sequence().as_ref();
        if sequence.is_empty() {
            return Err(ThreewayError::EmptySequence(name));
        }

        if !seen.insert(name.clone()) {
            return Err(ThreewayError::DuplicateIdentifier(name));
        }

        sequences.push(NamedSequence {
            name,
            sequence: sequence.to_vec(),
        });
    }

    Ok(sequences)
}

/// Write the three aligned rows as FASTA records.
pub fn write_alignment_fasta<W: Write>(
    output: W,
    names: [&str; 3],
    alignment: &ThreewayAlignment,
) -> Result<(), ThreewayError> {
    let mut writer = fasta::io::Writer::new(output);

    for (name, row) in names.into_iter().zip(alignment.rows()) {
        let header = Definition::new(name, None);
        let record = Record::new(header, Sequence::from(row.to_vec()));

        writer.write_record(&record)?;
    }

    Ok(())
}
