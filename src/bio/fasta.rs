use crate::bio::sequence::Sequence;
use crate::{AnnotError, Result};
use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{line_ending, not_line_ending},
    combinator::{map_res, opt},
    sequence::preceded,
    IResult,
};
use std::path::Path;

/// Parse a FASTA header line into its identifier and optional description
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(&b">"[..])(input)?;
    let (input, id) = map_res(
        take_till(|c: u8| c.is_ascii_whitespace()),
        std::str::from_utf8,
    )(input)?;
    let (input, description) = opt(preceded(
        take_while1(|c: u8| c == b' ' || c == b'\t'),
        map_res(not_line_ending, std::str::from_utf8),
    ))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    let description = description.map(str::trim_end).filter(|d| !d.is_empty());
    Ok((input, (id, description)))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;
        // a lone carriage return is not a line ending for nom
        let rest = rest.strip_prefix(b"\r").unwrap_or(rest);

        sequence.extend(
            line.iter()
                .filter(|c| !c.is_ascii_whitespace())
                .map(|c| c.to_ascii_uppercase()),
        );
        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Parse FASTA from bytes
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    let mut remaining = data;

    loop {
        let start = remaining
            .iter()
            .position(|c| !c.is_ascii_whitespace())
            .unwrap_or(remaining.len());
        remaining = &remaining[start..];
        if remaining.is_empty() {
            break;
        }

        if remaining[0] != b'>' {
            return Err(AnnotError::Parse(format!(
                "Expected FASTA header after record {}",
                sequences.len()
            )));
        }

        let (rest, (id, description)) = parse_header(remaining)
            .map_err(|_| AnnotError::Parse("Failed to parse FASTA header".to_string()))?;
        if id.is_empty() {
            return Err(AnnotError::Parse(format!(
                "Empty FASTA identifier at record {}",
                sequences.len() + 1
            )));
        }

        let (rest, residues) = parse_sequence(rest)
            .map_err(|_| AnnotError::Parse("Failed to parse FASTA sequence".to_string()))?;

        let mut seq = Sequence::new(id.to_string(), residues);
        if let Some(desc) = description {
            seq = seq.with_description(desc.to_string());
        }
        sequences.push(seq);

        remaining = rest;
    }

    Ok(sequences)
}

/// Parse a FASTA file into sequences
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    parse_fasta_from_bytes(&data).map_err(|e| match e {
        AnnotError::Parse(msg) => AnnotError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_header() {
        let input = b">k141_1_2 # 3 # 302 # -1 # ID=1_2\nMKV";
        let (remaining, (id, desc)) = parse_header(input).unwrap();
        assert_eq!(id, "k141_1_2");
        assert_eq!(desc, Some("# 3 # 302 # -1 # ID=1_2"));
        assert_eq!(remaining, b"MKV");
    }

    #[test]
    fn test_parse_header_without_description() {
        let (_, (id, desc)) = parse_header(b">gene_7\r\nMK").unwrap();
        assert_eq!(id, "gene_7");
        assert_eq!(desc, None);
    }

    #[test]
    fn test_parse_multiline_records() {
        let data = b">a first\nMKV\nLLA*\n\n>b\nCAACH\n";
        let seqs = parse_fasta_from_bytes(data).unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].id, "a");
        assert_eq!(seqs[0].sequence, b"MKVLLA*".to_vec());
        assert_eq!(seqs[1].description, None);
        assert_eq!(seqs[1].residues(), "CAACH");
    }

    #[test]
    fn test_rejects_garbage_before_header() {
        let err = parse_fasta_from_bytes(b"MKV\n>a\nMKV\n").unwrap_err();
        assert!(matches!(err, AnnotError::Parse(_)));
    }
}
