use crate::tools::process::{check_binary, locate_binary, run_tool};
use crate::tools::traits::{DomainHit, ProfileSearch};
use crate::{AnnotError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// hmmsearch does not scale past two worker threads
pub const HMMSEARCH_MAX_THREADS: usize = 2;

const PRESSED_SUFFIXES: [&str; 4] = ["h3f", "h3i", "h3m", "h3p"];
const DOMTBL_FIELDS: usize = 22;

/// HMMER integration (hmmsearch + hmmpress)
pub struct Hmmer {
    hmmsearch: PathBuf,
    hmmpress: PathBuf,
}

impl Hmmer {
    pub fn new() -> Self {
        Self {
            hmmsearch: locate_binary("hmmsearch", "ANNOKIT_HMMSEARCH"),
            hmmpress: locate_binary("hmmpress", "ANNOKIT_HMMPRESS"),
        }
    }

    pub fn with_binaries(hmmsearch: PathBuf, hmmpress: PathBuf) -> Self {
        Self {
            hmmsearch,
            hmmpress,
        }
    }

    fn is_pressed(profiles: &Path) -> bool {
        PRESSED_SUFFIXES
            .iter()
            .all(|suffix| PathBuf::from(format!("{}.{}", profiles.display(), suffix)).exists())
    }
}

impl Default for Hmmer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileSearch for Hmmer {
    fn name(&self) -> &str {
        "hmmsearch"
    }

    fn prepare_profiles(&self, profiles: &Path) -> Result<()> {
        if Self::is_pressed(profiles) {
            tracing::debug!("{} is already pressed", profiles.display());
            return Ok(());
        }
        run_tool(
            Command::new(&self.hmmpress).arg("-f").arg(profiles),
            "hmmpress",
        )?;
        Ok(())
    }

    fn search(
        &self,
        genes: &Path,
        profiles: &Path,
        work_dir: &Path,
        threads: usize,
    ) -> Result<Vec<DomainHit>> {
        let threads = if threads > HMMSEARCH_MAX_THREADS {
            tracing::debug!(
                "hmmsearch is capped at {} threads ({} offered)",
                HMMSEARCH_MAX_THREADS,
                threads
            );
            HMMSEARCH_MAX_THREADS
        } else {
            threads.max(1)
        };

        fs::create_dir_all(work_dir)?;
        let stem = profiles
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profiles".to_string());
        let domtbl = work_dir.join(format!("{}_results.unprocessed.b6", stem));
        let log = work_dir.join(format!("{}_hmmsearch.log", stem));

        run_tool(
            Command::new(&self.hmmsearch)
                .arg("-o")
                .arg(&log)
                .arg("--domtblout")
                .arg(&domtbl)
                .arg("--cpu")
                .arg(threads.to_string())
                .arg(profiles)
                .arg(genes),
            "hmmsearch",
        )?;

        read_domtblout(&domtbl)
    }

    fn verify_installation(&self) -> Result<()> {
        check_binary(&self.hmmsearch, "hmmsearch")?;
        check_binary(&self.hmmpress, "hmmpress")
    }
}

/// Read a `--domtblout` file. A missing or empty file means no hits.
pub fn read_domtblout(path: &Path) -> Result<Vec<DomainHit>> {
    if !path.exists() {
        tracing::debug!("No domain table at {}, treating as no hits", path.display());
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)?;
    parse_domtblout(&contents)
        .map_err(|e| AnnotError::external("hmmsearch", format!("{}: {}", path.display(), e)))
}

/// Parse `--domtblout` text.
///
/// Fields are whitespace separated; everything past the 22nd field is the
/// free-text description and is re-joined with single spaces.
pub fn parse_domtblout(contents: &str) -> Result<Vec<DomainHit>> {
    let mut hits = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < DOMTBL_FIELDS {
            return Err(AnnotError::Parse(format!(
                "line {}: expected at least {} fields, found {}",
                line_no + 1,
                DOMTBL_FIELDS,
                fields.len()
            )));
        }

        let int = |i: usize| -> Result<usize> {
            fields[i]
                .parse()
                .map_err(|_| AnnotError::Parse(format!("line {}: field {} is not an integer", line_no + 1, i + 1)))
        };
        let float = |i: usize| -> Result<f64> {
            fields[i]
                .parse()
                .map_err(|_| AnnotError::Parse(format!("line {}: field {} is not a number", line_no + 1, i + 1)))
        };

        hits.push(DomainHit {
            query_id: fields[0].to_string(),
            query_accession: fields[1].to_string(),
            query_length: int(2)?,
            target_id: fields[3].to_string(),
            target_accession: fields[4].to_string(),
            target_length: int(5)?,
            full_evalue: float(6)?,
            full_score: float(7)?,
            full_bias: float(8)?,
            domain_number: int(9)?,
            domain_count: int(10)?,
            domain_cevalue: float(11)?,
            domain_ievalue: float(12)?,
            domain_score: float(13)?,
            domain_bias: float(14)?,
            target_start: int(15)?,
            target_end: int(16)?,
            alignment_start: int(17)?,
            alignment_end: int(18)?,
            query_start: int(19)?,
            query_end: int(20)?,
            accuracy: float(21)?,
            description: fields[DOMTBL_FIELDS..].join(" "),
        });
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "gene_1   -   310 GH5   -   300   1.5e-30  105.2   0.1   1   1   2e-33   1e-30  104.0   0.1   10   250   12   260   8   265 0.97 Cellulase (glycosyl hydrolase family 5)";

    #[test]
    fn test_parse_domtblout_row() {
        let text = format!("# target name\n#---\n{}\n", ROW);
        let hits = parse_domtblout(&text).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.query_id, "gene_1");
        assert_eq!(hit.target_id, "GH5");
        assert_eq!(hit.target_length, 300);
        assert_eq!(hit.full_evalue, 1.5e-30);
        assert_eq!(hit.domain_score, 104.0);
        assert_eq!(hit.target_start, 10);
        assert_eq!(hit.target_end, 250);
        assert_eq!(hit.description, "Cellulase (glycosyl hydrolase family 5)");
        assert!((hit.coverage() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_missing_or_empty_table_means_no_hits() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing.b6");
        assert!(read_domtblout(&missing).unwrap().is_empty());

        let empty = dir.path().join("empty.b6");
        fs::write(&empty, "").unwrap();
        assert!(read_domtblout(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_row_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.b6");
        fs::write(&path, "gene_1 - 310 GH5\n").unwrap();
        let err = read_domtblout(&path).unwrap_err();
        assert!(matches!(err, AnnotError::ExternalTool { .. }));
    }

    #[test]
    fn test_is_pressed() {
        let dir = tempfile::tempdir().unwrap();
        let hmm = dir.path().join("db.hmm");
        fs::write(&hmm, "").unwrap();
        assert!(!Hmmer::is_pressed(&hmm));
        for suffix in PRESSED_SUFFIXES {
            fs::write(dir.path().join(format!("db.hmm.{}", suffix)), "").unwrap();
        }
        assert!(Hmmer::is_pressed(&hmm));
    }
}
