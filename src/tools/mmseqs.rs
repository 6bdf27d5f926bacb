use crate::tools::process::{check_binary, locate_binary, run_tool};
use crate::tools::traits::{AlignmentHit, SeqIndex, SequenceSearch};
use crate::{AnnotError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;

const TOOL: &str = "mmseqs";

/// MMseqs2 integration
pub struct Mmseqs2 {
    binary_path: PathBuf,
}

impl Mmseqs2 {
    /// Locate `mmseqs` via `ANNOKIT_MMSEQS` or `PATH`
    pub fn new() -> Self {
        Self::with_binary(locate_binary(TOOL, "ANNOKIT_MMSEQS"))
    }

    pub fn with_binary(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary_path)
    }

    /// Map accessions to the internal keys MMseqs2 stores in `<db>.lookup`
    fn lookup_keys(source: &SeqIndex, ids: &[String]) -> Result<Vec<String>> {
        let lookup_path = PathBuf::from(format!("{}.lookup", source.path().display()));
        let file = fs::File::open(&lookup_path).map_err(|e| {
            AnnotError::external(
                TOOL,
                format!("cannot read lookup {}: {}", lookup_path.display(), e),
            )
        })?;

        let mut by_accession = HashMap::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut parts = line.split('\t');
            if let (Some(key), Some(accession)) = (parts.next(), parts.next()) {
                by_accession.insert(accession.to_string(), key.to_string());
            }
        }

        let keys = ids
            .iter()
            .filter_map(|id| {
                let key = by_accession.get(id).cloned();
                if key.is_none() {
                    tracing::debug!("{} not present in {}", id, lookup_path.display());
                }
                key
            })
            .collect();
        Ok(keys)
    }
}

impl Default for Mmseqs2 {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceSearch for Mmseqs2 {
    fn name(&self) -> &str {
        TOOL
    }

    fn create_index(&self, fasta: &Path, index: &Path, threads: usize) -> Result<SeqIndex> {
        if index.exists() {
            tracing::debug!("Reusing sequence index {}", index.display());
            return Ok(SeqIndex::new(index));
        }
        let parent = index.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        run_tool(
            self.command().arg("createdb").arg(fasta).arg(index),
            TOOL,
        )?;
        let tmp = parent.join("tmp");
        run_tool(
            self.command()
                .arg("createindex")
                .arg(index)
                .arg(&tmp)
                .arg("--threads")
                .arg(threads.max(1).to_string()),
            TOOL,
        )?;
        fs::remove_dir_all(&tmp).ok();

        tracing::debug!("Built sequence index {} from {}", index.display(), fasta.display());
        Ok(SeqIndex::new(index))
    }

    fn search(
        &self,
        query: &SeqIndex,
        target: &SeqIndex,
        work_dir: &Path,
        threads: usize,
    ) -> Result<Vec<AlignmentHit>> {
        fs::create_dir_all(work_dir)?;
        let stem = format!("{}_{}", query.stem(), target.stem());
        let result_db = work_dir.join(format!("{}.mmsdb", stem));
        let tab = work_dir.join(format!("{}.b6", stem));
        let tmp = work_dir.join("tmp");
        let threads = threads.max(1).to_string();

        run_tool(
            self.command()
                .arg("search")
                .arg(query.path())
                .arg(target.path())
                .arg(&result_db)
                .arg(&tmp)
                .arg("--threads")
                .arg(&threads),
            TOOL,
        )?;
        run_tool(
            self.command()
                .arg("convertalis")
                .arg(query.path())
                .arg(target.path())
                .arg(&result_db)
                .arg(&tab)
                .arg("--threads")
                .arg(&threads),
            TOOL,
        )?;

        if !tab.exists() {
            return Err(AnnotError::external(
                TOOL,
                format!("search produced no result file at {}", tab.display()),
            ));
        }
        read_blast_tab(&tab).map_err(|e| AnnotError::external(TOOL, e.to_string()))
    }

    fn create_subindex(&self, source: &SeqIndex, ids: &[String], output: &Path) -> Result<SeqIndex> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let keys = Self::lookup_keys(source, ids)?;
        let keys_file = output.with_extension("keys");
        fs::write(&keys_file, keys.join("\n") + "\n")?;

        run_tool(
            self.command()
                .arg("createsubdb")
                .arg(&keys_file)
                .arg(source.path())
                .arg(output),
            TOOL,
        )?;
        run_tool(
            self.command()
                .arg("createsubdb")
                .arg(&keys_file)
                .arg(format!("{}_h", source.path().display()))
                .arg(format!("{}_h", output.display())),
            TOOL,
        )?;

        Ok(SeqIndex::new(output))
    }

    fn verify_installation(&self) -> Result<()> {
        check_binary(&self.binary_path, TOOL)
    }
}

/// Parse BLAST tabular (outfmt 6) output
pub fn read_blast_tab(path: &Path) -> Result<Vec<AlignmentHit>> {
    let contents = fs::read_to_string(path)?;
    parse_blast_tab(&contents)
}

pub fn parse_blast_tab(contents: &str) -> Result<Vec<AlignmentHit>> {
    let mut results = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 12 {
            return Err(AnnotError::Parse(format!(
                "line {}: expected 12 columns, found {}",
                line_no + 1,
                parts.len()
            )));
        }

        let bad = |column: &str| {
            AnnotError::Parse(format!("line {}: invalid {}", line_no + 1, column))
        };

        results.push(AlignmentHit {
            query_id: parts[0].to_string(),
            target_id: parts[1].to_string(),
            identity: parts[2].parse().map_err(|_| bad("identity"))?,
            alignment_length: parts[3].parse().map_err(|_| bad("alignment length"))?,
            mismatches: parts[4].parse().map_err(|_| bad("mismatch count"))?,
            gap_opens: parts[5].parse().map_err(|_| bad("gap open count"))?,
            query_start: parts[6].parse().map_err(|_| bad("query start"))?,
            query_end: parts[7].parse().map_err(|_| bad("query end"))?,
            target_start: parts[8].parse().map_err(|_| bad("target start"))?,
            target_end: parts[9].parse().map_err(|_| bad("target end"))?,
            evalue: parts[10].parse().map_err(|_| bad("e-value"))?,
            bit_score: parts[11].parse().map_err(|_| bad("bit score"))?,
        });
    }

    Ok(results)
}
