//! Key-to-description lookups used to decorate hit ids with human-readable text.

use crate::annotate::formatter::CutoffTable;
use crate::annotate::table::AnnotationTable;
use crate::bio::fasta::parse_fasta;
use crate::Result;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Most keys sent to a backend in one query
pub const MAX_KEYS_PER_QUERY: usize = 499;

/// A description backend answering bounded batches of keys
pub trait DescriptionLookup: Send + Sync {
    /// Fetch `field` for each key it knows. At most [`MAX_KEYS_PER_QUERY`] keys per call.
    fn fetch(&self, keys: &[String], field: &str) -> Result<HashMap<String, String>>;

    fn source(&self) -> String;
}

/// Look up `field` for every distinct id, in chunks the backend accepts.
///
/// Finding nothing at all is logged, since it usually means ids and
/// description source do not belong together.
pub fn lookup_descriptions<I, S>(
    lookup: &dyn DescriptionLookup,
    ids: I,
    field: &str,
) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: Vec<String> = ids
        .into_iter()
        .map(|id| id.as_ref().to_string())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();

    let mut found = HashMap::new();
    for chunk in unique.chunks(MAX_KEYS_PER_QUERY) {
        found.extend(lookup.fetch(chunk, field)?);
    }

    if found.is_empty() {
        if let Some(first) = unique.first() {
            tracing::warn!(
                "No {} descriptions found in {} for {} ids; does {} look like an id from that source?",
                field,
                lookup.source(),
                unique.len(),
                first
            );
        }
    }
    Ok(found)
}

/// Describe the ids in `id_column` into `out_column`.
///
/// Cells holding several `"; "`-separated ids get their descriptions joined the
/// same way. Without a lookup the column is still produced, empty.
pub fn describe_column(
    table: &AnnotationTable,
    id_column: &str,
    out_column: &str,
    lookup: Option<&dyn DescriptionLookup>,
    field: &str,
) -> Result<AnnotationTable> {
    let cells = table.values(id_column);
    let mut described = AnnotationTable::with_columns([out_column]);

    let Some(lookup) = lookup else {
        tracing::debug!("No description source for {}, leaving it empty", out_column);
        for (row, _) in cells {
            described.add_row(row);
        }
        return Ok(described);
    };

    let found = lookup_descriptions(lookup, cells.iter().flat_map(|(_, v)| v.split("; ")), field)?;
    for (row, value) in cells {
        let text: Vec<&str> = value
            .split("; ")
            .filter_map(|id| found.get(id).map(String::as_str))
            .collect();
        described.set_cell(row, out_column, Some(text.join("; ")));
    }
    Ok(described)
}

/// Descriptions from a tab-separated file: id column first, then one column per field
pub struct TsvDescriptions {
    path: PathBuf,
    table: CutoffTable,
}

impl TsvDescriptions {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            table: CutoffTable::read_tsv(path)?,
        })
    }
}

impl DescriptionLookup for TsvDescriptions {
    fn fetch(&self, keys: &[String], field: &str) -> Result<HashMap<String, String>> {
        Ok(keys
            .iter()
            .filter_map(|k| {
                self.table
                    .get(k, field)
                    .filter(|v| !v.is_empty())
                    .map(|v| (k.clone(), v.to_string()))
            })
            .collect())
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}

/// Descriptions taken from FASTA headers; every field maps to the full header
pub struct HeaderDescriptions {
    path: PathBuf,
    headers: HashMap<String, String>,
}

impl HeaderDescriptions {
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let headers = parse_fasta(path)?
            .into_iter()
            .map(|seq| (seq.id.clone(), seq.full_header()))
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            headers,
        })
    }
}

impl DescriptionLookup for HeaderDescriptions {
    fn fetch(&self, keys: &[String], _field: &str) -> Result<HashMap<String, String>> {
        Ok(keys
            .iter()
            .filter_map(|k| self.headers.get(k).map(|h| (k.clone(), h.clone())))
            .collect())
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}
