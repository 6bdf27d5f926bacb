//! Database identifiers per annotated gene, for tools that consume the table.

use crate::annotate::table::AnnotationTable;
use crate::kits::DatabaseKit;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, BTreeSet};

/// Per row, every id the kits that publish ids assigned to it
pub fn annotation_ids_by_row(
    annotations: &AnnotationTable,
    kits: &[Box<dyn DatabaseKit>],
) -> IndexMap<String, BTreeSet<String>> {
    let id_kits: Vec<&dyn DatabaseKit> = kits
        .iter()
        .filter(|k| k.can_get_ids())
        .map(|k| k.as_ref())
        .collect();
    annotations
        .row_ids()
        .map(|row| {
            let ids = id_kits
                .iter()
                .flat_map(|kit| kit.get_ids(annotations, row))
                .collect();
            (row.to_string(), ids)
        })
        .collect()
}

/// How many rows carry each id
pub fn all_annotation_ids<'a, I>(ids_by_row: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    let mut counts = BTreeMap::new();
    for id in ids_by_row.into_iter().flatten() {
        *counts.entry(id.clone()).or_insert(0) += 1;
    }
    counts
}

/// `None` when some required set is fully covered by `used_dbs`; otherwise a
/// message telling the user which databases to add
pub fn check_for_annotations<S: AsRef<str>>(
    required_sets: &[Vec<S>],
    used_dbs: &BTreeSet<String>,
) -> Option<String> {
    let missing: Vec<IndexSet<&str>> = required_sets
        .iter()
        .map(|set| {
            set.iter()
                .map(AsRef::as_ref)
                .filter(|db| !used_dbs.contains(*db))
                .collect()
        })
        .collect();
    if missing.is_empty() || missing.iter().any(IndexSet::is_empty) {
        return None;
    }

    let need_all: IndexSet<&str> = missing
        .iter()
        .skip(1)
        .fold(missing[0].clone(), |acc, set| acc.intersection(set).copied().collect());
    let mut need_one_of: Vec<String> = missing
        .iter()
        .map(|set| set.difference(&need_all).copied().collect::<Vec<_>>())
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.join(", "))
        .collect();
    if need_one_of.len() < need_all.len() {
        need_one_of.clear();
    }

    let mut message = String::from(
        "This step needs annotations this project does not have yet.\n",
    );
    if !need_all.is_empty() {
        let dbs: Vec<&str> = need_all.iter().copied().collect();
        message.push_str(&format!(
            "Annotate with: [{}]. For example: `annokit --project <dir> annotate --use-db {}`\n",
            dbs.join(", "),
            dbs.join(" --use-db ")
        ));
        if !need_one_of.is_empty() {
            message.push_str("Also!\n");
        }
    }
    if !need_one_of.is_empty() {
        message.push_str(&format!("Annotate with: {}\n", need_one_of.join(" or ")));
    }
    message.push_str("Review the documentation to make sure the run produces the results you want.");
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::batch::GeneBatch;
    use crate::kits::heme::HemeKit;
    use crate::kits::{KitSettings, SearchContext};
    use crate::Result;
    use pretty_assertions::assert_eq;

    struct IdKit;

    impl DatabaseKit for IdKit {
        fn name(&self) -> &str {
            "kofam"
        }

        fn formal_name(&self) -> &str {
            "KOfam"
        }

        fn search(&self, _batch: &GeneBatch, _ctx: &SearchContext) -> Result<AnnotationTable> {
            Ok(AnnotationTable::new())
        }

        fn settings(&self) -> KitSettings {
            KitSettings::new("test")
        }
    }

    #[test]
    fn test_ids_by_row_and_counts() {
        let mut table = AnnotationTable::new();
        table.set("A_1", "kofam_id", "K00001");
        table.set("A_2", "kofam_id", "K00001");
        table.set("A_3", "heme_regulatory_motif_count", "2");
        let kits: Vec<Box<dyn DatabaseKit>> = vec![Box::new(IdKit), Box::new(HemeKit::new().unwrap())];

        let by_row = annotation_ids_by_row(&table, &kits);
        assert_eq!(by_row.len(), 3);
        assert!(by_row["A_1"].contains("K00001"));
        assert!(by_row["A_3"].is_empty());

        let counts = all_annotation_ids(by_row.values());
        assert_eq!(counts["K00001"], 2);
    }

    #[test]
    fn test_check_for_annotations() {
        let used: BTreeSet<String> = ["kofam", "dbcan"].iter().map(|s| s.to_string()).collect();
        let sets = vec![vec!["kofam", "dbcan", "heme"], vec!["kegg", "dbcan", "heme"]];
        let message = check_for_annotations(&sets, &used).unwrap();
        assert!(message.contains("[heme]"));
        assert!(message.contains("Also!"));
        assert!(message.contains("Annotate with: kegg"));

        let covered = vec![vec!["kofam", "dbcan"], vec!["kegg"]];
        assert_eq!(check_for_annotations(&covered, &used), None);
    }
}
