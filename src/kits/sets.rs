use crate::kits::KitRegistry;
use crate::{AnnotError, Result};
use indexmap::IndexSet;

/// A named bundle of databases that a downstream tool needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbSet {
    pub id: &'static str,
    pub name: &'static str,
    pub members: &'static [&'static str],
    pub description: &'static str,
}

pub const DB_SETS: &[DbSet] = &[
    DbSet {
        id: "metabolism_set",
        name: "Distillate: Metabolism",
        members: &["stats", "kegg", "dbcan", "pfam", "heme", "merops"],
        description: "Use this set of annotations to get the most out of the metabolism distillate.",
    },
    DbSet {
        id: "metabolism_kegg_set",
        name: "Distillate: Metabolism with KEGG",
        members: &["stats", "kofam", "dbcan", "pfam", "heme", "merops"],
        description: "Use this set of annotations to get the most out of the metabolism distillate.",
    },
    DbSet {
        id: "adjectives",
        name: "Adjectives",
        members: &[
            "stats", "kofam", "dbcan", "pfam", "heme", "merops", "sulfur", "camper", "methyl", "fegenie",
        ],
        description: "Use this set of annotations to get the most out of the adjectives tool.",
    },
    DbSet {
        id: "adjectives_kegg",
        name: "Adjectives with KEGG",
        members: &[
            "stats", "kegg", "dbcan", "pfam", "heme", "merops", "sulfur", "camper", "methyl", "fegenie",
        ],
        description: "Use this set of annotations to get the most out of the adjectives tool, using \
             KEGG. You need access to KEGG to use this.",
    },
];

pub fn get_set(id: &str) -> Option<&'static DbSet> {
    DB_SETS.iter().find(|s| s.id == id)
}

/// Requested databases plus the members of every requested set, in first-seen order.
///
/// Set members this build has no kit for are skipped with a warning.
pub fn expand_selection<S: AsRef<str>>(
    registry: &KitRegistry,
    use_db: &[S],
    use_dbset: &[S],
) -> Result<Vec<String>> {
    let mut selected: IndexSet<String> = use_db.iter().map(|d| d.as_ref().to_string()).collect();
    for id in use_dbset {
        let set = get_set(id.as_ref()).ok_or_else(|| {
            AnnotError::Usage(format!(
                "unknown database set {}; choose from {}",
                id.as_ref(),
                DB_SETS.iter().map(|s| s.id).collect::<Vec<_>>().join(", ")
            ))
        })?;
        for member in set.members {
            if registry.get(member).is_some() {
                selected.insert(member.to_string());
            } else {
                tracing::warn!(
                    "Database set {} names {}, which is not available in this build; skipping it",
                    set.id,
                    member
                );
            }
        }
    }
    Ok(selected.into_iter().collect())
}
