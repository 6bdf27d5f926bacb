use crate::cli::formatter::{print_section, print_tip, styled_table};
use crate::core::config::KitsConfig;
use crate::kits::sets::DB_SETS;
use crate::kits::KitRegistry;
use comfy_table::{Attribute, Cell, Color};

/// Built-in databases, whether the config points at their files, and citations
pub fn list_dbs(config: &KitsConfig) -> anyhow::Result<()> {
    let registry = KitRegistry::builtin();
    print_section("Databases");

    let mut table = styled_table(&["Database", "Name", "Configured", "Citation"]);
    for kit in registry.descriptors() {
        let configured = if config.kits.contains_key(kit.name) {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(kit.name).add_attribute(Attribute::Bold),
            Cell::new(kit.formal_name),
            configured,
            Cell::new(kit.citation),
        ]);
    }
    println!("{}", table);
    print_tip("Custom FASTA and HMM databases can be added per run with --custom-fasta-db-* and --custom-hmm-db-*");
    Ok(())
}

/// Named database sets and their members
pub fn list_db_sets() -> anyhow::Result<()> {
    let registry = KitRegistry::builtin();
    print_section("Database sets");

    let mut table = styled_table(&["Set", "Name", "Databases", "Description"]);
    for set in DB_SETS {
        let members = set
            .members
            .iter()
            .map(|m| {
                if registry.get(m).is_some() {
                    m.to_string()
                } else {
                    format!("{} (unavailable)", m)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(set.id).add_attribute(Attribute::Bold),
            Cell::new(set.name),
            Cell::new(members),
            Cell::new(set.description),
        ]);
    }
    println!("{}", table);
    Ok(())
}
