extern crate rusqlite;

use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;

use metcore::chemistry::catalog::FormulaGroup;
use metcore::data::chemical::{ClassVocabulary, ReferenceChemical};
use metcore::data::taxonomy::TaxonLineage;

use crate::error::MetannotError;

pub const REFERENCE_TABLE: &str = "reference_chemicals";

const REQUIRED_COLUMNS: [&str; 14] = [
    "short_inchikey",
    "exact_mass",
    "molecular_formula",
    "npc_pathway",
    "npc_superclass",
    "npc_class",
    "organism_domain",
    "organism_kingdom",
    "organism_phylum",
    "organism_class",
    "organism_order",
    "organism_family",
    "organism_genus",
    "organism_species",
];

/// Check the reference table for the required column set before any query.
pub fn validate_columns(conn: &Connection) -> Result<(), MetannotError> {
    let query = format!("PRAGMA table_info({})", REFERENCE_TABLE);
    let present: Result<Vec<String>, _> = conn
        .prepare(&query)?
        .query_map([], |row| row.get::<_, String>(1))?
        .collect();
    let present = present?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.iter().any(|p| p == *column))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(MetannotError::Config(format!(
            "reference table {} is missing required columns: {}",
            REFERENCE_TABLE,
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Read every (structure, organism) row from the reference table.
pub fn read_chemicals(conn: &Connection) -> Result<Vec<ReferenceChemical>, MetannotError> {
    validate_columns(conn)?;

    // prepare the query
    let query = format!("SELECT {} FROM {}", REQUIRED_COLUMNS.join(", "), REFERENCE_TABLE);
    let rows: Result<Vec<ReferenceChemical>, _> = conn
        .prepare(&query)?
        .query_map([], |row| {
            Ok(ReferenceChemical {
                short_inchikey: row.get(0)?,
                exact_mass: row.get(1)?,
                molecular_formula: row.get(2)?,
                pathway: row.get(3)?,
                superclass: row.get(4)?,
                class: row.get(5)?,
                lineage: TaxonLineage {
                    domain: row.get(6)?,
                    kingdom: row.get(7)?,
                    phylum: row.get(8)?,
                    class: row.get(9)?,
                    order: row.get(10)?,
                    family: row.get(11)?,
                    genus: row.get(12)?,
                    species: row.get(13)?,
                },
            })
        })?
        .collect();

    Ok(rows?)
}

/// In-memory view of the reference database for one run.
///
/// Holds every (structure, organism) row, an index from short InChIKey to its
/// rows, and the classification vocabulary collected over all rows. Built once
/// and shared read-only across samples.
pub struct ReferenceStore {
    chemicals: Vec<ReferenceChemical>,
    by_structure: HashMap<String, Vec<usize>>,
    vocabulary: ClassVocabulary,
}

impl ReferenceStore {
    pub fn open(db_path: &str) -> Result<ReferenceStore, MetannotError> {
        let conn = Connection::open(db_path)?;
        let chemicals = read_chemicals(&conn)?;
        Ok(Self::from_chemicals(chemicals))
    }

    pub fn from_chemicals(chemicals: Vec<ReferenceChemical>) -> ReferenceStore {
        let vocabulary = ClassVocabulary::from_chemicals(&chemicals);
        let mut by_structure: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, chemical) in chemicals.iter().enumerate() {
            by_structure
                .entry(chemical.short_inchikey.clone())
                .or_default()
                .push(index);
        }
        ReferenceStore { chemicals, by_structure, vocabulary }
    }

    pub fn chemicals(&self) -> &[ReferenceChemical] {
        &self.chemicals
    }

    pub fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    /// Row indices of a structure, across all its organism pairings.
    pub fn structure_indices(&self, short_inchikey: &str) -> &[usize] {
        self.by_structure
            .get(short_inchikey)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.chemicals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chemicals.is_empty()
    }

    /// Group rows by molecular formula for adduct enumeration.
    ///
    /// Groups come out sorted by formula, member structure ids deduplicated
    /// and sorted, so the resulting catalog is identical across runs.
    pub fn formula_groups(&self) -> Vec<FormulaGroup> {
        let mut groups: BTreeMap<&str, FormulaGroup> = BTreeMap::new();
        for chemical in &self.chemicals {
            let group = groups
                .entry(chemical.molecular_formula.as_str())
                .or_insert_with(|| FormulaGroup {
                    formula: chemical.molecular_formula.clone(),
                    neutral_mass: chemical.exact_mass,
                    structure_ids: Vec::new(),
                });
            if (group.neutral_mass - chemical.exact_mass).abs() > 1e-6 {
                log::warn!(
                    "formula {} carries conflicting exact masses ({} vs {})",
                    chemical.molecular_formula,
                    group.neutral_mass,
                    chemical.exact_mass
                );
            }
            group.structure_ids.push(chemical.short_inchikey.clone());
        }

        let mut result: Vec<FormulaGroup> = groups.into_values().collect();
        for group in &mut result {
            group.structure_ids.sort_unstable();
            group.structure_ids.dedup();
        }
        result
    }
}
