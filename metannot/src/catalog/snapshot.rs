//! On-disk adduct catalog snapshots.
//!
//! Building the catalog enumerates every (formula group, recipe) pair, which
//! is worth caching for large reference databases. Snapshots are
//! zstd-compressed bincode with a version tag and are checked against the
//! requested polarity and the sort invariant on load.

use std::fs::File;

use bincode::{Decode, Encode};

use metcore::chemistry::adduct::Polarity;
use metcore::chemistry::catalog::AdductCatalog;

use crate::error::MetannotError;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Encode, Decode)]
struct SnapshotFile {
    version: u32,
    catalog: AdductCatalog,
}

pub fn save_catalog(path: &str, catalog: &AdductCatalog) -> Result<(), MetannotError> {
    let file = File::create(path)?;
    // level 3 is a good default
    let mut writer = zstd::Encoder::new(file, 3)?;
    bincode::encode_into_std_write(
        SnapshotFile { version: SNAPSHOT_VERSION, catalog: catalog.clone() },
        &mut writer,
        bincode::config::standard(),
    )?;
    writer.finish()?;
    Ok(())
}

pub fn load_catalog(path: &str, polarity: Polarity) -> Result<AdductCatalog, MetannotError> {
    let file = File::open(path)?;
    let mut reader = zstd::Decoder::new(file)?;
    let snapshot: SnapshotFile =
        bincode::decode_from_std_read(&mut reader, bincode::config::standard())?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(MetannotError::Config(format!(
            "catalog snapshot {} has version {}, expected {}",
            path, snapshot.version, SNAPSHOT_VERSION
        )));
    }
    if snapshot.catalog.polarity != polarity {
        return Err(MetannotError::Config(format!(
            "catalog snapshot {} holds a {} catalog, run requires {}",
            path, snapshot.catalog.polarity, polarity
        )));
    }
    if !snapshot.catalog.is_sorted() {
        return Err(MetannotError::Config(format!(
            "catalog snapshot {} is corrupt: entries out of mass order",
            path
        )));
    }
    Ok(snapshot.catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metcore::chemistry::catalog::FormulaGroup;

    fn glucose_group() -> Vec<FormulaGroup> {
        vec![FormulaGroup {
            formula: "C6H12O6".to_string(),
            neutral_mass: 180.06338810,
            structure_ids: vec!["WQZGKKKJIJFFOK".to_string()],
        }]
    }

    fn snapshot_path(name: &str) -> String {
        let path = std::env::temp_dir().join(format!("metannot-{}-{}.cat", name, std::process::id()));
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let catalog = AdductCatalog::build(Polarity::Positive, glucose_group()).unwrap();
        let path = snapshot_path("roundtrip");

        save_catalog(&path, &catalog).unwrap();
        let loaded = load_catalog(&path, Polarity::Positive).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.len(), catalog.len());
        assert!(loaded.is_sorted());
        let hits = loaded.query(181.07066455, 5.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(loaded.recipe_of(&hits[0]).to_string(), "[M+H]+");
    }

    #[test]
    fn test_polarity_mismatch_is_config_error() {
        let catalog = AdductCatalog::build(Polarity::Positive, glucose_group()).unwrap();
        let path = snapshot_path("mismatch");

        save_catalog(&path, &catalog).unwrap();
        let result = load_catalog(&path, Polarity::Negative);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(MetannotError::Config(_))));
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let result = load_catalog("/nonexistent/catalog.cat", Polarity::Positive);
        assert!(matches!(result, Err(MetannotError::Io(_))));
    }
}
