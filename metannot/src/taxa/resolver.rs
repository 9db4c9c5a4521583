//! Taxonomic resolution seam.
//!
//! Organism names are resolved in two steps: rank candidate name matches,
//! then fetch the winning candidate's full lineage. Both steps sit behind a
//! trait so the pipeline never knows whether a web service or a pre-fetched
//! file answers them.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use metcore::data::taxonomy::{TaxonLineage, TaxonMatch};

use crate::error::MetannotError;

/// A candidate name match, before its lineage is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTaxon {
    pub matched_name: String,
    pub identifier: String,
}

pub trait TaxonResolver {
    /// Candidate matches for an organism name, best first. May be empty.
    fn rank_candidates(&self, organism: &str) -> Result<Vec<ResolvedTaxon>, MetannotError>;

    /// Full rank lineage of a previously returned candidate.
    fn lineage(&self, taxon: &ResolvedTaxon) -> Result<TaxonLineage, MetannotError>;
}

/// Resolve an organism name to its lineage with a bounded retry on the
/// lineage fetch.
///
/// An unmatched name is not an error: taxonomic reweighting is skipped for
/// the sample and `None` returned. Exhausting all lineage fetch attempts is
/// fatal for the sample.
pub fn resolve_organism(
    resolver: &dyn TaxonResolver,
    organism: &str,
    attempts: u32,
) -> Result<Option<TaxonMatch>, MetannotError> {
    if attempts == 0 {
        return Err(MetannotError::Config("retry attempts must be at least 1".to_string()));
    }

    let candidates = resolver.rank_candidates(organism)?;
    let best = match candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            log::warn!("no taxon match for organism '{}'", organism);
            return Ok(None);
        }
    };

    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match resolver.lineage(&best) {
            Ok(lineage) => {
                return Ok(Some(TaxonMatch {
                    matched_name: best.matched_name,
                    identifier: best.identifier,
                    lineage,
                }))
            }
            Err(error) => {
                log::warn!(
                    "lineage fetch for '{}' failed (attempt {}/{}): {}",
                    best.matched_name,
                    attempt,
                    attempts,
                    error
                );
                last_error = error.to_string();
            }
        }
    }
    Err(MetannotError::TaxonResolution {
        organism: organism.to_string(),
        attempts,
        reason: last_error,
    })
}

/// Resolver backed by a pre-fetched taxonomy file.
///
/// The file maps organism names to rank lineages, as exported by an upstream
/// taxonomy service; name matching is case-insensitive and exact.
pub struct FileTaxonResolver {
    entries: HashMap<String, TaxonLineage>,
}

impl FileTaxonResolver {
    pub fn from_path(path: &str) -> Result<FileTaxonResolver, MetannotError> {
        let reader = BufReader::new(File::open(path)?);
        let raw: HashMap<String, TaxonLineage> = serde_json::from_reader(reader)?;
        let entries = raw
            .into_iter()
            .map(|(name, lineage)| (name.to_lowercase(), lineage))
            .collect();
        Ok(FileTaxonResolver { entries })
    }
}

impl TaxonResolver for FileTaxonResolver {
    fn rank_candidates(&self, organism: &str) -> Result<Vec<ResolvedTaxon>, MetannotError> {
        let key = organism.to_lowercase();
        if self.entries.contains_key(&key) {
            Ok(vec![ResolvedTaxon { matched_name: organism.to_string(), identifier: key }])
        } else {
            Ok(Vec::new())
        }
    }

    fn lineage(&self, taxon: &ResolvedTaxon) -> Result<TaxonLineage, MetannotError> {
        self.entries.get(&taxon.identifier).cloned().ok_or_else(|| {
            MetannotError::Config(format!("unknown taxon identifier '{}'", taxon.identifier))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FlakyResolver {
        failures_left: Cell<u32>,
    }

    impl TaxonResolver for FlakyResolver {
        fn rank_candidates(&self, organism: &str) -> Result<Vec<ResolvedTaxon>, MetannotError> {
            Ok(vec![ResolvedTaxon {
                matched_name: organism.to_string(),
                identifier: "ott:12345".to_string(),
            }])
        }

        fn lineage(&self, _taxon: &ResolvedTaxon) -> Result<TaxonLineage, MetannotError> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(MetannotError::Sample("transient upstream failure".to_string()));
            }
            Ok(TaxonLineage {
                genus: Some("Mentha".to_string()),
                ..Default::default()
            })
        }
    }

    struct UnmatchedResolver;

    impl TaxonResolver for UnmatchedResolver {
        fn rank_candidates(&self, _organism: &str) -> Result<Vec<ResolvedTaxon>, MetannotError> {
            Ok(Vec::new())
        }

        fn lineage(&self, _taxon: &ResolvedTaxon) -> Result<TaxonLineage, MetannotError> {
            unreachable!("no candidates were returned")
        }
    }

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let resolver = FlakyResolver { failures_left: Cell::new(2) };
        let resolved = resolve_organism(&resolver, "Mentha x piperita", 3).unwrap();

        let taxon = resolved.unwrap();
        assert_eq!(taxon.identifier, "ott:12345");
        assert_eq!(taxon.lineage.genus.as_deref(), Some("Mentha"));
    }

    #[test]
    fn test_exhausted_retries_are_fatal() {
        let resolver = FlakyResolver { failures_left: Cell::new(5) };
        let result = resolve_organism(&resolver, "Mentha x piperita", 3);

        match result {
            Err(MetannotError::TaxonResolution { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected resolution failure, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_unmatched_organism_is_not_an_error() {
        let resolved = resolve_organism(&UnmatchedResolver, "Imaginaria planta", 3).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_zero_attempts_is_config_error() {
        let result = resolve_organism(&UnmatchedResolver, "Mentha", 0);
        assert!(matches!(result, Err(MetannotError::Config(_))));
    }

    #[test]
    fn test_file_resolver_matches_case_insensitively() {
        let path = std::env::temp_dir()
            .join(format!("metannot-taxa-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"Mentha x piperita": {"domain": "Eukaryota", "kingdom": "Plantae",
                "phylum": null, "class": null, "order": null, "family": null,
                "genus": "Mentha", "species": "Mentha x piperita"}}"#,
        )
        .unwrap();

        let resolver = FileTaxonResolver::from_path(path.to_str().unwrap()).unwrap();
        let resolved = resolve_organism(&resolver, "MENTHA X PIPERITA", 3).unwrap();
        std::fs::remove_file(&path).unwrap();

        let taxon = resolved.unwrap();
        assert_eq!(taxon.lineage.species.as_deref(), Some("Mentha x piperita"));
    }
}
