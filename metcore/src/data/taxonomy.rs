use serde::{Deserialize, Serialize};

/// Taxonomic ranks from coarsest to finest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TaxonRank {
    Domain,
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

pub const TAXON_RANKS: [TaxonRank; 8] = [
    TaxonRank::Domain,
    TaxonRank::Kingdom,
    TaxonRank::Phylum,
    TaxonRank::Class,
    TaxonRank::Order,
    TaxonRank::Family,
    TaxonRank::Genus,
    TaxonRank::Species,
];

impl TaxonRank {
    /// Depth of the rank counted from domain = 1 down to species = 8.
    pub fn depth(&self) -> u32 {
        match self {
            TaxonRank::Domain => 1,
            TaxonRank::Kingdom => 2,
            TaxonRank::Phylum => 3,
            TaxonRank::Class => 4,
            TaxonRank::Order => 5,
            TaxonRank::Family => 6,
            TaxonRank::Genus => 7,
            TaxonRank::Species => 8,
        }
    }
}

/// A full organism rank lineage, domain down to species.
///
/// Unresolved ranks stay `None` and never match.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonLineage {
    pub domain: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
}

impl TaxonLineage {
    pub fn rank(&self, rank: TaxonRank) -> Option<&str> {
        match rank {
            TaxonRank::Domain => self.domain.as_deref(),
            TaxonRank::Kingdom => self.kingdom.as_deref(),
            TaxonRank::Phylum => self.phylum.as_deref(),
            TaxonRank::Class => self.class.as_deref(),
            TaxonRank::Order => self.order.as_deref(),
            TaxonRank::Family => self.family.as_deref(),
            TaxonRank::Genus => self.genus.as_deref(),
            TaxonRank::Species => self.species.as_deref(),
        }
    }

    /// The finest rank at which both lineages carry the same resolved name.
    ///
    /// Walks from species upward and stops at the first agreement, so a
    /// species-level hit wins over any coarser one.
    pub fn deepest_shared_rank(&self, other: &TaxonLineage) -> Option<TaxonRank> {
        TAXON_RANKS.iter().rev().find_map(|&rank| {
            match (self.rank(rank), other.rank(rank)) {
                (Some(a), Some(b)) if a == b => Some(rank),
                _ => None,
            }
        })
    }

    pub fn is_unresolved(&self) -> bool {
        TAXON_RANKS.iter().all(|&rank| self.rank(rank).is_none())
    }
}

/// A resolved organism identity with its full rank lineage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxonMatch {
    /// Name the resolver matched against, possibly a synonym of the query.
    pub matched_name: String,
    /// Resolver-side identifier of the taxon.
    pub identifier: String,
    pub lineage: TaxonLineage,
}

/// Access to the organism rank lineage of a value.
pub trait HasLineage {
    fn lineage(&self) -> &TaxonLineage;
}

impl HasLineage for TaxonMatch {
    fn lineage(&self) -> &TaxonLineage {
        &self.lineage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arabidopsis() -> TaxonLineage {
        TaxonLineage {
            domain: Some("Eukaryota".to_string()),
            kingdom: Some("Archaeplastida".to_string()),
            phylum: Some("Streptophyta".to_string()),
            class: Some("Magnoliopsida".to_string()),
            order: Some("Brassicales".to_string()),
            family: Some("Brassicaceae".to_string()),
            genus: Some("Arabidopsis".to_string()),
            species: Some("Arabidopsis thaliana".to_string()),
        }
    }

    #[test]
    fn test_species_match_is_deepest() {
        let a = arabidopsis();
        let b = arabidopsis();
        assert_eq!(a.deepest_shared_rank(&b), Some(TaxonRank::Species));
        assert_eq!(TaxonRank::Species.depth(), 8);
    }

    #[test]
    fn test_genus_match_when_species_differ() {
        let a = arabidopsis();
        let mut b = arabidopsis();
        b.species = Some("Arabidopsis lyrata".to_string());
        assert_eq!(a.deepest_shared_rank(&b), Some(TaxonRank::Genus));
        assert_eq!(TaxonRank::Genus.depth(), 7);
    }

    #[test]
    fn test_no_shared_rank() {
        let a = arabidopsis();
        let mut b = TaxonLineage::default();
        assert!(b.is_unresolved());
        assert_eq!(a.deepest_shared_rank(&b), None);

        b.domain = Some("Bacteria".to_string());
        assert_eq!(a.deepest_shared_rank(&b), None);
    }

    #[test]
    fn test_unresolved_ranks_never_match() {
        let mut a = TaxonLineage::default();
        let mut b = TaxonLineage::default();
        a.family = Some("Brassicaceae".to_string());
        b.family = Some("Brassicaceae".to_string());
        b.species = Some("Arabidopsis thaliana".to_string());
        assert_eq!(a.deepest_shared_rank(&b), Some(TaxonRank::Family));
    }
}
