use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::taxonomy::{HasLineage, TaxonLineage};

/// The three nested chemical classification levels, coarsest first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ClassLevel {
    Pathway,
    Superclass,
    Class,
}

pub const CLASS_LEVELS: [ClassLevel; 3] = [ClassLevel::Pathway, ClassLevel::Superclass, ClassLevel::Class];

impl ClassLevel {
    pub fn index(&self) -> usize {
        match self {
            ClassLevel::Pathway => 0,
            ClassLevel::Superclass => 1,
            ClassLevel::Class => 2,
        }
    }
}

/// One reference structure paired with one source organism.
///
/// The reference catalog carries a row per (structure, organism) pairing;
/// the same structure can therefore appear with several lineages.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceChemical {
    /// First 14 characters of the InChIKey, identifying the 2D skeleton.
    pub short_inchikey: String,
    pub exact_mass: f64,
    pub molecular_formula: String,
    pub pathway: Option<String>,
    pub superclass: Option<String>,
    pub class: Option<String>,
    pub lineage: TaxonLineage,
}

/// Access to the chemical classification labels of a value.
pub trait HasClassVectors {
    fn class_label(&self, level: ClassLevel) -> Option<&str>;
}

impl HasClassVectors for ReferenceChemical {
    fn class_label(&self, level: ClassLevel) -> Option<&str> {
        match level {
            ClassLevel::Pathway => self.pathway.as_deref(),
            ClassLevel::Superclass => self.superclass.as_deref(),
            ClassLevel::Class => self.class.as_deref(),
        }
    }
}

impl HasLineage for ReferenceChemical {
    fn lineage(&self) -> &TaxonLineage {
        &self.lineage
    }
}

/// Dense index assignment for classification labels, one namespace per level.
///
/// Labels are sorted alphabetically per level so indices are stable across
/// runs regardless of reference row order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassVocabulary {
    labels: Vec<Vec<String>>,
    index: Vec<HashMap<String, usize>>,
}

impl ClassVocabulary {
    /// Collect the vocabulary of every classification level from a reference
    /// collection.
    pub fn from_chemicals<'a, I>(chemicals: I) -> ClassVocabulary
    where
        I: IntoIterator<Item = &'a ReferenceChemical>,
    {
        let mut sets: Vec<BTreeSet<String>> = vec![BTreeSet::new(), BTreeSet::new(), BTreeSet::new()];
        for chemical in chemicals {
            for level in CLASS_LEVELS {
                if let Some(label) = chemical.class_label(level) {
                    sets[level.index()].insert(label.to_string());
                }
            }
        }

        let labels: Vec<Vec<String>> = sets.into_iter().map(|set| set.into_iter().collect()).collect();
        let index = labels
            .iter()
            .map(|level_labels| {
                level_labels
                    .iter()
                    .enumerate()
                    .map(|(i, label)| (label.clone(), i))
                    .collect()
            })
            .collect();

        ClassVocabulary { labels, index }
    }

    pub fn size(&self, level: ClassLevel) -> usize {
        self.labels[level.index()].len()
    }

    pub fn index_of(&self, level: ClassLevel, label: &str) -> Option<usize> {
        self.index[level.index()].get(label).copied()
    }

    pub fn label(&self, level: ClassLevel, idx: usize) -> Option<&str> {
        self.labels[level.index()].get(idx).map(|s| s.as_str())
    }

    /// One-hot vector over the level vocabulary, `None` for labels that are
    /// missing or not part of the vocabulary.
    pub fn one_hot(&self, level: ClassLevel, label: Option<&str>) -> Option<Vec<f64>> {
        let idx = self.index_of(level, label?)?;
        let mut row = vec![0.0; self.size(level)];
        row[idx] = 1.0;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::taxonomy::TaxonLineage;

    fn chemical(key: &str, pathway: Option<&str>, class: Option<&str>) -> ReferenceChemical {
        ReferenceChemical {
            short_inchikey: key.to_string(),
            exact_mass: 300.0,
            molecular_formula: "C15H24O6".to_string(),
            pathway: pathway.map(|s| s.to_string()),
            superclass: Some("Sesquiterpenoids".to_string()),
            class: class.map(|s| s.to_string()),
            lineage: TaxonLineage::default(),
        }
    }

    #[test]
    fn test_vocabulary_sorted_and_deduplicated() {
        let chemicals = vec![
            chemical("AAA", Some("Terpenoids"), Some("Eudesmanolides")),
            chemical("BBB", Some("Alkaloids"), Some("Eudesmanolides")),
            chemical("CCC", Some("Terpenoids"), None),
        ];
        let vocab = ClassVocabulary::from_chemicals(&chemicals);

        assert_eq!(vocab.size(ClassLevel::Pathway), 2);
        assert_eq!(vocab.label(ClassLevel::Pathway, 0), Some("Alkaloids"));
        assert_eq!(vocab.label(ClassLevel::Pathway, 1), Some("Terpenoids"));
        assert_eq!(vocab.size(ClassLevel::Class), 1);
    }

    #[test]
    fn test_one_hot_lookup() {
        let chemicals = vec![
            chemical("AAA", Some("Terpenoids"), None),
            chemical("BBB", Some("Alkaloids"), None),
        ];
        let vocab = ClassVocabulary::from_chemicals(&chemicals);

        let row = vocab.one_hot(ClassLevel::Pathway, Some("Terpenoids")).unwrap();
        assert_eq!(row, vec![0.0, 1.0]);
        assert!(vocab.one_hot(ClassLevel::Pathway, Some("Polyketides")).is_none());
        assert!(vocab.one_hot(ClassLevel::Pathway, None).is_none());
    }
}
