use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::chemistry::adduct::{AdductRecipe, Polarity};
use crate::error::MetcoreError;

/// Reference structures sharing one molecular formula.
///
/// Adduct enumeration works on formula groups rather than individual
/// structures: isomers share every adduct mass, so one catalog entry per
/// (formula, recipe) pair carries all member structures at once.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct FormulaGroup {
    pub formula: String,
    pub neutral_mass: f64,
    /// Short InChIKeys of the member structures.
    pub structure_ids: Vec<String>,
}

/// One catalog entry: a formula group ionized by one recipe.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct ChemicalAdduct {
    pub adduct_mz: f64,
    pub group: u32,
    pub recipe: u16,
}

/// Adduct-mass catalog over a reference collection.
///
/// Entries are sorted ascending by m/z at build time, which is the
/// precondition for the binary range queries below.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct AdductCatalog {
    pub polarity: Polarity,
    pub recipes: Vec<AdductRecipe>,
    pub groups: Vec<FormulaGroup>,
    entries: Vec<ChemicalAdduct>,
}

impl AdductCatalog {
    /// Build a catalog for one polarity using its built-in recipe table.
    pub fn build(polarity: Polarity, groups: Vec<FormulaGroup>) -> Result<AdductCatalog, MetcoreError> {
        let recipes = polarity.recipes()?;
        AdductCatalog::with_recipes(polarity, recipes, groups)
    }

    /// Build a catalog with an explicit recipe list instead of the built-in
    /// table. Every recipe must match the catalog polarity.
    pub fn with_recipes(
        polarity: Polarity,
        recipes: Vec<AdductRecipe>,
        groups: Vec<FormulaGroup>,
    ) -> Result<AdductCatalog, MetcoreError> {
        if recipes.is_empty() {
            return Err(MetcoreError::Config("adduct recipe list is empty".to_string()));
        }
        for recipe in &recipes {
            if recipe.polarity() != polarity {
                return Err(MetcoreError::Config(format!(
                    "recipe {} does not match catalog polarity {}",
                    recipe, polarity
                )));
            }
        }

        let mut entries = Vec::with_capacity(groups.len() * recipes.len());
        for (g, group) in groups.iter().enumerate() {
            for (r, recipe) in recipes.iter().enumerate() {
                entries.push(ChemicalAdduct {
                    adduct_mz: recipe.ion_mz(group.neutral_mass),
                    group: g as u32,
                    recipe: r as u16,
                });
            }
        }
        entries.sort_by(|a, b| a.adduct_mz.total_cmp(&b.adduct_mz));

        Ok(AdductCatalog { polarity, recipes, groups, entries })
    }

    /// Entries whose adduct m/z lies within `mz * (1 ± tolerance_ppm * 1e-6)`.
    ///
    /// Binary-searches the first entry at or above the window start, then
    /// scans forward to the window end. The returned slice may be empty.
    pub fn query(&self, mz: f64, tolerance_ppm: f64) -> &[ChemicalAdduct] {
        let tol = tolerance_ppm * 1e-6;
        let lo = mz * (1.0 - tol);
        let hi = mz * (1.0 + tol);

        let (_, start) = self.first_at_least(lo);
        let mut end = start;
        while end < self.entries.len() && self.entries[end].adduct_mz <= hi {
            end += 1;
        }
        &self.entries[start..end]
    }

    /// Binary search for the first entry with m/z at or above `mass`.
    ///
    /// Returns whether such an entry exists together with its index; absent a
    /// hit the index is the insertion point `len()`.
    pub fn first_at_least(&self, mass: f64) -> (bool, usize) {
        let idx = self.entries.partition_point(|e| e.adduct_mz < mass);
        (idx < self.entries.len(), idx)
    }

    pub fn entries(&self) -> &[ChemicalAdduct] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].adduct_mz <= w[1].adduct_mz)
    }

    pub fn group_of(&self, entry: &ChemicalAdduct) -> &FormulaGroup {
        &self.groups[entry.group as usize]
    }

    pub fn recipe_of(&self, entry: &ChemicalAdduct) -> &AdductRecipe {
        &self.recipes[entry.recipe as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn single_structure_group(formula: &str, neutral_mass: f64, structure_id: &str) -> FormulaGroup {
        FormulaGroup {
            formula: formula.to_string(),
            neutral_mass,
            structure_ids: vec![structure_id.to_string()],
        }
    }

    /// Catalog whose [M+H]+ entries land exactly on the given target masses.
    fn protonated_catalog(targets: &[f64]) -> AdductCatalog {
        let recipe = AdductRecipe::from_notation("[M+H]+").unwrap();
        let delta = recipe.ion_mz(0.0);
        let groups: Vec<FormulaGroup> = targets
            .iter()
            .enumerate()
            .map(|(i, &target)| {
                single_structure_group(&format!("F{}", i), target - delta, &format!("STRUCT{:02}", i))
            })
            .collect();
        AdductCatalog::with_recipes(Polarity::Positive, vec![recipe], groups).unwrap()
    }

    #[test]
    fn test_entries_sorted_after_build() {
        let catalog = protonated_catalog(&[300.0, 100.0, 200.5, 150.0, 150.0]);
        assert!(catalog.is_sorted());
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_range_query_hits_window_only() {
        // masses 100.0, 150.0, 150.0, 200.5, 300.0; 1000 ppm at 150.0 is +- 0.15
        let catalog = protonated_catalog(&[100.0, 150.0, 150.0, 200.5, 300.0]);
        let hits = catalog.query(150.0, 1000.0);
        assert_eq!(hits.len(), 2);
        for hit in hits {
            assert!((hit.adduct_mz - 150.0).abs() <= 0.15);
        }
    }

    #[test]
    fn test_range_query_may_be_empty() {
        let catalog = protonated_catalog(&[100.0, 150.0, 150.0, 200.5, 300.0]);
        assert!(catalog.query(500.0, 1000.0).is_empty());
        assert!(catalog.query(125.0, 10.0).is_empty());
    }

    #[test]
    fn test_first_at_least_reports_insertion_point() {
        let catalog = protonated_catalog(&[100.0, 150.0, 150.0, 200.5, 300.0]);

        let (found, idx) = catalog.first_at_least(50.0);
        assert!(found);
        assert_eq!(idx, 0);

        let (found, idx) = catalog.first_at_least(151.0);
        assert!(found);
        assert_eq!(idx, 3);

        let (found, idx) = catalog.first_at_least(300.5);
        assert!(!found);
        assert_eq!(idx, 5);
    }

    #[test]
    fn test_binary_query_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(42);
        let targets: Vec<f64> = (0..400).map(|_| rng.gen_range(100.0..900.0)).collect();
        let catalog = protonated_catalog(&targets);

        for _ in 0..200 {
            let mz = rng.gen_range(90.0..910.0);
            let ppm = rng.gen_range(5.0..2000.0);
            let tol = ppm * 1e-6;
            let lo = mz * (1.0 - tol);
            let hi = mz * (1.0 + tol);

            let binary: Vec<f64> = catalog.query(mz, ppm).iter().map(|e| e.adduct_mz).collect();
            let linear: Vec<f64> = catalog
                .entries()
                .iter()
                .filter(|e| e.adduct_mz >= lo && e.adduct_mz <= hi)
                .map(|e| e.adduct_mz)
                .collect();
            assert_eq!(binary, linear);
        }
    }

    #[test]
    fn test_build_uses_polarity_table() {
        let group = single_structure_group("C6H12O6", 180.06338810, "GZCGUPFRVQAUEE");
        let catalog = AdductCatalog::build(Polarity::Negative, vec![group]).unwrap();
        assert_eq!(catalog.len(), 15);
        assert!(catalog.is_sorted());
    }

    #[test]
    fn test_mismatching_recipe_polarity_rejected() {
        let deprotonated = AdductRecipe::from_notation("[M-H]-").unwrap();
        let group = single_structure_group("C6H12O6", 180.06338810, "GZCGUPFRVQAUEE");
        let result = AdductCatalog::with_recipes(Polarity::Positive, vec![deprotonated], vec![group]);
        assert!(matches!(result, Err(MetcoreError::Config(_))));
    }

    #[test]
    fn test_empty_recipe_list_rejected() {
        let group = single_structure_group("C6H12O6", 180.06338810, "GZCGUPFRVQAUEE");
        let result = AdductCatalog::with_recipes(Polarity::Positive, Vec::new(), vec![group]);
        assert!(matches!(result, Err(MetcoreError::Config(_))));
    }
}
