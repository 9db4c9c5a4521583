use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bincode::{Decode, Encode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chemistry::constants::{ingredient_masses, MASS_ELECTRON};
use crate::error::MetcoreError;

/// Ionization polarity of an acquisition.
///
/// Each polarity carries its own fixed set of adduct recipes, resolved once
/// when a catalog is built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub enum Polarity {
    Positive,
    Negative,
}

// Standard ESI adduct sets. Multimer factor, ingredient deltas and charge are
// all encoded in the bracket notation and parsed on demand.
const POSITIVE_ADDUCTS: &[&str] = &[
    "[M+H]+",
    "[M+NH4]+",
    "[M+Na]+",
    "[M+CH3OH+H]+",
    "[M+K]+",
    "[M+ACN+H]+",
    "[M+2Na-H]+",
    "[M+IsoProp+H]+",
    "[M+ACN+Na]+",
    "[M+2K-H]+",
    "[M+DMSO+H]+",
    "[M+2ACN+H]+",
    "[M+IsoProp+Na+H]+",
    "[M+H-H2O]+",
    "[M+2H]2+",
    "[M+H+NH4]2+",
    "[M+H+Na]2+",
    "[M+H+K]2+",
    "[M+ACN+2H]2+",
    "[M+2Na]2+",
    "[M+2ACN+2H]2+",
    "[M+3ACN+2H]2+",
    "[M+3H]3+",
    "[M+2H+Na]3+",
    "[M+H+2Na]3+",
    "[M+3Na]3+",
    "[2M+H]+",
    "[2M+NH4]+",
    "[2M+Na]+",
    "[2M+K]+",
    "[2M+ACN+H]+",
    "[2M+ACN+Na]+",
    "[2M+3H2O+2H]2+",
];

const NEGATIVE_ADDUCTS: &[&str] = &[
    "[M-H]-",
    "[M-H2O-H]-",
    "[M+Na-2H]-",
    "[M+Cl]-",
    "[M+K-2H]-",
    "[M+FA-H]-",
    "[M+Hac-H]-",
    "[M+Br]-",
    "[M+TFA-H]-",
    "[M-2H]2-",
    "[M-3H]3-",
    "[2M-H]-",
    "[2M+FA-H]-",
    "[2M+Hac-H]-",
    "[3M-H]-",
];

impl Polarity {
    /// Adduct recipes enumerated for this polarity.
    pub fn recipes(&self) -> Result<Vec<AdductRecipe>, MetcoreError> {
        let notations = match self {
            Polarity::Positive => POSITIVE_ADDUCTS,
            Polarity::Negative => NEGATIVE_ADDUCTS,
        };
        notations.iter().map(|n| AdductRecipe::from_notation(n)).collect()
    }
}

impl FromStr for Polarity {
    type Err = MetcoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pos" | "positive" | "+" => Ok(Polarity::Positive),
            "neg" | "negative" | "-" => Ok(Polarity::Negative),
            _ => Err(MetcoreError::UnknownPolarity(s.to_string())),
        }
    }
}

impl Display for Polarity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => write!(f, "pos"),
            Polarity::Negative => write!(f, "neg"),
        }
    }
}

/// A single ionization recipe: which neutral fragments are gained or lost,
/// how many copies of the molecule are involved and the resulting charge.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct AdductRecipe {
    /// Conventional bracket notation, e.g. `[2M+Na]+`.
    pub notation: String,
    /// Number of molecule copies in the ion (1 = monomer, 2 = dimer, ...).
    pub multimer: u32,
    /// Signed charge of the ion, never zero.
    pub charge: i32,
    /// Ingredient name paired with its signed count.
    pub ingredients: Vec<(String, i32)>,
}

impl AdductRecipe {
    /// Parse an adduct recipe from its bracket notation.
    ///
    /// # Arguments
    ///
    /// * `notation` - notation of the form `[xM±ingredients]z±`, where `x` is
    ///   an optional multimer factor and `z` an optional charge count
    ///
    /// # Returns
    ///
    /// * `recipe` - the parsed recipe, or an error for malformed notation or
    ///   unknown ingredient names
    ///
    /// # Examples
    ///
    /// ```
    /// use metcore::chemistry::adduct::AdductRecipe;
    ///
    /// let recipe = AdductRecipe::from_notation("[2M+Na]+").unwrap();
    /// assert_eq!(recipe.multimer, 2);
    /// assert_eq!(recipe.charge, 1);
    /// ```
    pub fn from_notation(notation: &str) -> Result<AdductRecipe, MetcoreError> {
        let pattern = Regex::new(r"^\[(\d*)M((?:[+-]\d*[A-Za-z][A-Za-z0-9]*)*)\](\d*)([+-])$").unwrap();
        let token_pattern = Regex::new(r"([+-])(\d*)([A-Za-z][A-Za-z0-9]*)").unwrap();

        let captures = pattern
            .captures(notation)
            .ok_or_else(|| MetcoreError::AdductNotation(notation.to_string()))?;

        let multimer: u32 = match &captures[1] {
            "" => 1,
            digits => digits
                .parse()
                .map_err(|_| MetcoreError::AdductNotation(notation.to_string()))?,
        };
        if multimer == 0 {
            return Err(MetcoreError::AdductNotation(notation.to_string()));
        }

        let charge_count: i32 = match &captures[3] {
            "" => 1,
            digits => digits
                .parse()
                .map_err(|_| MetcoreError::AdductNotation(notation.to_string()))?,
        };
        if charge_count == 0 {
            return Err(MetcoreError::AdductNotation(notation.to_string()));
        }
        let charge = match &captures[4] {
            "+" => charge_count,
            _ => -charge_count,
        };

        let masses = ingredient_masses();
        let mut ingredients = Vec::new();
        for token in token_pattern.captures_iter(&captures[2]) {
            let count: i32 = match &token[2] {
                "" => 1,
                digits => digits
                    .parse()
                    .map_err(|_| MetcoreError::AdductNotation(notation.to_string()))?,
            };
            let name = &token[3];
            if !masses.contains_key(name) {
                return Err(MetcoreError::UnknownIngredient(name.to_string()));
            }
            let signed = if &token[1] == "+" { count } else { -count };
            ingredients.push((name.to_string(), signed));
        }

        Ok(AdductRecipe {
            notation: notation.to_string(),
            multimer,
            charge,
            ingredients,
        })
    }

    /// Polarity implied by the charge sign.
    pub fn polarity(&self) -> Polarity {
        if self.charge > 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }

    /// calculate the m/z of the adduct ion for a neutral monoisotopic mass
    ///
    /// Arguments:
    ///
    /// * `neutral_mass` - monoisotopic mass of the neutral molecule
    ///
    /// Returns:
    ///
    /// * `mz` - mass-over-charge of the adduct ion
    ///
    /// # Examples
    ///
    /// ```
    /// use metcore::chemistry::adduct::AdductRecipe;
    ///
    /// let recipe = AdductRecipe::from_notation("[M+H]+").unwrap();
    /// let mz = recipe.ion_mz(180.06338810);
    /// assert!((mz - 181.07066455).abs() < 1e-6);
    /// ```
    pub fn ion_mz(&self, neutral_mass: f64) -> f64 {
        let masses = ingredient_masses();
        let delta: f64 = self
            .ingredients
            .iter()
            .map(|(name, count)| masses.get(name.as_str()).unwrap_or(&0.0) * *count as f64)
            .sum();
        let charge = self.charge as f64;
        (self.multimer as f64 * neutral_mass + delta - charge * MASS_ELECTRON) / charge.abs()
    }
}

impl Display for AdductRecipe {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.notation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::constants::protonated_mz;

    const GLUCOSE: f64 = 180.06338810;

    #[test]
    fn test_parse_protonated() {
        let recipe = AdductRecipe::from_notation("[M+H]+").unwrap();
        assert_eq!(recipe.multimer, 1);
        assert_eq!(recipe.charge, 1);
        assert_eq!(recipe.ingredients, vec![("H".to_string(), 1)]);
        assert_eq!(recipe.polarity(), Polarity::Positive);
    }

    #[test]
    fn test_parse_counts_and_losses() {
        let recipe = AdductRecipe::from_notation("[M+2Na-H]+").unwrap();
        assert_eq!(
            recipe.ingredients,
            vec![("Na".to_string(), 2), ("H".to_string(), -1)]
        );
    }

    #[test]
    fn test_parse_multimer_and_multi_charge() {
        let dimer = AdductRecipe::from_notation("[2M+Na]+").unwrap();
        assert_eq!(dimer.multimer, 2);

        let triply = AdductRecipe::from_notation("[M-3H]3-").unwrap();
        assert_eq!(triply.charge, -3);
        assert_eq!(triply.ingredients, vec![("H".to_string(), -3)]);
        assert_eq!(triply.polarity(), Polarity::Negative);
    }

    #[test]
    fn test_parse_rejects_malformed_notation() {
        assert!(matches!(
            AdductRecipe::from_notation("M+H"),
            Err(MetcoreError::AdductNotation(_))
        ));
        assert!(matches!(
            AdductRecipe::from_notation("[0M+H]+"),
            Err(MetcoreError::AdductNotation(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_ingredient() {
        assert!(matches!(
            AdductRecipe::from_notation("[M+Xx]+"),
            Err(MetcoreError::UnknownIngredient(_))
        ));
    }

    #[test]
    fn test_ion_mz_positive_mode() {
        let protonated = AdductRecipe::from_notation("[M+H]+").unwrap();
        assert!((protonated.ion_mz(GLUCOSE) - 181.07066455).abs() < 1e-6);

        let sodiated = AdductRecipe::from_notation("[M+Na]+").unwrap();
        assert!((sodiated.ion_mz(GLUCOSE) - 203.05260880).abs() < 1e-6);

        let doubly = AdductRecipe::from_notation("[M+2H]2+").unwrap();
        assert!((doubly.ion_mz(GLUCOSE) - 91.03897050).abs() < 1e-6);

        let dimer = AdductRecipe::from_notation("[2M+H]+").unwrap();
        assert!((dimer.ion_mz(GLUCOSE) - 361.13405265).abs() < 1e-6);
    }

    #[test]
    fn test_ion_mz_agrees_with_protonated_shortcut() {
        // the recipe path assembles H minus an electron, the shortcut uses the
        // tabulated proton mass; the hydrogen binding energy separates them by
        // about 1.4e-8 u
        let recipe = AdductRecipe::from_notation("[M+H]+").unwrap();
        assert!((recipe.ion_mz(GLUCOSE) - protonated_mz(GLUCOSE)).abs() < 1e-7);
    }

    #[test]
    fn test_ion_mz_negative_mode() {
        let deprotonated = AdductRecipe::from_notation("[M-H]-").unwrap();
        assert!((deprotonated.ion_mz(GLUCOSE) - 179.05611165).abs() < 1e-6);

        let chloride = AdductRecipe::from_notation("[M+Cl]-").unwrap();
        assert!((chloride.ion_mz(GLUCOSE) - 215.03278936).abs() < 1e-6);
    }

    #[test]
    fn test_recipe_tables_parse() {
        let positive = Polarity::Positive.recipes().unwrap();
        let negative = Polarity::Negative.recipes().unwrap();
        assert_eq!(positive.len(), 33);
        assert_eq!(negative.len(), 15);
        assert!(positive.iter().all(|r| r.polarity() == Polarity::Positive));
        assert!(negative.iter().all(|r| r.polarity() == Polarity::Negative));
    }

    #[test]
    fn test_notation_round_trip() {
        for notation in ["[M+H]+", "[2M+ACN+Na]+", "[M-2H]2-", "[3M-H]-"] {
            let recipe = AdductRecipe::from_notation(notation).unwrap();
            assert_eq!(recipe.to_string(), notation);
        }
    }

    #[test]
    fn test_polarity_from_str() {
        assert_eq!("pos".parse::<Polarity>().unwrap(), Polarity::Positive);
        assert_eq!("Negative".parse::<Polarity>().unwrap(), Polarity::Negative);
        assert!("ions".parse::<Polarity>().is_err());
    }
}
