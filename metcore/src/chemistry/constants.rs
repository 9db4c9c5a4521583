// Purpose: To store mass constants used across adduct and ion calculations
use std::collections::HashMap;

pub const MASS_PROTON: f64 = 1.007276466621; // Unified atomic mass unit
pub const MASS_ELECTRON: f64 = 0.00054857990946; // Unified atomic mass unit
pub const MASS_WATER: f64 = 18.0105646863; // Unified atomic mass unit

// Monoisotopic masses of neutral adduct ingredients. Charge carriers are
// handled as neutral fragments here, the electron count is applied when the
// ion mass of a whole recipe is derived.
pub fn ingredient_masses() -> HashMap<&'static str, f64> {
    let mut map = HashMap::new();
    map.insert("H", 1.00782503223); // hydrogen
    map.insert("H2O", 18.0105646863); // water
    map.insert("NH4", 18.03437413324); // ammonium (NH3 + H)
    map.insert("Na", 22.9897692820); // sodium
    map.insert("K", 38.963706679); // potassium
    map.insert("Cl", 34.968852682); // chloride
    map.insert("Br", 78.9183376); // bromide
    map.insert("ACN", 41.02654910112); // acetonitrile CH3CN
    map.insert("CH3OH", 32.02621474849); // methanol
    map.insert("IsoProp", 60.05751487741); // isopropanol C3H8O
    map.insert("DMSO", 78.01393598735); // dimethyl sulfoxide C2H6OS
    map.insert("FA", 46.00547930360); // formic acid CH2O2
    map.insert("Hac", 60.02112936806); // acetic acid C2H4O2
    map.insert("TFA", 113.99286375956); // trifluoroacetic acid C2HF3O2
    map
}

/// calculate the m/z of a singly protonated molecule
///
/// Arguments:
///
/// * `monoisotopic_mass` - neutral monoisotopic mass of the molecule
///
/// Returns:
///
/// * `mz` - mass-over-charge of the [M+H]+ ion
///
/// # Examples
///
/// ```
/// use metcore::chemistry::constants::protonated_mz;
///
/// let mz = protonated_mz(1000.0);
/// assert_eq!(mz, 1001.007276466621);
/// ```
pub fn protonated_mz(monoisotopic_mass: f64) -> f64 {
    monoisotopic_mass + MASS_PROTON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_masses_cover_charge_carriers() {
        let masses = ingredient_masses();
        assert!(masses.contains_key("H"));
        assert!(masses.contains_key("Na"));
        assert!(masses.contains_key("K"));
        assert!(masses.contains_key("Cl"));
    }

    #[test]
    fn test_proton_is_hydrogen_minus_electron() {
        let masses = ingredient_masses();
        let h = masses["H"];
        // the hydrogen binding energy leaves a gap of about 1.4e-8 u
        assert!((h - MASS_ELECTRON - MASS_PROTON).abs() < 1e-7);
    }
}
