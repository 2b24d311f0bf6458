//! Level-III product and category tables
//!
//! Maps product categories to named products, and named products to the
//! AWIPS product codes a provider may list. Used to bucket the available
//! products reported by a Level-III provider.

use std::collections::BTreeMap;

/// Default Level-III product used for discovery requests
pub const DEFAULT_LEVEL3_PRODUCT: &str = "N0B";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level3ProductCategory {
    Reflectivity,
    Velocity,
    StormRelativeVelocity,
    SpectrumWidth,
    DifferentialReflectivity,
    SpecificDifferentialPhase,
    CorrelationCoefficient,
    Precipitation,
}

impl Level3ProductCategory {
    pub const ALL: [Level3ProductCategory; 8] = [
        Level3ProductCategory::Reflectivity,
        Level3ProductCategory::Velocity,
        Level3ProductCategory::StormRelativeVelocity,
        Level3ProductCategory::SpectrumWidth,
        Level3ProductCategory::DifferentialReflectivity,
        Level3ProductCategory::SpecificDifferentialPhase,
        Level3ProductCategory::CorrelationCoefficient,
        Level3ProductCategory::Precipitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level3ProductCategory::Reflectivity => "Reflectivity",
            Level3ProductCategory::Velocity => "Velocity",
            Level3ProductCategory::StormRelativeVelocity => "Storm Relative Velocity",
            Level3ProductCategory::SpectrumWidth => "Spectrum Width",
            Level3ProductCategory::DifferentialReflectivity => "Differential Reflectivity",
            Level3ProductCategory::SpecificDifferentialPhase => "Specific Differential Phase",
            Level3ProductCategory::CorrelationCoefficient => "Correlation Coefficient",
            Level3ProductCategory::Precipitation => "Precipitation",
        }
    }
}

impl std::fmt::Display for Level3ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

type ProductTable = &'static [(&'static str, &'static [&'static str])];

static REFLECTIVITY_PRODUCTS: ProductTable = &[
    ("Base Reflectivity", &["N0B", "N1B", "N2B", "N3B"]),
    ("Composite Reflectivity", &["NCR"]),
];
static VELOCITY_PRODUCTS: ProductTable =
    &[("Base Velocity", &["N0G", "N1G", "N2G", "N3G"])];
static STORM_RELATIVE_VELOCITY_PRODUCTS: ProductTable =
    &[("Storm Relative Velocity", &["N0S", "N1S", "N2S", "N3S"])];
static SPECTRUM_WIDTH_PRODUCTS: ProductTable = &[("Spectrum Width", &["NSW"])];
static DIFFERENTIAL_REFLECTIVITY_PRODUCTS: ProductTable =
    &[("Differential Reflectivity", &["N0X", "N1X", "N2X", "N3X"])];
static SPECIFIC_DIFFERENTIAL_PHASE_PRODUCTS: ProductTable =
    &[("Specific Differential Phase", &["N0K", "N1K", "N2K", "N3K"])];
static CORRELATION_COEFFICIENT_PRODUCTS: ProductTable =
    &[("Correlation Coefficient", &["N0C", "N1C", "N2C", "N3C"])];
static PRECIPITATION_PRODUCTS: ProductTable = &[
    ("One Hour Accumulation", &["OHA"]),
    ("Storm Total Accumulation", &["STA", "DSA"]),
    ("Digital Precipitation Array", &["DPA"]),
];

/// Named products and their AWIPS codes per category
pub fn products_by_category(category: Level3ProductCategory) -> ProductTable {
    match category {
        Level3ProductCategory::Reflectivity => REFLECTIVITY_PRODUCTS,
        Level3ProductCategory::Velocity => VELOCITY_PRODUCTS,
        Level3ProductCategory::StormRelativeVelocity => STORM_RELATIVE_VELOCITY_PRODUCTS,
        Level3ProductCategory::SpectrumWidth => SPECTRUM_WIDTH_PRODUCTS,
        Level3ProductCategory::DifferentialReflectivity => DIFFERENTIAL_REFLECTIVITY_PRODUCTS,
        Level3ProductCategory::SpecificDifferentialPhase => SPECIFIC_DIFFERENTIAL_PHASE_PRODUCTS,
        Level3ProductCategory::CorrelationCoefficient => CORRELATION_COEFFICIENT_PRODUCTS,
        Level3ProductCategory::Precipitation => PRECIPITATION_PRODUCTS,
    }
}

/// Map category -> product name -> the subset of its AWIPS codes present in
/// the provider's listing. Categories with no available products are absent.
pub type Level3CategoryMap = BTreeMap<Level3ProductCategory, BTreeMap<String, Vec<String>>>;

pub fn build_category_map(available_codes: &[String]) -> Level3CategoryMap {
    let mut categories = Level3CategoryMap::new();

    for category in Level3ProductCategory::ALL {
        let mut available_products: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (product, codes) in products_by_category(category) {
            let available: Vec<String> = codes
                .iter()
                .filter(|code| available_codes.iter().any(|c| c == *code))
                .map(|code| code.to_string())
                .collect();

            if !available.is_empty() {
                available_products.insert(product.to_string(), available);
            }
        }

        if !available_products.is_empty() {
            categories.insert(category, available_products);
        }
    }

    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_available_codes_into_categories() {
        let available = vec![
            "N0B".to_string(),
            "N1B".to_string(),
            "N0G".to_string(),
            "OHA".to_string(),
            "ZZZ".to_string(),
        ];

        let map = build_category_map(&available);

        let reflectivity = &map[&Level3ProductCategory::Reflectivity];
        assert_eq!(
            reflectivity["Base Reflectivity"],
            vec!["N0B".to_string(), "N1B".to_string()]
        );
        assert!(!reflectivity.contains_key("Composite Reflectivity"));

        assert!(map.contains_key(&Level3ProductCategory::Velocity));
        assert!(map.contains_key(&Level3ProductCategory::Precipitation));
        assert!(!map.contains_key(&Level3ProductCategory::SpectrumWidth));
    }

    #[test]
    fn empty_listing_yields_empty_map() {
        assert!(build_category_map(&[]).is_empty());
    }
}
