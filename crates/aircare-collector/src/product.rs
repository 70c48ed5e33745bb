use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

pub const VALID_PRODUCTS: &[&str] = &["F57A", "F90A"];

fn product_patterns() -> &'static [(&'static str, &'static [&'static str])] {
    static LIST: OnceLock<Vec<(&'static str, &'static [&'static str])>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            ("F57A", &["F57", "57A", "F-57", "F57A", "EAC57", "EAC-57"] as &[&str]),
            ("F90A", &["F90", "90A", "F-90", "F90A", "EAC90", "EAC-90"] as &[&str]),
        ]
    })
    .as_slice()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductValidation {
    pub valid: bool,
    pub product: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub inferred: bool,
}

/// Canonicalizes a free-text product mention against the known catalog,
/// grounded on `data_collector.py::validate_product`. Tries an exact
/// match after stripping spaces/dashes and uppercasing, then an "EAC" +
/// digit inference, then a pattern-table scan, and finally asks the user
/// to confirm against the two valid SKUs.
pub fn validate_product(input: &str) -> ProductValidation {
    let clean = input.trim().to_uppercase().replace(' ', "").replace('-', "");

    if VALID_PRODUCTS.contains(&clean.as_str()) {
        return ProductValidation { valid: true, product: Some(clean), message: None, inferred: false };
    }

    if clean.contains("EAC") {
        if clean.contains("90") {
            return ProductValidation { valid: true, product: Some("F90A".into()), message: None, inferred: true };
        }
        if clean.contains("57") {
            return ProductValidation { valid: true, product: Some("F57A".into()), message: None, inferred: true };
        }
    }

    for (valid_product, patterns) in product_patterns() {
        if patterns.iter().any(|p| clean.contains(p)) {
            return ProductValidation {
                valid: true,
                product: Some(valid_product.to_string()),
                message: None,
                inferred: true,
            };
        }
    }

    ProductValidation {
        valid: false,
        product: None,
        message: Some(format!(
            "Mohon maaf, produk yang tersedia saat ini hanya {}. Bisa dipastikan lagi produknya yang mana?",
            VALID_PRODUCTS.join(" atau ")
        )),
        inferred: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_passes_through() {
        let v = validate_product("f57a");
        assert!(v.valid);
        assert_eq!(v.product.as_deref(), Some("F57A"));
        assert!(!v.inferred);
    }

    #[test]
    fn eac_plus_digit_infers_product() {
        let v = validate_product("EAC 90");
        assert!(v.valid);
        assert_eq!(v.product.as_deref(), Some("F90A"));
        assert!(v.inferred);
    }

    #[test]
    fn pattern_table_matches_loose_mentions() {
        let v = validate_product("F-57");
        assert_eq!(v.product.as_deref(), Some("F57A"));
    }

    #[test]
    fn unrecognized_product_asks_for_clarification() {
        let v = validate_product("seri X1");
        assert!(!v.valid);
        assert!(v.message.unwrap().contains("F57A atau F90A"));
    }
}
