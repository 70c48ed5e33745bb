pub mod address;
pub mod name;
pub mod product;

use serde::{Deserialize, Serialize};

use aircare_core::Gender;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionState {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub product: Option<String>,
    pub address: Option<String>,
    pub is_jabodetabek: Option<bool>,
    pub is_complete: bool,
    pub next_field: Option<&'static str>,
}

/// Builds the data-collection state from the identity slots already
/// known about a user, grounded on
/// `data_collector.py::get_collection_state`. The three fields are asked
/// in a fixed order — name, then product, then address — one at a time,
/// never all at once.
pub fn collection_state(
    name: Option<String>,
    gender: Option<Gender>,
    product: Option<String>,
    address: Option<String>,
) -> CollectionState {
    let is_jabodetabek = address.as_deref().map(address::is_jabodetabek);
    let is_complete = name.is_some() && product.is_some() && address.is_some();
    let next_field = if name.is_none() {
        Some("name")
    } else if product.is_none() {
        Some("product")
    } else if address.is_none() {
        Some("address")
    } else {
        None
    };
    CollectionState { name, gender, product, address, is_jabodetabek, is_complete, next_field }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_field_follows_name_product_address_order() {
        let s = collection_state(None, None, None, None);
        assert_eq!(s.next_field, Some("name"));

        let s = collection_state(Some("Budi".into()), None, None, None);
        assert_eq!(s.next_field, Some("product"));

        let s = collection_state(Some("Budi".into()), None, Some("F57A".into()), None);
        assert_eq!(s.next_field, Some("address"));

        let s = collection_state(Some("Budi".into()), None, Some("F57A".into()), Some("Jl. Merdeka, Depok".into()));
        assert!(s.is_complete);
        assert_eq!(s.next_field, None);
    }
}
