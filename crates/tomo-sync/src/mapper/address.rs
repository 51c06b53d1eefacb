//! Address mapping.

use tomo_core::Address;
use tomo_woo::WooAddress;

/// Country used when an address does not carry one.
pub const DEFAULT_COUNTRY: &str = "ES";

/// Internal address to the store shape. Country falls back to
/// [`DEFAULT_COUNTRY`] because the store rejects address payloads without
/// one.
#[must_use]
pub fn to_woo(address: &Address) -> WooAddress {
    WooAddress {
        first_name: address.first_name.clone(),
        last_name: address.last_name.clone(),
        company: address.company.clone(),
        address_1: address.address_1.clone(),
        address_2: address.address_2.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        postcode: address.postcode.clone(),
        country: Some(
            address
                .country
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        ),
        email: address.email.clone(),
        phone: address.phone.clone(),
    }
}

/// Store address to the internal shape.
#[must_use]
pub fn from_woo(address: &WooAddress) -> Address {
    Address {
        first_name: address.first_name.clone(),
        last_name: address.last_name.clone(),
        company: address.company.clone(),
        address_1: address.address_1.clone(),
        address_2: address.address_2.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        postcode: address.postcode.clone(),
        country: address.country.clone(),
        email: address.email.clone(),
        phone: address.phone.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_country_defaults() {
        let address = Address {
            city: Some("Madrid".to_string()),
            ..Default::default()
        };
        let woo = to_woo(&address);
        assert_eq!(woo.country.as_deref(), Some("ES"));
        assert_eq!(woo.city.as_deref(), Some("Madrid"));
    }

    #[test]
    fn test_round_trip_preserves_populated_fields() {
        let address = Address {
            first_name: Some("Ana".to_string()),
            last_name: Some("Pérez".to_string()),
            address_1: Some("Calle Mayor 1".to_string()),
            postcode: Some("28001".to_string()),
            country: Some("MX".to_string()),
            phone: Some("+34 600 000 000".to_string()),
            ..Default::default()
        };
        let back = from_woo(&to_woo(&address));
        assert_eq!(back, address);
    }
}
