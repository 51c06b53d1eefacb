//! Customer mapping.

use tomo_core::Customer;
use tomo_woo::WooCustomer;

use super::address;

/// Split a full name into (first, last) on the first whitespace boundary.
#[must_use]
pub fn split_full_name(full_name: &str) -> (Option<String>, Option<String>) {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (
            Some(first.to_string()),
            Some(rest.trim().to_string()),
        ),
        None => (Some(trimmed.to_string()), None),
    }
}

/// Join first/last name back into a display name.
#[must_use]
pub fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    match (first, last) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        (None, Some(last)) => last.to_string(),
        (None, None) => String::new(),
    }
}

/// Internal customer to the store shape.
#[must_use]
pub fn to_woo(customer: &Customer) -> WooCustomer {
    WooCustomer {
        id: None,
        email: customer.email.clone(),
        first_name: customer.first_name.clone(),
        last_name: customer.last_name.clone(),
        billing: customer.billing.as_ref().map(address::to_woo),
        shipping: customer.shipping.as_ref().map(address::to_woo),
        date_modified_gmt: None,
    }
}

/// Overlay an inbound store customer onto the internal record.
///
/// The email natural key is only replaced when the payload carries one;
/// identity fields and addresses overwrite what is present in the payload.
pub fn apply_inbound(customer: &mut Customer, woo: &WooCustomer) {
    if !woo.email.trim().is_empty() {
        customer.email = woo.email.trim().to_string();
    }
    if woo.first_name.is_some() {
        customer.first_name = woo.first_name.clone();
    }
    if woo.last_name.is_some() {
        customer.last_name = woo.last_name.clone();
    }
    if let Some(billing) = &woo.billing {
        customer.billing = Some(address::from_woo(billing));
    }
    if let Some(shipping) = &woo.shipping {
        customer.shipping = Some(address::from_woo(shipping));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomo_woo::WooAddress;

    #[test]
    fn test_split_on_first_whitespace() {
        assert_eq!(
            split_full_name("Gabriel García Márquez"),
            (
                Some("Gabriel".to_string()),
                Some("García Márquez".to_string())
            )
        );
        assert_eq!(split_full_name("Cher"), (Some("Cher".to_string()), None));
        assert_eq!(split_full_name("   "), (None, None));
    }

    #[test]
    fn test_join_name() {
        assert_eq!(join_name(Some("Ana"), Some("Pérez")), "Ana Pérez");
        assert_eq!(join_name(Some("Ana"), None), "Ana");
        assert_eq!(join_name(None, None), "");
    }

    #[test]
    fn test_apply_inbound_keeps_email_when_payload_is_blank() {
        let mut customer = Customer::new("ana@example.com");
        let woo = WooCustomer {
            email: "  ".to_string(),
            first_name: Some("Ana".to_string()),
            ..Default::default()
        };
        apply_inbound(&mut customer, &woo);
        assert_eq!(customer.email, "ana@example.com");
        assert_eq!(customer.first_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_apply_inbound_overlays_addresses() {
        let mut customer = Customer::new("ana@example.com");
        let woo = WooCustomer {
            email: "ana@example.com".to_string(),
            billing: Some(WooAddress {
                city: Some("Sevilla".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        apply_inbound(&mut customer, &woo);
        assert_eq!(
            customer.billing.as_ref().unwrap().city.as_deref(),
            Some("Sevilla")
        );
        assert!(customer.shipping.is_none());
    }
}
