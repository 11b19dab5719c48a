//! Shipping address type.

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ShippingAddress`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum AddressError {
    /// A required field is empty or whitespace-only.
    #[error("address field `{0}` is required")]
    MissingField(&'static str),
}

/// A shipping address attached to an order.
///
/// All five fields are required and must be non-empty. The service performs
/// no postal validation beyond that; address quality is the upstream
/// checkout form's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Validate that every required field is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<(), AddressError> {
        for (name, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "12 Market Lane".to_string(),
            city: "Portland".to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(address().validate().is_ok());
    }

    #[test]
    fn test_empty_field_rejected() {
        let mut addr = address();
        addr.city = String::new();
        assert!(matches!(
            addr.validate(),
            Err(AddressError::MissingField("city"))
        ));
    }

    #[test]
    fn test_whitespace_field_rejected() {
        let mut addr = address();
        addr.postal_code = "   ".to_string();
        assert!(matches!(
            addr.validate(),
            Err(AddressError::MissingField("postal_code"))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            address().to_string(),
            "12 Market Lane, Portland, OR 97201, US"
        );
    }
}
