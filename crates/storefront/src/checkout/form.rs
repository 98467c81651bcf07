//! Checkout form data.

use std::fmt;

use vitrine_core::{PaymentMethod, ZipCode};

use super::CheckoutStep;

/// A text field of the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    ZipCode,
    Street,
    Number,
    Complement,
    Neighborhood,
    City,
    State,
    CardNumber,
    CardName,
    CardExpiry,
    CardCvv,
}

impl Field {
    /// Form key, as a UI would name the input.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::ZipCode => "zipCode",
            Self::Street => "address",
            Self::Number => "number",
            Self::Complement => "complement",
            Self::Neighborhood => "neighborhood",
            Self::City => "city",
            Self::State => "state",
            Self::CardNumber => "cardNumber",
            Self::CardName => "cardName",
            Self::CardExpiry => "cardExpiry",
            Self::CardCvv => "cardCvv",
        }
    }

    /// The step that collects this field.
    #[must_use]
    pub const fn step(self) -> CheckoutStep {
        match self {
            Self::FirstName | Self::LastName | Self::Email | Self::Phone => CheckoutStep::Contact,
            Self::ZipCode
            | Self::Street
            | Self::Number
            | Self::Complement
            | Self::Neighborhood
            | Self::City
            | Self::State => CheckoutStep::Address,
            Self::CardNumber | Self::CardName | Self::CardExpiry | Self::CardCvv => {
                CheckoutStep::Payment
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the buyer has typed so far. Values are kept as entered.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// Digits only, at most eight.
    pub zip_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub payment_method: PaymentMethod,
    pub card_number: String,
    pub card_name: String,
    pub card_expiry: String,
    pub card_cvv: String,
}

impl CheckoutForm {
    /// Current value of `field`.
    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::ZipCode => &self.zip_code,
            Field::Street => &self.street,
            Field::Number => &self.number,
            Field::Complement => &self.complement,
            Field::Neighborhood => &self.neighborhood,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::CardNumber => &self.card_number,
            Field::CardName => &self.card_name,
            Field::CardExpiry => &self.card_expiry,
            Field::CardCvv => &self.card_cvv,
        }
    }

    /// Replace the value of `field`. The zip code keeps only its first eight digits.
    pub fn set(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
            Field::ZipCode => {
                self.zip_code = normalize_zip(value);
                return;
            }
            Field::Street => &mut self.street,
            Field::Number => &mut self.number,
            Field::Complement => &mut self.complement,
            Field::Neighborhood => &mut self.neighborhood,
            Field::City => &mut self.city,
            Field::State => &mut self.state,
            Field::CardNumber => &mut self.card_number,
            Field::CardName => &mut self.card_name,
            Field::CardExpiry => &mut self.card_expiry,
            Field::CardCvv => &mut self.card_cvv,
        };
        value.clone_into(slot);
    }

    /// "First Last", trimmed.
    #[must_use]
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

impl fmt::Debug for CheckoutForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutForm")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("zip_code", &self.zip_code)
            .field("street", &self.street)
            .field("number", &self.number)
            .field("complement", &self.complement)
            .field("neighborhood", &self.neighborhood)
            .field("city", &self.city)
            .field("state", &self.state)
            .field("payment_method", &self.payment_method)
            .field("card_number", &"[REDACTED]")
            .field("card_name", &self.card_name)
            .field("card_expiry", &"[REDACTED]")
            .field("card_cvv", &"[REDACTED]")
            .finish()
    }
}

fn normalize_zip(raw: &str) -> String {
    ZipCode::digits_of(raw).chars().take(ZipCode::LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_zip_keeps_eight_digits() {
        let mut form = CheckoutForm::default();
        form.set(Field::ZipCode, "01310-100 ext 9");
        assert_eq!(form.zip_code, "01310100");

        form.set(Field::ZipCode, "013");
        assert_eq!(form.zip_code, "013");
    }

    #[test]
    fn test_zip_is_normalized_on_every_set() {
        let mut form = CheckoutForm::default();
        form.set(Field::ZipCode, "04538-132");
        assert_eq!(form.get(Field::ZipCode), "04538132");

        form.set(Field::ZipCode, "cep: ");
        assert_eq!(form.get(Field::ZipCode), "");
        assert_eq!(form.get(Field::Street), "");
    }

    #[test]
    fn test_set_then_get() {
        let mut form = CheckoutForm::default();
        form.set(Field::Street, "Rua Augusta");
        form.set(Field::CardName, "ANA SOUZA");
        assert_eq!(form.get(Field::Street), "Rua Augusta");
        assert_eq!(form.get(Field::CardName), "ANA SOUZA");
        assert_eq!(form.get(Field::City), "");
    }

    #[test]
    fn test_customer_name() {
        let mut form = CheckoutForm::default();
        form.set(Field::FirstName, " Ana ");
        form.set(Field::LastName, "Souza");
        assert_eq!(form.customer_name(), "Ana Souza");
    }

    #[test]
    fn test_debug_redacts_card() {
        let mut form = CheckoutForm::default();
        form.set(Field::CardNumber, "4111111111111111");
        form.set(Field::CardCvv, "123");
        let debug = format!("{form:?}");
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("\"123\""));
    }

    #[test]
    fn test_default_payment_method_is_credit() {
        assert_eq!(CheckoutForm::default().payment_method, PaymentMethod::Credit);
    }
}
