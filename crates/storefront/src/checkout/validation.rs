//! Per-step field validation.

use std::fmt;

use vitrine_core::{Email, PaymentMethod, ZipCode};

use super::{CheckoutForm, CheckoutStep, Field};
use crate::orders::{Customer, ShippingAddress};

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=13;
const CARD_DIGITS: std::ops::RangeInclusive<usize> = 13..=19;
const CVV_DIGITS: std::ops::RangeInclusive<usize> = 3..=4;

/// What is wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    /// Required but empty.
    Missing,
    /// Present but malformed. Carries a short explanation.
    Invalid(&'static str),
}

/// A problem with one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub problem: Problem,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            Problem::Missing => write!(f, "{} is required", self.field),
            Problem::Invalid(reason) => write!(f, "{} {reason}", self.field),
        }
    }
}

impl std::error::Error for FieldError {}

/// Every field problem blocking a step, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// The problems.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// The problem with `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }

    /// Returns true if `field` has a problem.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn push(&mut self, field: Field, problem: Problem) {
        self.0.push(FieldError { field, problem });
    }

    fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check the fields `step` requires.
///
/// # Errors
///
/// Returns every problem found. Review has no fields of its own and always passes.
pub fn validate_step(form: &CheckoutForm, step: CheckoutStep) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    match step {
        CheckoutStep::Contact => check_contact(form, &mut errors),
        CheckoutStep::Address => check_address(form, &mut errors),
        CheckoutStep::Payment => check_payment(form, &mut errors),
        CheckoutStep::Review => {}
    }
    errors.into_result()
}

/// Check every step and build the order's customer, address and payment method.
///
/// # Errors
///
/// Returns every problem found across all steps.
pub(crate) fn order_details(
    form: &CheckoutForm,
) -> Result<(Customer, ShippingAddress, PaymentMethod), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_contact(form, &mut errors);
    check_address(form, &mut errors);
    check_payment(form, &mut errors);
    errors.into_result()?;

    let email = Email::parse(&form.email)
        .map_err(|_| invalid(Field::Email, "must be a valid email address"))?;
    let zip_code = ZipCode::parse(&form.zip_code)
        .map_err(|_| invalid(Field::ZipCode, "must have 8 digits"))?;

    let complement = form.complement.trim();
    let customer = Customer {
        name: form.customer_name(),
        email,
        phone: form.phone.chars().filter(char::is_ascii_digit).collect(),
    };
    let address = ShippingAddress {
        zip_code,
        street: form.street.trim().to_string(),
        number: form.number.trim().to_string(),
        complement: (!complement.is_empty()).then(|| complement.to_string()),
        neighborhood: form.neighborhood.trim().to_string(),
        city: form.city.trim().to_string(),
        state: form.state.trim().to_string(),
    };
    Ok((customer, address, form.payment_method))
}

fn invalid(field: Field, reason: &'static str) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    errors.push(field, Problem::Invalid(reason));
    errors
}

fn check_contact(form: &CheckoutForm, errors: &mut ValidationErrors) {
    require(form, Field::FirstName, errors);
    require(form, Field::LastName, errors);

    if require(form, Field::Email, errors) && Email::parse(&form.email).is_err() {
        errors.push(Field::Email, Problem::Invalid("must be a valid email address"));
    }

    if require(form, Field::Phone, errors) {
        let digits = count_digits(&form.phone);
        if !PHONE_DIGITS.contains(&digits) || !only_digits_and_separators(&form.phone) {
            errors.push(Field::Phone, Problem::Invalid("must have 10 to 13 digits"));
        }
    }
}

fn check_address(form: &CheckoutForm, errors: &mut ValidationErrors) {
    if require(form, Field::ZipCode, errors) && ZipCode::parse(&form.zip_code).is_err() {
        errors.push(Field::ZipCode, Problem::Invalid("must have 8 digits"));
    }
    for field in [
        Field::Street,
        Field::Number,
        Field::Neighborhood,
        Field::City,
        Field::State,
    ] {
        require(form, field, errors);
    }
}

fn check_payment(form: &CheckoutForm, errors: &mut ValidationErrors) {
    if !form.payment_method.requires_card() {
        return;
    }

    if require(form, Field::CardNumber, errors) {
        let digits = count_digits(&form.card_number);
        if !CARD_DIGITS.contains(&digits) || !only_digits_and_separators(&form.card_number) {
            errors.push(Field::CardNumber, Problem::Invalid("must have 13 to 19 digits"));
        }
    }

    require(form, Field::CardName, errors);

    if require(form, Field::CardExpiry, errors) && !is_valid_expiry(form.card_expiry.trim()) {
        errors.push(Field::CardExpiry, Problem::Invalid("must be MM/YY"));
    }

    if require(form, Field::CardCvv, errors) {
        let cvv = form.card_cvv.trim();
        if !CVV_DIGITS.contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            errors.push(Field::CardCvv, Problem::Invalid("must have 3 or 4 digits"));
        }
    }
}

/// Records `Missing` for a blank field. Returns true if the field has a value.
fn require(form: &CheckoutForm, field: Field, errors: &mut ValidationErrors) -> bool {
    if form.get(field).trim().is_empty() {
        errors.push(field, Problem::Missing);
        false
    } else {
        true
    }
}

fn count_digits(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}

/// Digits plus the punctuation people type in phone and card numbers.
fn only_digits_and_separators(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+'))
}

fn is_valid_expiry(value: &str) -> bool {
    let Some((month, year)) = value.split_once('/') else {
        return false;
    };
    let two_digits = |part: &str| part.len() == 2 && part.chars().all(|c| c.is_ascii_digit());
    if !two_digits(month) || !two_digits(year) {
        return false;
    }
    month.parse::<u8>().is_ok_and(|month| (1..=12).contains(&month))
}
