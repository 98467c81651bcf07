//! Checkout command.
//!
//! Runs the wizard from contact to review in one go and places the order.
//! Contact fields default to the signed-in account. Address fields default to
//! the postal lookup for `--zip`; any flag given explicitly wins.
//!
//! # Usage
//!
//! ```bash
//! vitrine checkout --first-name Ana --last-name Souza --email ana@loja.com.br \
//!     --phone "(11) 98765-4321" --zip 01310-100 --number 1000 \
//!     --payment credit --card-number "4111 1111 1111 1111" --card-name "ANA SOUZA" \
//!     --card-expiry 12/30 --card-cvv 123
//! ```

use clap::Args;
use vitrine_core::PaymentMethod;
use vitrine_storefront::checkout::{CheckoutStep, CheckoutWizard, Field, LookupOutcome, ValidationErrors};
use vitrine_storefront::error::add_breadcrumb;
use vitrine_storefront::{AppError, Storefront};

use super::cart::log_snapshot;
use super::orders::log_order;

/// Everything the checkout form collects.
#[derive(Args, Debug, Clone, Default)]
pub struct CheckoutArgs {
    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Phone number with area code
    #[arg(long)]
    pub phone: Option<String>,

    /// Zip code (CEP), with or without the hyphen
    #[arg(long)]
    pub zip: Option<String>,

    /// Street
    #[arg(long)]
    pub street: Option<String>,

    /// House or building number
    #[arg(long)]
    pub number: Option<String>,

    /// Apartment, block, etc.
    #[arg(long)]
    pub complement: Option<String>,

    /// Neighborhood
    #[arg(long)]
    pub neighborhood: Option<String>,

    /// City
    #[arg(long)]
    pub city: Option<String>,

    /// State (UF), e.g. SP
    #[arg(long)]
    pub state: Option<String>,

    /// Payment method (`credit`, `debit`, `pix`, `boleto`)
    #[arg(long, default_value_t = PaymentMethod::Credit)]
    pub payment: PaymentMethod,

    /// Card number
    #[arg(long)]
    pub card_number: Option<String>,

    /// Name as printed on the card
    #[arg(long)]
    pub card_name: Option<String>,

    /// Card expiry as MM/YY
    #[arg(long)]
    pub card_expiry: Option<String>,

    /// Card security code
    #[arg(long)]
    pub card_cvv: Option<String>,
}

impl CheckoutArgs {
    fn fields_for(&self, step: CheckoutStep) -> Vec<(Field, &str)> {
        let all = [
            (Field::FirstName, &self.first_name),
            (Field::LastName, &self.last_name),
            (Field::Email, &self.email),
            (Field::Phone, &self.phone),
            (Field::Street, &self.street),
            (Field::Number, &self.number),
            (Field::Complement, &self.complement),
            (Field::Neighborhood, &self.neighborhood),
            (Field::City, &self.city),
            (Field::State, &self.state),
            (Field::CardNumber, &self.card_number),
            (Field::CardName, &self.card_name),
            (Field::CardExpiry, &self.card_expiry),
            (Field::CardCvv, &self.card_cvv),
        ];
        all.into_iter()
            .filter(|(field, _)| field.step() == step)
            .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
            .collect()
    }
}

/// Fill in the wizard and submit.
///
/// # Errors
///
/// Returns an error if a step does not validate or the order cannot be placed.
pub async fn run(storefront: &Storefront, args: &CheckoutArgs) -> Result<(), AppError> {
    let wizard = storefront.checkout();
    if storefront.cart().lock().await.is_empty() {
        return Err(AppError::BadRequest("The cart is empty".to_string()));
    }

    if let Some(profile) = storefront.account().lock().await.current() {
        wizard.prefill(profile);
    }

    // Contact
    apply(wizard, args, CheckoutStep::Contact);
    step_forward(wizard)?;

    // Address
    if let Some(zip) = &args.zip {
        match wizard.enter_zip_code(zip).await {
            LookupOutcome::Filled(address) => {
                tracing::info!("Address found: {}, {} - {}/{}", address.street, address.neighborhood, address.city, address.state);
            }
            LookupOutcome::NotFound => tracing::info!("Zip code not found, using the address given"),
            LookupOutcome::Unavailable => tracing::info!("Address lookup unavailable, using the address given"),
            LookupOutcome::Incomplete | LookupOutcome::Superseded | LookupOutcome::Disabled => {}
        }
    }
    apply(wizard, args, CheckoutStep::Address);
    step_forward(wizard)?;

    // Payment
    wizard.set_payment_method(args.payment);
    apply(wizard, args, CheckoutStep::Payment);
    step_forward(wizard)?;

    // Review
    log_snapshot(&wizard.summary().await);
    add_breadcrumb("checkout", "Submitting order", None);
    let order = wizard.submit().await?;

    tracing::info!("Order placed!");
    log_order(&order);
    Ok(())
}

fn apply(wizard: &CheckoutWizard, args: &CheckoutArgs, step: CheckoutStep) {
    for (field, value) in args.fields_for(step) {
        wizard.set(field, value);
    }
}

fn step_forward(wizard: &CheckoutWizard) -> Result<CheckoutStep, AppError> {
    let from = wizard.step();
    wizard.advance().map_err(|errors| {
        log_problems(from, &errors);
        AppError::Validation(errors)
    })
}

fn log_problems(step: CheckoutStep, errors: &ValidationErrors) {
    tracing::warn!("Step {} ({}) has problems:", step.number(), step.label());
    for error in errors.errors() {
        tracing::warn!("  - {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_for_step_only_returns_given_flags() {
        let args = CheckoutArgs {
            first_name: Some("Ana".to_string()),
            email: Some("ana@loja.com.br".to_string()),
            street: Some("Avenida Paulista".to_string()),
            card_cvv: Some("123".to_string()),
            ..Default::default()
        };

        assert_eq!(
            args.fields_for(CheckoutStep::Contact),
            vec![(Field::FirstName, "Ana"), (Field::Email, "ana@loja.com.br")]
        );
        assert_eq!(args.fields_for(CheckoutStep::Address), vec![(Field::Street, "Avenida Paulista")]);
        assert_eq!(args.fields_for(CheckoutStep::Payment), vec![(Field::CardCvv, "123")]);
        assert!(args.fields_for(CheckoutStep::Review).is_empty());
    }
}
