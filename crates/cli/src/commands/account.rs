//! Account commands.

use vitrine_core::Email;
use vitrine_storefront::account::CustomerProfile;
use vitrine_storefront::error::{clear_sentry_user, set_sentry_user};
use vitrine_storefront::{AppError, Storefront};

/// Sign in as a customer.
///
/// # Errors
///
/// Returns an error if the email is invalid or the profile cannot be saved.
pub async fn login(storefront: &Storefront, email: &str, name: Option<&str>) -> Result<(), AppError> {
    let email = Email::parse(email).map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;
    let profile = CustomerProfile::new(email, name);

    storefront.account().lock().await.sign_in(profile.clone()).await?;
    set_sentry_user(profile.email.as_str());
    tracing::info!("Signed in as {} <{}>", profile.name, profile.email);
    Ok(())
}

/// Sign out.
///
/// # Errors
///
/// Returns an error if the stored profile cannot be removed.
pub async fn logout(storefront: &Storefront) -> Result<(), AppError> {
    storefront.account().lock().await.sign_out().await?;
    clear_sentry_user();
    tracing::info!("Signed out");
    Ok(())
}

/// Show the signed-in customer.
pub async fn show(storefront: &Storefront) {
    match storefront.account().lock().await.current() {
        Some(profile) => tracing::info!("Signed in as {} <{}>", profile.name, profile.email),
        None => tracing::info!("Not signed in"),
    }
}
