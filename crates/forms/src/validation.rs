use rust_decimal::Decimal;
use sav_types::{ClaimForm, FormErrors, FormField};

pub const QUANTITY_REQUIRED: &str = "La quantité est requise";
pub const QUANTITY_NOT_POSITIVE: &str = "La quantité doit être supérieure à 0";
pub const UNIT_REQUIRED: &str = "Veuillez sélectionner une unité";
pub const REASON_REQUIRED: &str = "Veuillez sélectionner un motif";
pub const IMAGES_REQUIRED: &str = "Veuillez ajouter au moins une photo du produit abimé";

/// Recompute `form.errors` for every field and report whether the form is valid.
///
/// Rules are independent: all violated fields are reported together.
pub fn validate_form(form: &mut ClaimForm) -> bool {
    let mut errors = FormErrors::default();

    match form.quantity {
        None => errors.set(FormField::Quantity, QUANTITY_REQUIRED),
        Some(quantity) if quantity <= Decimal::ZERO => {
            errors.set(FormField::Quantity, QUANTITY_NOT_POSITIVE)
        }
        Some(_) => {}
    }

    if form.unit.trim().is_empty() {
        errors.set(FormField::Unit, UNIT_REQUIRED);
    }

    match form.reason {
        None => errors.set(FormField::Reason, REASON_REQUIRED),
        Some(reason) if reason.requires_photos() && form.images.is_empty() => {
            errors.set(FormField::Images, IMAGES_REQUIRED)
        }
        Some(_) => {}
    }

    form.errors = errors;
    form.errors.is_empty()
}
