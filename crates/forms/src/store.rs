use sav_types::ClaimForm;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::validation::validate_form;

/// Result of validating one line's form from the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemValidation {
    /// Another validation or a submission holds the form
    Busy,

    /// At least one field failed; `missing_images` tells whether photos were the problem
    Invalid { missing_images: bool },

    /// Form passed and is now locked for submission
    Filled,
}

/// A submittable form together with its invoice line index
#[derive(Debug, Clone, Copy)]
pub struct FilledForm<'a> {
    pub index: usize,
    pub form: &'a ClaimForm,
}

/// Owns the claim forms of one claim session, keyed by invoice line index.
///
/// Records are created on first access and kept for the whole session;
/// deleting a form resets it in place.
#[derive(Debug, Default)]
pub struct ClaimFormStore {
    forms: BTreeMap<usize, ClaimForm>,
}

impl ClaimFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form for `index`, created empty on first access
    pub fn get_form(&mut self, index: usize) -> &mut ClaimForm {
        self.forms.entry(index).or_insert_with(|| {
            debug!(index, "creating claim form");
            ClaimForm::new()
        })
    }

    /// Form for `index` if it was ever accessed
    pub fn form(&self, index: usize) -> Option<&ClaimForm> {
        self.forms.get(&index)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// All forms in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ClaimForm)> {
        self.forms.iter().map(|(index, form)| (*index, form))
    }

    pub fn open_form(&mut self, index: usize) {
        self.get_form(index).shown = true;
    }

    /// Open a closed form, or close and reset an open one. Returns whether the form is now shown.
    pub fn toggle_form(&mut self, index: usize) -> bool {
        if self.get_form(index).shown {
            self.delete_form(index);
            false
        } else {
            self.open_form(index);
            true
        }
    }

    /// Mark the form busy. Returns `false` when it already was.
    pub fn begin_loading(&mut self, index: usize) -> bool {
        let form = self.get_form(index);
        if form.loading {
            return false;
        }
        form.loading = true;
        true
    }

    pub fn end_loading(&mut self, index: usize) {
        self.get_form(index).loading = false;
    }

    /// Validate the form of line `index` and lock it when every rule passes.
    ///
    /// A no-op while the form is busy.
    pub fn validate_item(&mut self, index: usize) -> ItemValidation {
        if !self.begin_loading(index) {
            debug!(index, "validation skipped, form busy");
            return ItemValidation::Busy;
        }

        let form = self.get_form(index);
        let outcome = if validate_form(form) {
            form.filled = true;
            form.shown = true;
            info!(index, "claim line recorded");
            ItemValidation::Filled
        } else {
            debug!(index, fields = ?form.errors.invalid_fields(), "claim form invalid");
            ItemValidation::Invalid {
                missing_images: !form.errors.images.is_empty(),
            }
        };

        self.end_loading(index);
        outcome
    }

    /// Re-open a filled form for editing, keeping its values
    pub fn edit_form(&mut self, index: usize) {
        self.get_form(index).filled = false;
    }

    /// Close the form and reset every field
    pub fn delete_form(&mut self, index: usize) {
        self.get_form(index).reset();
    }

    pub fn has_filled_forms(&self) -> bool {
        self.forms.values().any(ClaimForm::is_submittable)
    }

    pub fn has_unfinished_forms(&self) -> bool {
        self.forms.values().any(ClaimForm::is_unfinished)
    }

    /// Shown and filled forms, in index order
    pub fn filled_forms(&self) -> Vec<FilledForm<'_>> {
        self.forms
            .iter()
            .filter(|(_, form)| form.is_submittable())
            .map(|(index, form)| FilledForm {
                index: *index,
                form,
            })
            .collect()
    }

    pub fn filled_indices(&self) -> Vec<usize> {
        self.filled_forms().iter().map(|filled| filled.index).collect()
    }
}
