use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::errors::ClientError;
use crate::models::{CustomerInfo, User};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Minimum phone length accepted at checkout.
pub const MIN_PHONE_LENGTH: usize = 10;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Checkout inputs a validation failure can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    City,
    PostalCode,
    OrderNotes,
    PaymentMethod,
    Terms,
}

impl FormField {
    /// Fields that must be non-blank, in the order they are checked.
    pub const REQUIRED: [FormField; 7] = [
        FormField::FirstName,
        FormField::LastName,
        FormField::Email,
        FormField::Phone,
        FormField::Address,
        FormField::City,
        FormField::PostalCode,
    ];

    /// Lower-case wording used in notices.
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::PostalCode => "postal code",
            Self::OrderNotes => "order notes",
            Self::PaymentMethod => "payment method",
            Self::Terms => "terms and conditions",
        }
    }
}

/// Contact and shipping part of the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub order_notes: String,
    pub terms_accepted: bool,
}

impl CheckoutForm {
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Email => &self.email,
            FormField::Phone => &self.phone,
            FormField::Address => &self.address,
            FormField::City => &self.city,
            FormField::PostalCode => &self.postal_code,
            FormField::OrderNotes => &self.order_notes,
            FormField::PaymentMethod | FormField::Terms => "",
        }
    }

    /// Sets a text field. Payment method and terms have their own setters.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::FirstName => self.first_name = value,
            FormField::LastName => self.last_name = value,
            FormField::Email => self.email = value,
            FormField::Phone => self.phone = value,
            FormField::Address => self.address = value,
            FormField::City => self.city = value,
            FormField::PostalCode => self.postal_code = value,
            FormField::OrderNotes => self.order_notes = value,
            FormField::PaymentMethod | FormField::Terms => {}
        }
    }

    /// Fills email and names from the profile, leaving typed values alone.
    pub fn prefill_from(&mut self, user: &User) {
        if self.email.is_empty() {
            self.email = user.email.clone().unwrap_or_default();
        }

        let (first, last) = user.name_parts();
        if let (true, Some(first)) = (self.first_name.is_empty(), first) {
            self.first_name = first;
        }
        if let (true, Some(last)) = (self.last_name.is_empty(), last) {
            self.last_name = last;
        }
    }

    /// First failing check, in the order the shopper is told about them.
    pub fn validate(&self) -> Result<(), ClientError> {
        for field in FormField::REQUIRED {
            if self.value(field).trim().is_empty() {
                return Err(ClientError::validation(
                    field,
                    format!("Please fill in {}", field.label()),
                ));
            }
        }

        if !is_valid_email(&self.email) {
            return Err(ClientError::validation(
                FormField::Email,
                "Please enter a valid email address",
            ));
        }

        if self.phone.chars().count() < MIN_PHONE_LENGTH {
            return Err(ClientError::validation(
                FormField::Phone,
                "Please enter a valid phone number",
            ));
        }

        if !self.terms_accepted {
            return Err(ClientError::validation(
                FormField::Terms,
                "Please accept the terms and conditions",
            ));
        }

        Ok(())
    }

    /// `"<address>, <city> <postal code>"`
    pub fn shipping_address(&self) -> String {
        format!("{}, {} {}", self.address, self.city, self.postal_code)
    }

    pub fn customer_info(&self) -> CustomerInfo {
        CustomerInfo {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}
