use serde::Serialize;

use super::coerce::{non_empty_opt, optional_decimal, optional_integer, parse_date, to_decimal, to_integer};
use super::wizard::{StepValidator, Wizard, WizardStep};
use super::{FieldValue, FormModel};
use crate::error::FieldErrors;
use crate::routes::Route;
use crate::schemas::Rental;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalStep {
    Parties,
    Terms,
    Charges,
    Review,
}

impl WizardStep for RentalStep {
    const ORDER: &'static [Self] = &[
        RentalStep::Parties,
        RentalStep::Terms,
        RentalStep::Charges,
        RentalStep::Review,
    ];

    fn title(self) -> &'static str {
        match self {
            Self::Parties => "Property and tenant",
            Self::Terms => "Lease terms",
            Self::Charges => "Rent and charges",
            Self::Review => "Review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RentalField {
    PropertyId,
    TenantId,
    RentalType,
    StartDate,
    EndDate,
    DurationMonths,
    PaymentDay,
    PaymentFrequency,
    RentAmount,
    ChargesAmount,
    DepositAmount,
    IndexationReference,
    IndexationDate,
    GuarantorName,
    GuarantorEmail,
    GuarantorPhone,
    InventoryDate,
    KeysCount,
    SpecialConditions,
    Notes,
    CreatePaymentSchedule,
}

impl RentalField {
    pub const ALL: &'static [RentalField] = &[
        RentalField::PropertyId,
        RentalField::TenantId,
        RentalField::RentalType,
        RentalField::StartDate,
        RentalField::EndDate,
        RentalField::DurationMonths,
        RentalField::PaymentDay,
        RentalField::PaymentFrequency,
        RentalField::RentAmount,
        RentalField::ChargesAmount,
        RentalField::DepositAmount,
        RentalField::IndexationReference,
        RentalField::IndexationDate,
        RentalField::GuarantorName,
        RentalField::GuarantorEmail,
        RentalField::GuarantorPhone,
        RentalField::InventoryDate,
        RentalField::KeysCount,
        RentalField::SpecialConditions,
        RentalField::Notes,
        RentalField::CreatePaymentSchedule,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::PropertyId => "propertyId",
            Self::TenantId => "tenantId",
            Self::RentalType => "rentalType",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::DurationMonths => "durationMonths",
            Self::PaymentDay => "paymentDay",
            Self::PaymentFrequency => "paymentFrequency",
            Self::RentAmount => "rentAmount",
            Self::ChargesAmount => "chargesAmount",
            Self::DepositAmount => "depositAmount",
            Self::IndexationReference => "indexationReference",
            Self::IndexationDate => "indexationDate",
            Self::GuarantorName => "guarantorName",
            Self::GuarantorEmail => "guarantorEmail",
            Self::GuarantorPhone => "guarantorPhone",
            Self::InventoryDate => "inventoryDate",
            Self::KeysCount => "keysCount",
            Self::SpecialConditions => "specialConditions",
            Self::Notes => "notes",
            Self::CreatePaymentSchedule => "createPaymentSchedule",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL.iter().copied().find(|field| field.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalFormData {
    pub property_id: String,
    pub tenant_id: String,
    pub rental_type: String,
    pub start_date: String,
    pub end_date: String,
    pub duration_months: String,
    pub payment_day: String,
    pub payment_frequency: String,
    pub rent_amount: String,
    pub charges_amount: String,
    pub deposit_amount: String,
    pub indexation_reference: String,
    pub indexation_date: String,
    pub guarantor_name: String,
    pub guarantor_email: String,
    pub guarantor_phone: String,
    pub inventory_date: String,
    pub keys_count: String,
    pub special_conditions: String,
    pub notes: String,
    pub create_payment_schedule: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalPayload {
    pub property_id: String,
    pub tenant_id: String,
    pub start_date: String,
    pub rent_amount: String,
    pub charges_amount: String,
    pub deposit_amount: String,
    pub payment_day: i64,
    pub create_payment_schedule: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexation_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantor_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantor_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FormModel for RentalFormData {
    type Field = RentalField;
    type Payload = RentalPayload;
    type Created = Rental;

    const ENDPOINT: &'static str = "/rentals";
    const SUCCESS_ROUTE: Route = Route::Rentals;

    fn set(&mut self, field: RentalField, value: FieldValue) {
        use RentalField as F;
        let slot = match field {
            F::CreatePaymentSchedule => {
                self.create_payment_schedule = value.into_flag();
                return;
            }
            F::PropertyId => &mut self.property_id,
            F::TenantId => &mut self.tenant_id,
            F::RentalType => &mut self.rental_type,
            F::StartDate => &mut self.start_date,
            F::EndDate => &mut self.end_date,
            F::DurationMonths => &mut self.duration_months,
            F::PaymentDay => &mut self.payment_day,
            F::PaymentFrequency => &mut self.payment_frequency,
            F::RentAmount => &mut self.rent_amount,
            F::ChargesAmount => &mut self.charges_amount,
            F::DepositAmount => &mut self.deposit_amount,
            F::IndexationReference => &mut self.indexation_reference,
            F::IndexationDate => &mut self.indexation_date,
            F::GuarantorName => &mut self.guarantor_name,
            F::GuarantorEmail => &mut self.guarantor_email,
            F::GuarantorPhone => &mut self.guarantor_phone,
            F::InventoryDate => &mut self.inventory_date,
            F::KeysCount => &mut self.keys_count,
            F::SpecialConditions => &mut self.special_conditions,
            F::Notes => &mut self.notes,
        };
        *slot = value.into_text();
    }

    fn to_payload(&self) -> Result<RentalPayload, FieldErrors> {
        Wizard::<RentalStep>::validate_all(self).into_result()?;

        let text = |value: &str| non_empty_opt(Some(value));
        Ok(RentalPayload {
            property_id: self.property_id.trim().to_string(),
            tenant_id: self.tenant_id.trim().to_string(),
            start_date: self.start_date.trim().to_string(),
            rent_amount: to_decimal(Some(&self.rent_amount)),
            charges_amount: to_decimal(Some(&self.charges_amount)),
            deposit_amount: to_decimal(Some(&self.deposit_amount)),
            payment_day: match to_integer(Some(&self.payment_day)) {
                0 => 1,
                day => day,
            },
            create_payment_schedule: self.create_payment_schedule,
            rental_type: text(&self.rental_type).map(|value| value.to_ascii_uppercase()),
            end_date: text(&self.end_date),
            duration_months: optional_integer(Some(&self.duration_months)),
            payment_frequency: text(&self.payment_frequency).map(|value| value.to_ascii_uppercase()),
            indexation_reference: text(&self.indexation_reference),
            indexation_date: text(&self.indexation_date),
            guarantor_name: text(&self.guarantor_name),
            guarantor_email: text(&self.guarantor_email),
            guarantor_phone: text(&self.guarantor_phone),
            inventory_date: text(&self.inventory_date),
            keys_count: optional_integer(Some(&self.keys_count)),
            special_conditions: text(&self.special_conditions),
            notes: text(&self.notes),
        })
    }
}

impl StepValidator<RentalStep> for RentalFormData {
    fn validate_step(&self, step: RentalStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            RentalStep::Parties => {
                errors.require(RentalField::PropertyId.key(), &self.property_id);
                errors.require(RentalField::TenantId.key(), &self.tenant_id);
            }
            RentalStep::Terms => {
                let start = self.start_date.trim();
                if start.is_empty() {
                    errors.add(RentalField::StartDate.key(), "Start date is required.");
                } else if parse_date(start).is_none() {
                    errors.add(
                        RentalField::StartDate.key(),
                        "Start date must be a valid date (YYYY-MM-DD).",
                    );
                }
                check_optional_date(&mut errors, RentalField::EndDate, &self.end_date);
                check_optional_date(&mut errors, RentalField::IndexationDate, &self.indexation_date);
                check_optional_date(&mut errors, RentalField::InventoryDate, &self.inventory_date);
                if let (Some(start), Some(end)) = (parse_date(start), parse_date(&self.end_date)) {
                    if end < start {
                        errors.add(RentalField::EndDate.key(), "End date must be after start date.");
                    }
                }
                let day = to_integer(Some(&self.payment_day));
                if !self.payment_day.trim().is_empty() && !(1..=31).contains(&day) {
                    errors.add(
                        RentalField::PaymentDay.key(),
                        "Payment day must be between 1 and 31.",
                    );
                }
            }
            RentalStep::Charges => {
                if optional_decimal(Some(&self.rent_amount)).is_none() {
                    errors.add(RentalField::RentAmount.key(), "Rent amount is required.");
                }
            }
            RentalStep::Review => {}
        }
        errors
    }
}

fn check_optional_date(errors: &mut FieldErrors, field: RentalField, raw: &str) {
    if !raw.trim().is_empty() && parse_date(raw).is_none() {
        errors.add(field.key(), "Must be a valid date (YYYY-MM-DD).");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{RentalField, RentalFormData, RentalStep};
    use crate::forms::{FieldValue, FormModel, StepValidator};

    fn filled() -> RentalFormData {
        let mut data = RentalFormData::default();
        data.set(RentalField::PropertyId, FieldValue::text("prop-1"));
        data.set(RentalField::TenantId, FieldValue::text("ten-1"));
        data.set(RentalField::StartDate, FieldValue::text("2026-11-01"));
        data.set(RentalField::RentAmount, FieldValue::text("850,5"));
        data
    }

    #[test]
    fn builds_payload_with_defaults() {
        let json = serde_json::to_value(filled().to_payload().expect("valid")).expect("json");
        assert_eq!(
            json,
            json!({
                "propertyId": "prop-1",
                "tenantId": "ten-1",
                "startDate": "2026-11-01",
                "rentAmount": "850.50",
                "chargesAmount": "0.00",
                "depositAmount": "0.00",
                "paymentDay": 1,
                "createPaymentSchedule": false
            })
        );
    }

    #[test]
    fn keeps_filled_optionals() {
        let mut data = filled();
        data.set(RentalField::EndDate, FieldValue::text("2029-10-31"));
        data.set(RentalField::KeysCount, FieldValue::text("3"));
        data.set(RentalField::RentalType, FieldValue::text("furnished"));
        data.set(RentalField::CreatePaymentSchedule, FieldValue::Flag(true));
        let payload = data.to_payload().expect("valid");
        assert_eq!(payload.end_date.as_deref(), Some("2029-10-31"));
        assert_eq!(payload.keys_count, Some(3));
        assert_eq!(payload.rental_type.as_deref(), Some("FURNISHED"));
        assert!(payload.create_payment_schedule);
    }

    #[test]
    fn rejects_inverted_dates_and_bad_payment_day() {
        let mut data = filled();
        data.set(RentalField::EndDate, FieldValue::text("2026-01-01"));
        data.set(RentalField::PaymentDay, FieldValue::text("40"));
        let errors = data.validate_step(RentalStep::Terms);
        assert!(errors.contains("endDate"));
        assert!(errors.contains("paymentDay"));
    }

    #[test]
    fn rent_is_required_on_charges_step() {
        let mut data = filled();
        data.set(RentalField::RentAmount, FieldValue::text(""));
        assert!(data
            .validate_step(RentalStep::Charges)
            .contains("rentAmount"));
    }

    #[test]
    fn field_keys_round_trip() {
        for field in RentalField::ALL {
            assert_eq!(RentalField::from_key(field.key()), Some(*field));
        }
    }
}
