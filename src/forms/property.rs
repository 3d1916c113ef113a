use serde::Serialize;

use super::coerce::{non_empty_opt, optional_decimal, optional_integer, parse_date, to_decimal, to_integer};
use super::wizard::{StepValidator, Wizard, WizardStep};
use super::{FieldValue, FormModel};
use crate::error::FieldErrors;
use crate::routes::Route;
use crate::schemas::Property;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyStep {
    General,
    Address,
    Financial,
    Amenities,
    Review,
}

impl WizardStep for PropertyStep {
    const ORDER: &'static [Self] = &[
        PropertyStep::General,
        PropertyStep::Address,
        PropertyStep::Financial,
        PropertyStep::Amenities,
        PropertyStep::Review,
    ];

    fn title(self) -> &'static str {
        match self {
            Self::General => "General information",
            Self::Address => "Address",
            Self::Financial => "Financial and tax details",
            Self::Amenities => "Amenities",
            Self::Review => "Review",
        }
    }
}

macro_rules! property_fields {
    ($($variant:ident => $key:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PropertyField {
            $($variant,)+
        }

        impl PropertyField {
            pub const ALL: &'static [PropertyField] = &[$(PropertyField::$variant,)+];

            /// Wire name of the field in the backend payload.
            pub fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                let key = key.trim();
                Self::ALL.iter().copied().find(|field| field.key() == key)
            }
        }
    };
}

property_fields! {
    Name => "name",
    PropertyType => "propertyType",
    Reference => "reference",
    Description => "description",
    Surface => "surface",
    Rooms => "rooms",
    Bedrooms => "bedrooms",
    Bathrooms => "bathrooms",
    Floor => "floor",
    ConstructionYear => "constructionYear",
    Furnished => "furnished",
    EnergyClass => "energyClass",
    GesClass => "gesClass",
    Address => "address",
    AddressComplement => "addressComplement",
    Building => "building",
    DoorNumber => "doorNumber",
    City => "city",
    PostalCode => "postalCode",
    Country => "country",
    RentAmount => "rentAmount",
    ChargesAmount => "chargesAmount",
    DepositAmount => "depositAmount",
    AcquisitionPrice => "acquisitionPrice",
    AcquisitionDate => "acquisitionDate",
    AcquisitionFees => "acquisitionFees",
    AgencyFees => "agencyFees",
    PropertyTax => "propertyTax",
    HousingTax => "housingTax",
    InsuranceAmount => "insuranceAmount",
    ManagementFees => "managementFees",
    TaxRegime => "taxRegime",
    CadastralReference => "cadastralReference",
    HeatingType => "heatingType",
    WaterHeatingType => "waterHeatingType",
    HasParking => "hasParking",
    HasCellar => "hasCellar",
    HasBalcony => "hasBalcony",
    HasElevator => "hasElevator",
    HasGarden => "hasGarden",
    Amenities => "amenities",
    Annexes => "annexes",
}

/// Raw staging record behind the property creation wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFormData {
    pub name: String,
    pub property_type: String,
    pub reference: String,
    pub description: String,
    pub surface: String,
    pub rooms: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub floor: String,
    pub construction_year: String,
    pub furnished: bool,
    pub energy_class: String,
    pub ges_class: String,
    pub address: String,
    pub address_complement: String,
    pub building: String,
    pub door_number: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub rent_amount: String,
    pub charges_amount: String,
    pub deposit_amount: String,
    pub acquisition_price: String,
    pub acquisition_date: String,
    pub acquisition_fees: String,
    pub agency_fees: String,
    pub property_tax: String,
    pub housing_tax: String,
    pub insurance_amount: String,
    pub management_fees: String,
    pub tax_regime: String,
    pub cadastral_reference: String,
    pub heating_type: String,
    pub water_heating_type: String,
    pub has_parking: bool,
    pub has_cellar: bool,
    pub has_balcony: bool,
    pub has_elevator: bool,
    pub has_garden: bool,
    pub amenities: Vec<String>,
    pub annexes: Vec<String>,
}

/// Coerced body of `POST /properties`. `None` fields are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPayload {
    pub name: String,
    pub property_type: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub surface: String,
    pub rooms: i64,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub furnished: bool,
    pub has_parking: bool,
    pub has_cellar: bool,
    pub has_balcony: bool,
    pub has_elevator: bool,
    pub has_garden: bool,
    pub amenities: Vec<String>,
    pub annexes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ges_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub door_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charges_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_tax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing_tax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_fees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_regime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadastral_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heating_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_heating_type: Option<String>,
}

impl FormModel for PropertyFormData {
    type Field = PropertyField;
    type Payload = PropertyPayload;
    type Created = Property;

    const ENDPOINT: &'static str = "/properties";
    const SUCCESS_ROUTE: Route = Route::Properties;

    fn set(&mut self, field: PropertyField, value: FieldValue) {
        use PropertyField as F;
        match field {
            F::Furnished => self.furnished = value.into_flag(),
            F::HasParking => self.has_parking = value.into_flag(),
            F::HasCellar => self.has_cellar = value.into_flag(),
            F::HasBalcony => self.has_balcony = value.into_flag(),
            F::HasElevator => self.has_elevator = value.into_flag(),
            F::HasGarden => self.has_garden = value.into_flag(),
            F::Amenities => self.amenities = value.into_list(),
            F::Annexes => self.annexes = value.into_list(),
            text_field => {
                if let Some(slot) = self.text_slot(text_field) {
                    *slot = value.into_text();
                }
            }
        }
    }

    fn to_payload(&self) -> Result<PropertyPayload, FieldErrors> {
        Wizard::<PropertyStep>::validate_all(self).into_result()?;

        let text = |value: &str| non_empty_opt(Some(value));
        let decimal = |value: &str| optional_decimal(Some(value));
        let integer = |value: &str| optional_integer(Some(value));

        Ok(PropertyPayload {
            name: self.name.trim().to_string(),
            property_type: self.property_type.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            surface: to_decimal(Some(&self.surface)),
            rooms: to_integer(Some(&self.rooms)),
            bedrooms: to_integer(Some(&self.bedrooms)),
            bathrooms: to_integer(Some(&self.bathrooms)),
            furnished: self.furnished,
            has_parking: self.has_parking,
            has_cellar: self.has_cellar,
            has_balcony: self.has_balcony,
            has_elevator: self.has_elevator,
            has_garden: self.has_garden,
            amenities: self.amenities.clone(),
            annexes: self.annexes.clone(),
            reference: text(&self.reference),
            description: text(&self.description),
            floor: integer(&self.floor),
            construction_year: integer(&self.construction_year),
            energy_class: text(&self.energy_class).map(|value| value.to_ascii_uppercase()),
            ges_class: text(&self.ges_class).map(|value| value.to_ascii_uppercase()),
            address_complement: text(&self.address_complement),
            building: text(&self.building),
            door_number: text(&self.door_number),
            country: text(&self.country),
            rent_amount: decimal(&self.rent_amount),
            charges_amount: decimal(&self.charges_amount),
            deposit_amount: decimal(&self.deposit_amount),
            acquisition_price: decimal(&self.acquisition_price),
            acquisition_date: text(&self.acquisition_date),
            acquisition_fees: decimal(&self.acquisition_fees),
            agency_fees: decimal(&self.agency_fees),
            property_tax: decimal(&self.property_tax),
            housing_tax: decimal(&self.housing_tax),
            insurance_amount: decimal(&self.insurance_amount),
            management_fees: decimal(&self.management_fees),
            tax_regime: text(&self.tax_regime),
            cadastral_reference: text(&self.cadastral_reference),
            heating_type: text(&self.heating_type),
            water_heating_type: text(&self.water_heating_type),
        })
    }
}

impl StepValidator<PropertyStep> for PropertyFormData {
    fn validate_step(&self, step: PropertyStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            PropertyStep::General => {
                errors.require(PropertyField::Name.key(), &self.name);
                errors.require(PropertyField::PropertyType.key(), &self.property_type);
            }
            PropertyStep::Address => {
                errors.require(PropertyField::Address.key(), &self.address);
                errors.require(PropertyField::City.key(), &self.city);
                errors.require(PropertyField::PostalCode.key(), &self.postal_code);
            }
            PropertyStep::Financial => {
                let date = self.acquisition_date.trim();
                if !date.is_empty() && parse_date(date).is_none() {
                    errors.add(
                        PropertyField::AcquisitionDate.key(),
                        "Acquisition date must be a valid date (YYYY-MM-DD).",
                    );
                }
            }
            PropertyStep::Amenities | PropertyStep::Review => {}
        }
        errors
    }
}

impl PropertyFormData {
    /// Storage for fields held as raw text, `None` for flags and lists.
    fn text_slot(&mut self, field: PropertyField) -> Option<&mut String> {
        use PropertyField as F;
        let slot = match field {
            F::Name => &mut self.name,
            F::PropertyType => &mut self.property_type,
            F::Reference => &mut self.reference,
            F::Description => &mut self.description,
            F::Surface => &mut self.surface,
            F::Rooms => &mut self.rooms,
            F::Bedrooms => &mut self.bedrooms,
            F::Bathrooms => &mut self.bathrooms,
            F::Floor => &mut self.floor,
            F::ConstructionYear => &mut self.construction_year,
            F::EnergyClass => &mut self.energy_class,
            F::GesClass => &mut self.ges_class,
            F::Address => &mut self.address,
            F::AddressComplement => &mut self.address_complement,
            F::Building => &mut self.building,
            F::DoorNumber => &mut self.door_number,
            F::City => &mut self.city,
            F::PostalCode => &mut self.postal_code,
            F::Country => &mut self.country,
            F::RentAmount => &mut self.rent_amount,
            F::ChargesAmount => &mut self.charges_amount,
            F::DepositAmount => &mut self.deposit_amount,
            F::AcquisitionPrice => &mut self.acquisition_price,
            F::AcquisitionDate => &mut self.acquisition_date,
            F::AcquisitionFees => &mut self.acquisition_fees,
            F::AgencyFees => &mut self.agency_fees,
            F::PropertyTax => &mut self.property_tax,
            F::HousingTax => &mut self.housing_tax,
            F::InsuranceAmount => &mut self.insurance_amount,
            F::ManagementFees => &mut self.management_fees,
            F::TaxRegime => &mut self.tax_regime,
            F::CadastralReference => &mut self.cadastral_reference,
            F::HeatingType => &mut self.heating_type,
            F::WaterHeatingType => &mut self.water_heating_type,
            F::Furnished
            | F::HasParking
            | F::HasCellar
            | F::HasBalcony
            | F::HasElevator
            | F::HasGarden
            | F::Amenities
            | F::Annexes => return None,
        };
        Some(slot)
    }
}
