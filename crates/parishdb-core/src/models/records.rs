use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Weekday};

use super::{format, Appointment, ParishKey};

pub const DEFAULT_STAFF_CODE: &str = "staff123";
pub const DEFAULT_PRIEST_CODE: &str = "priest456";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parish {
    #[serde(flatten)]
    pub key: ParishKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_access_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priest_access_code: Option<String>,
}

impl Parish {
    pub fn new(key: ParishKey) -> Self {
        Self {
            key,
            staff_access_code: None,
            priest_access_code: None,
        }
    }

    /// Staff code in effect; unset or empty falls back to the default.
    pub fn staff_code(&self) -> &str {
        effective_code(&self.staff_access_code, DEFAULT_STAFF_CODE)
    }

    pub fn priest_code(&self) -> &str {
        effective_code(&self.priest_access_code, DEFAULT_PRIEST_CODE)
    }
}

fn effective_code<'a>(code: &'a Option<String>, default: &'a str) -> &'a str {
    match code.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => default,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(flatten)]
    pub parish: ParishKey,
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(with = "format::date")]
    pub birthday: Date,
    pub birthplace: String,
    #[serde(flatten)]
    pub appointment: Appointment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baptism {
    #[serde(flatten)]
    pub parish: ParishKey,
    pub child_name: String,
    pub father_name: String,
    pub mother_name: String,
    #[serde(with = "format::date")]
    pub birthday: Date,
    pub birthplace: String,
    #[serde(with = "format::date")]
    pub scheduled_date: Date,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officiating_priest: Option<String>,
    #[serde(flatten)]
    pub appointment: Appointment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marriage {
    #[serde(flatten)]
    pub parish: ParishKey,
    pub bride_name: String,
    pub groom_name: String,
    pub bride_parents: String,
    pub groom_parents: String,
    #[serde(with = "format::date")]
    pub bride_birthday: Date,
    #[serde(with = "format::date")]
    pub groom_birthday: Date,
    pub bride_birthplace: String,
    pub groom_birthplace: String,
    #[serde(with = "format::date")]
    pub scheduled_date: Date,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officiating_priest: Option<String>,
    #[serde(flatten)]
    pub appointment: Appointment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funeral {
    #[serde(flatten)]
    pub parish: ParishKey,
    pub deceased_name: String,
    pub age: u32,
    pub sex: Sex,
    #[serde(with = "format::date")]
    pub birthday: Date,
    #[serde(with = "format::date")]
    pub date_of_death: Date,
    pub birthplace: String,
    #[serde(with = "format::date")]
    pub funeral_date: Date,
    pub funeral_time: String,
    pub funeral_place: String,
    pub burial_site: String,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officiating_priest: Option<String>,
    #[serde(flatten)]
    pub appointment: Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationPurpose {
    #[serde(rename = "Church Building")]
    ChurchBuilding,
    Charity,
    #[serde(rename = "Mass Offering")]
    MassOffering,
    #[serde(rename = "General Fund")]
    GeneralFund,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    #[serde(flatten)]
    pub parish: ParishKey,
    pub donor_name: String,
    #[serde(with = "format::date")]
    pub donation_date: Date,
    pub donation_amount: Decimal,
    pub donation_purpose: DonationPurpose,
    #[serde(default)]
    pub added_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CivilStatus {
    Single,
    Married,
    Widowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberType {
    Regular,
    Youth,
    Senior,
    Choir,
    Volunteer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(flatten)]
    pub parish: ParishKey,
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(with = "format::date")]
    pub birthday: Date,
    pub address: String,
    pub civil_status: CivilStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    pub member_type: MemberType,
    #[serde(with = "format::date")]
    pub membership_date: Date,
    #[serde(default)]
    pub added_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassType {
    #[serde(rename = "Regular Mass")]
    Regular,
    #[serde(rename = "Children's Mass")]
    Children,
    #[serde(rename = "Youth Mass")]
    Youth,
    #[serde(rename = "Healing Mass")]
    Healing,
    #[serde(rename = "Special Mass")]
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassLanguage {
    English,
    Filipino,
    Bisaya,
    Ilocano,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassSchedule {
    #[serde(flatten)]
    pub parish: ParishKey,
    #[serde(with = "format::weekday")]
    pub mass_day: Weekday,
    /// `HH:MM`
    pub mass_time: String,
    pub mass_type: MassType,
    pub mass_language: MassLanguage,
    pub officiating_priest: String,
    #[serde(default)]
    pub added_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Utilities,
    Maintenance,
    Supplies,
    Salaries,
    Events,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(flatten)]
    pub parish: ParishKey,
    #[serde(with = "format::date")]
    pub expense_date: Date,
    pub expense_category: ExpenseCategory,
    pub expense_amount: Decimal,
    pub expense_description: String,
    #[serde(default)]
    pub added_by: String,
}
