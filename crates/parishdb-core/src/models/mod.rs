use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};

pub mod format;
pub mod kind;
pub mod records;

pub use records::{
    Baptism, CivilStatus, Donation, DonationPurpose, Expense, ExpenseCategory, Funeral,
    MassLanguage, MassSchedule, MassType, Marriage, Member, MemberType, Parish, Registration, Sex,
};

use kind::RecordKind;

/// Opaque record identifier, assigned by the store at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Arc<str>);

impl RecordId {
    pub fn generate() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The five location fields that identify a parish. Every record carries
/// them; for non-parish records they name the owning parish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ParishKey {
    #[serde(rename = "parish_name")]
    pub name: String,
    #[serde(rename = "parish_region")]
    pub region: String,
    #[serde(rename = "parish_province")]
    pub province: String,
    #[serde(rename = "parish_municipality")]
    pub municipality: String,
    #[serde(rename = "parish_barangay")]
    pub barangay: String,
}

impl ParishKey {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        province: impl Into<String>,
        municipality: impl Into<String>,
        barangay: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            province: province.into(),
            municipality: municipality.into(),
            barangay: barangay.into(),
        }
    }

    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("parish_name", &self.name),
            ("parish_region", &self.region),
            ("parish_province", &self.province),
            ("parish_municipality", &self.municipality),
            ("parish_barangay", &self.barangay),
        ]
    }

    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(|(_, v)| !v.trim().is_empty())
    }
}

impl Display for ParishKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.name, self.barangay, self.municipality, self.province, self.region
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Staff,
    Priest,
}

impl Role {
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Staff | Role::Priest)
    }

    /// Provenance tag written to `added_by` for records this role submits.
    pub fn provenance(&self) -> &'static str {
        match self {
            Role::Visitor => "Visitor",
            Role::Staff => "Staff",
            Role::Priest => "Priest",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Visitor => "visitor",
            Role::Staff => "staff",
            Role::Priest => "priest",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Pending)
    }
}

impl Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
        })
    }
}

/// Review state shared by registration, baptism, marriage and funeral records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub added_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_reply: Option<String>,
}

impl Appointment {
    pub fn new(status: AppointmentStatus, added_by: impl Into<String>) -> Self {
        Self {
            status,
            added_by: added_by.into(),
            staff_reply: None,
        }
    }
}

/// Record payload, tagged by `record_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "lowercase")]
pub enum RecordBody {
    Parish(Parish),
    Registration(Registration),
    Baptism(Baptism),
    Marriage(Marriage),
    Funeral(Funeral),
    Donation(Donation),
    Member(Member),
    Mass(MassSchedule),
    Expense(Expense),
}

/// A record that has not been stored yet and therefore has no id.
pub type NewRecord = RecordBody;

impl RecordBody {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordBody::Parish(_) => RecordKind::Parish,
            RecordBody::Registration(_) => RecordKind::Registration,
            RecordBody::Baptism(_) => RecordKind::Baptism,
            RecordBody::Marriage(_) => RecordKind::Marriage,
            RecordBody::Funeral(_) => RecordKind::Funeral,
            RecordBody::Donation(_) => RecordKind::Donation,
            RecordBody::Member(_) => RecordKind::Member,
            RecordBody::Mass(_) => RecordKind::Mass,
            RecordBody::Expense(_) => RecordKind::Expense,
        }
    }

    pub fn parish_key(&self) -> &ParishKey {
        match self {
            RecordBody::Parish(r) => &r.key,
            RecordBody::Registration(r) => &r.parish,
            RecordBody::Baptism(r) => &r.parish,
            RecordBody::Marriage(r) => &r.parish,
            RecordBody::Funeral(r) => &r.parish,
            RecordBody::Donation(r) => &r.parish,
            RecordBody::Member(r) => &r.parish,
            RecordBody::Mass(r) => &r.parish,
            RecordBody::Expense(r) => &r.parish,
        }
    }

    pub fn parish_key_mut(&mut self) -> &mut ParishKey {
        match self {
            RecordBody::Parish(r) => &mut r.key,
            RecordBody::Registration(r) => &mut r.parish,
            RecordBody::Baptism(r) => &mut r.parish,
            RecordBody::Marriage(r) => &mut r.parish,
            RecordBody::Funeral(r) => &mut r.parish,
            RecordBody::Donation(r) => &mut r.parish,
            RecordBody::Member(r) => &mut r.parish,
            RecordBody::Mass(r) => &mut r.parish,
            RecordBody::Expense(r) => &mut r.parish,
        }
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        match self {
            RecordBody::Registration(r) => Some(&r.appointment),
            RecordBody::Baptism(r) => Some(&r.appointment),
            RecordBody::Marriage(r) => Some(&r.appointment),
            RecordBody::Funeral(r) => Some(&r.appointment),
            _ => None,
        }
    }

    pub fn appointment_mut(&mut self) -> Option<&mut Appointment> {
        match self {
            RecordBody::Registration(r) => Some(&mut r.appointment),
            RecordBody::Baptism(r) => Some(&mut r.appointment),
            RecordBody::Marriage(r) => Some(&mut r.appointment),
            RecordBody::Funeral(r) => Some(&mut r.appointment),
            _ => None,
        }
    }

    /// Sets the provenance tag on kinds that carry one.
    pub fn set_added_by(&mut self, tag: &str) {
        let slot = match self {
            RecordBody::Parish(_) => return,
            RecordBody::Registration(r) => &mut r.appointment.added_by,
            RecordBody::Baptism(r) => &mut r.appointment.added_by,
            RecordBody::Marriage(r) => &mut r.appointment.added_by,
            RecordBody::Funeral(r) => &mut r.appointment.added_by,
            RecordBody::Donation(r) => &mut r.added_by,
            RecordBody::Member(r) => &mut r.added_by,
            RecordBody::Mass(r) => &mut r.added_by,
            RecordBody::Expense(r) => &mut r.added_by,
        };
        *slot = tag.to_string();
    }

    pub fn as_parish(&self) -> Option<&Parish> {
        match self {
            RecordBody::Parish(p) => Some(p),
            _ => None,
        }
    }

    /// Text value of a named field, as listed in the kind table.
    pub fn text_field(&self, field: &str) -> Option<&str> {
        let value: &str = match (self, field) {
            (RecordBody::Parish(r), "parish_name") => &r.key.name,
            (RecordBody::Parish(r), "parish_region") => &r.key.region,
            (RecordBody::Parish(r), "parish_province") => &r.key.province,
            (RecordBody::Parish(r), "parish_municipality") => &r.key.municipality,
            (RecordBody::Parish(r), "parish_barangay") => &r.key.barangay,
            (RecordBody::Registration(r), "name") => &r.name,
            (RecordBody::Registration(r), "contact_number") => &r.contact_number,
            (RecordBody::Registration(r), "address") => &r.address,
            (RecordBody::Registration(r), "birthplace") => &r.birthplace,
            (RecordBody::Baptism(r), "child_name") => &r.child_name,
            (RecordBody::Baptism(r), "father_name") => &r.father_name,
            (RecordBody::Baptism(r), "mother_name") => &r.mother_name,
            (RecordBody::Baptism(r), "contact_number") => &r.contact_number,
            (RecordBody::Baptism(r), "address") => &r.address,
            (RecordBody::Baptism(r), "birthplace") => &r.birthplace,
            (RecordBody::Marriage(r), "bride_name") => &r.bride_name,
            (RecordBody::Marriage(r), "groom_name") => &r.groom_name,
            (RecordBody::Marriage(r), "contact_number") => &r.contact_number,
            (RecordBody::Funeral(r), "deceased_name") => &r.deceased_name,
            (RecordBody::Funeral(r), "contact_number") => &r.contact_number,
            (RecordBody::Funeral(r), "funeral_place") => &r.funeral_place,
            (RecordBody::Funeral(r), "burial_site") => &r.burial_site,
            (RecordBody::Donation(r), "donor_name") => &r.donor_name,
            (RecordBody::Member(r), "name") => &r.name,
            (RecordBody::Member(r), "contact_number") => &r.contact_number,
            (RecordBody::Member(r), "address") => &r.address,
            (RecordBody::Mass(r), "mass_time") => &r.mass_time,
            (RecordBody::Mass(r), "officiating_priest") => &r.officiating_priest,
            (RecordBody::Expense(r), "expense_description") => &r.expense_description,
            _ => return None,
        };
        Some(value)
    }
}

/// A stored record: store-assigned id plus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub body: RecordBody,
}

impl Record {
    pub fn new(id: RecordId, body: RecordBody) -> Self {
        Self { id, body }
    }

    pub fn kind(&self) -> RecordKind {
        self.body.kind()
    }

    pub fn parish_key(&self) -> &ParishKey {
        self.body.parish_key()
    }

    pub fn is_parish(&self) -> bool {
        matches!(self.body, RecordBody::Parish(_))
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        self.body.appointment()
    }

    pub fn title(&self) -> String {
        (self.kind().spec().title)(&self.body)
    }
}
