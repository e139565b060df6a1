use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use super::RecordBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Parish,
    Registration,
    Baptism,
    Marriage,
    Funeral,
    Donation,
    Member,
    Mass,
    Expense,
}

/// Per-kind behavior: which fields search and validation look at, and how a
/// record is titled in listings.
pub struct KindSpec {
    pub kind: RecordKind,
    pub label: &'static str,
    pub search_fields: &'static [&'static str],
    pub required_fields: &'static [&'static str],
    /// Visitors may list records of this kind.
    pub public: bool,
    pub title: fn(&RecordBody) -> String,
}

static KIND_TABLE: [KindSpec; 9] = [
    KindSpec {
        kind: RecordKind::Parish,
        label: "Parish",
        search_fields: &[],
        required_fields: &[
            "parish_name",
            "parish_region",
            "parish_province",
            "parish_municipality",
            "parish_barangay",
        ],
        public: true,
        title: parish_title,
    },
    KindSpec {
        kind: RecordKind::Registration,
        label: "Registration",
        search_fields: &["name"],
        required_fields: &["name", "contact_number", "address", "birthplace"],
        public: false,
        title: registration_title,
    },
    KindSpec {
        kind: RecordKind::Baptism,
        label: "Baptism",
        search_fields: &["child_name", "father_name", "mother_name"],
        required_fields: &["child_name", "father_name", "mother_name", "contact_number", "address"],
        public: false,
        title: baptism_title,
    },
    KindSpec {
        kind: RecordKind::Marriage,
        label: "Marriage",
        search_fields: &["bride_name", "groom_name"],
        required_fields: &["bride_name", "groom_name", "contact_number"],
        public: false,
        title: marriage_title,
    },
    KindSpec {
        kind: RecordKind::Funeral,
        label: "Funeral",
        search_fields: &["deceased_name"],
        required_fields: &["deceased_name", "contact_number", "funeral_place", "burial_site"],
        public: false,
        title: funeral_title,
    },
    KindSpec {
        kind: RecordKind::Donation,
        label: "Donation",
        search_fields: &["donor_name"],
        required_fields: &["donor_name"],
        public: false,
        title: donation_title,
    },
    KindSpec {
        kind: RecordKind::Member,
        label: "Member",
        search_fields: &["name"],
        required_fields: &["name", "contact_number", "address"],
        public: false,
        title: member_title,
    },
    KindSpec {
        kind: RecordKind::Mass,
        label: "Mass Schedule",
        search_fields: &["officiating_priest"],
        required_fields: &["mass_time", "officiating_priest"],
        public: true,
        title: mass_title,
    },
    KindSpec {
        kind: RecordKind::Expense,
        label: "Expense",
        search_fields: &["expense_description"],
        required_fields: &["expense_description"],
        public: true,
        title: expense_title,
    },
];

impl RecordKind {
    pub const ALL: [RecordKind; 9] = [
        RecordKind::Parish,
        RecordKind::Registration,
        RecordKind::Baptism,
        RecordKind::Marriage,
        RecordKind::Funeral,
        RecordKind::Donation,
        RecordKind::Member,
        RecordKind::Mass,
        RecordKind::Expense,
    ];

    pub const APPOINTMENTS: [RecordKind; 4] = [
        RecordKind::Registration,
        RecordKind::Baptism,
        RecordKind::Marriage,
        RecordKind::Funeral,
    ];

    pub fn spec(&self) -> &'static KindSpec {
        // table order follows declaration order
        &KIND_TABLE[*self as usize]
    }

    pub fn is_appointment(&self) -> bool {
        Self::APPOINTMENTS.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Parish => "parish",
            RecordKind::Registration => "registration",
            RecordKind::Baptism => "baptism",
            RecordKind::Marriage => "marriage",
            RecordKind::Funeral => "funeral",
            RecordKind::Donation => "donation",
            RecordKind::Member => "member",
            RecordKind::Mass => "mass",
            RecordKind::Expense => "expense",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown record kind: {}", s))
    }
}

fn parish_title(body: &RecordBody) -> String {
    body.parish_key().name.clone()
}

fn registration_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Registration(r) => r.name.clone(),
        _ => String::new(),
    }
}

fn baptism_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Baptism(r) => r.child_name.clone(),
        _ => String::new(),
    }
}

fn marriage_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Marriage(r) => format!("{} & {}", r.bride_name, r.groom_name),
        _ => String::new(),
    }
}

fn funeral_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Funeral(r) => r.deceased_name.clone(),
        _ => String::new(),
    }
}

fn donation_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Donation(r) => format!("₱{:.2} from {}", r.donation_amount, r.donor_name),
        _ => String::new(),
    }
}

fn member_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Member(r) => r.name.clone(),
        _ => String::new(),
    }
}

fn mass_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Mass(r) => format!("{} at {}", r.mass_day, r.mass_time),
        _ => String::new(),
    }
}

fn expense_title(body: &RecordBody) -> String {
    match body {
        RecordBody::Expense(r) => format!("₱{:.2} {}", r.expense_amount, r.expense_description),
        _ => String::new(),
    }
}
