use parishdb_core::{ParishKey, Record, RecordBody, RecordId, Role};
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("invalid access code")]
    InvalidCredential,
    #[error("access denied")]
    AccessDenied,
    #[error("record {0} is not a parish")]
    NotAParish(RecordId),
}

/// The parish a session was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParishRef {
    pub id: RecordId,
    pub key: ParishKey,
}

/// Capability token obtained once at login and passed to every call that
/// needs an identity. Visitors carry no home parish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    role: Role,
    home: Option<ParishRef>,
}

impl Session {
    pub fn visitor() -> Self {
        Self {
            role: Role::Visitor,
            home: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn home(&self) -> Option<&ParishRef> {
        self.home.as_ref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::visitor()
    }
}

/// Exchanges a shared access code for a session bound to `parish`. The staff
/// code is tried before the priest code, so a parish that configures the
/// same code for both only ever yields staff sessions.
pub fn login(parish: &Record, code: &str) -> Result<Session, AccessError> {
    let RecordBody::Parish(p) = &parish.body else {
        return Err(AccessError::NotAParish(parish.id.clone()));
    };

    let role = if matches_code(code, p.staff_code()) {
        Role::Staff
    } else if matches_code(code, p.priest_code()) {
        Role::Priest
    } else {
        tracing::warn!(parish = %p.key.name, "Invalid access code presented");
        return Err(AccessError::InvalidCredential);
    };

    tracing::debug!(parish = %p.key.name, %role, "Login succeeded");
    Ok(Session {
        role,
        home: Some(ParishRef {
            id: parish.id.clone(),
            key: p.key.clone(),
        }),
    })
}

fn matches_code(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Staff or priest viewing their own parish. Evaluated on every call.
pub fn has_elevated_access(session: &Session, viewed: &Record) -> bool {
    if !session.role.is_elevated() || !viewed.is_parish() {
        return false;
    }
    session
        .home
        .as_ref()
        .map_or(false, |home| home.id == viewed.id && &home.key == viewed.parish_key())
}

pub fn require_elevated(session: &Session, viewed: &Record) -> Result<(), AccessError> {
    if has_elevated_access(session, viewed) {
        Ok(())
    } else {
        tracing::warn!(role = %session.role, parish = %viewed.parish_key().name, "Mutation denied");
        Err(AccessError::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use parishdb_core::models::Parish;

    use super::*;

    fn parish(id: &str, name: &str, staff: Option<&str>, priest: Option<&str>) -> Record {
        let mut p = Parish::new(ParishKey::new(name, "CAR", "Benguet", "Baguio City", "Session Road"));
        p.staff_access_code = staff.map(str::to_string);
        p.priest_access_code = priest.map(str::to_string);
        Record::new(RecordId::from(id), RecordBody::Parish(p))
    }

    #[test]
    fn defaults_apply_when_codes_are_unset() {
        let p = parish("p1", "Baguio Cathedral", None, None);
        assert_eq!(login(&p, "staff123").unwrap().role(), Role::Staff);
        assert_eq!(login(&p, "priest456").unwrap().role(), Role::Priest);
        assert_eq!(login(&p, "guess").unwrap_err(), AccessError::InvalidCredential);
    }

    #[test]
    fn configured_codes_replace_defaults() {
        let p = parish("p1", "Baguio Cathedral", Some("s-9"), Some("p-9"));
        assert_eq!(login(&p, "staff123").unwrap_err(), AccessError::InvalidCredential);
        assert_eq!(login(&p, "p-9").unwrap().role(), Role::Priest);
    }

    #[test]
    fn staff_wins_when_codes_coincide() {
        let p = parish("p1", "Baguio Cathedral", Some("same"), Some("same"));
        assert_eq!(login(&p, "same").unwrap().role(), Role::Staff);
    }

    #[test]
    fn elevation_is_limited_to_home_parish() {
        let home = parish("p1", "Baguio Cathedral", None, None);
        let other = parish("p2", "St. Joseph", None, None);
        let session = login(&home, "staff123").unwrap();

        assert!(has_elevated_access(&session, &home));
        assert!(!has_elevated_access(&session, &other));
        assert!(!has_elevated_access(&Session::visitor(), &home));
        assert_eq!(require_elevated(&session, &other), Err(AccessError::AccessDenied));
    }
}
