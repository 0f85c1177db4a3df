//! crates/family_tree_core/src/domain.rs
//!
//! Defines the pure, core data structures for the genealogy client.
//! These structs are independent of any wire or storage format; adapters
//! translate to and from them.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Accounts
//=========================================================================================

/// The profile of an account holder, as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The outcome of a successful login: a bearer token for authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds, when the server reports one.
    pub expires_in: Option<i64>,
}

/// The outcome of a successful registration (or API key rotation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user: User,
    pub api_key: String,
}

//=========================================================================================
// Individuals
//=========================================================================================

/// Server-assigned identifier of an individual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndividualId(String);

impl IndividualId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IndividualId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for IndividualId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// GEDCOM sex code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    /// Parses a single-letter GEDCOM code (`M`, `F`, `U`), ignoring case.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "M" => Some(Sex::Male),
            "F" => Some(Sex::Female),
            "U" => Some(Sex::Unknown),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Unknown => "U",
        }
    }
}

/// A single family member, modelled after the GEDCOM `INDI` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Individual {
    pub id: IndividualId,
    pub user_id: Uuid,
    pub gedcom_id: String,
    pub given_names: Option<String>,
    pub surname: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_date: Option<NaiveDate>,
    pub death_place: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Individual {
    /// "Given Surname", skipping whichever part is missing.
    pub fn display_name(&self) -> String {
        [self.given_names.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Case-insensitive substring match against the surname or the given names.
    ///
    /// A record with neither name never matches, not even the empty term.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [self.surname.as_deref(), self.given_names.as_deref()]
            .into_iter()
            .flatten()
            .any(|name| name.to_lowercase().contains(&term))
    }
}

/// A partial set of individual fields, sent on create and update.
///
/// Only fields that are `Some` are transmitted; the server leaves the others as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndividualPatch {
    pub gedcom_id: Option<String>,
    pub given_names: Option<String>,
    pub surname: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_date: Option<NaiveDate>,
    pub death_place: Option<String>,
    pub note: Option<String>,
}

impl IndividualPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
