//! Profile records and the pure map operations over them.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stored attributes describing one user.
///
/// Absent optional fields are omitted from the serialized record. A `null`
/// written by older front-ends deserializes to `None` as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name
    pub name: String,
    /// Course and year, if the user is a student
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    /// Business name, if the user runs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<String>,
    /// Free-form interests
    #[serde(default)]
    pub interests: String,
}

impl Profile {
    /// Create a profile with only the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, interests: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interests: interests.into(),
            ..Default::default()
        }
    }

    /// Set the education field
    #[must_use]
    pub fn with_education(mut self, education: impl Into<String>) -> Self {
        self.education = Some(education.into());
        self
    }

    /// Set the business field
    #[must_use]
    pub fn with_business(mut self, business: impl Into<String>) -> Self {
        self.business = Some(business.into());
        self
    }

    /// Current value of a field, `None` when an optional field is unset.
    #[must_use]
    pub fn field(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Name => Some(self.name.as_str()),
            ProfileField::Education => self.education.as_deref(),
            ProfileField::Business => self.business.as_deref(),
            ProfileField::Interests => Some(self.interests.as_str()),
        }
    }

    /// Return the profile with one field replaced.
    ///
    /// The store has no field-level patch; callers upsert the whole result.
    #[must_use]
    pub fn with_field(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            ProfileField::Name => self.name = value,
            ProfileField::Education => self.education = Some(value),
            ProfileField::Business => self.business = Some(value),
            ProfileField::Interests => self.interests = value,
        }
        self
    }
}

/// Editable profile fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    /// `name`
    Name,
    /// `education`
    Education,
    /// `business`
    Business,
    /// `interests`
    Interests,
}

impl ProfileField {
    /// All fields in display order
    pub const ALL: [ProfileField; 4] = [
        ProfileField::Name,
        ProfileField::Education,
        ProfileField::Business,
        ProfileField::Interests,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Education => "education",
            Self::Business => "business",
            Self::Interests => "interests",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "education" => Ok(Self::Education),
            "business" => Ok(Self::Business),
            "interests" => Ok(Self::Interests),
            other => Err(StoreError::UnknownField(other.to_string())),
        }
    }
}

/// Username → profile. Sorted so the serialized document is canonical.
pub type ProfileMap = BTreeMap<String, Profile>;

/// Look up a user's profile.
#[must_use]
pub fn get_profile<'a>(map: &'a ProfileMap, username: &str) -> Option<&'a Profile> {
    map.get(username)
}

/// Insert or fully replace the profile for `username`.
///
/// Usernames are matched exactly; no case or whitespace normalization.
pub fn upsert_profile(
    mut map: ProfileMap,
    username: impl Into<String>,
    profile: Profile,
) -> Result<ProfileMap> {
    let username = username.into();
    if username.is_empty() {
        return Err(StoreError::InvalidUsername);
    }
    map.insert(username, profile);
    Ok(map)
}

/// Remove a user's profile. Absent usernames are a no-op.
#[must_use]
pub fn delete_profile(mut map: ProfileMap, username: &str) -> ProfileMap {
    map.remove(username);
    map
}
