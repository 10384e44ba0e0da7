//! Distinguished names
//!
//! [`DistinguishedName`] is the six-field identity attached to keys and
//! certificates. [`LdapName`] is a single `key=value` relative name.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity of a certificate subject or issuer
///
/// Every field except `name` (the common name) falls back to
/// [`DistinguishedName::UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistinguishedName {
    country_code: String,
    state: String,
    city: String,
    company: String,
    division: String,
    name: String,
}

impl DistinguishedName {
    pub const UNKNOWN: &'static str = "Unknown";

    /// Create a name with the given common name and every other field unknown
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            country_code: Self::UNKNOWN.to_string(),
            state: Self::UNKNOWN.to_string(),
            city: Self::UNKNOWN.to_string(),
            company: Self::UNKNOWN.to_string(),
            division: Self::UNKNOWN.to_string(),
            name: name.into(),
        }
    }

    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_division(mut self, division: impl Into<String>) -> Self {
        self.division = division.into();
        self
    }

    pub fn set_country_code(&mut self, country_code: impl Into<String>) {
        self.country_code = country_code.into();
    }

    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = state.into();
    }

    pub fn set_city(&mut self, city: impl Into<String>) {
        self.city = city.into();
    }

    pub fn set_company(&mut self, company: impl Into<String>) {
        self.company = company.into();
    }

    pub fn set_division(&mut self, division: impl Into<String>) {
        self.division = division.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn division(&self) -> &str {
        &self.division
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The six components as `key=value` pairs in render order
    pub fn ldap_names(&self) -> [LdapName; 6] {
        [
            LdapName::new("c", &self.country_code),
            LdapName::new("st", &self.state),
            LdapName::new("l", &self.city),
            LdapName::new("o", &self.company),
            LdapName::new("ou", &self.division),
            LdapName::new("cn", &self.name),
        ]
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rdn in self.ldap_names() {
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

/// A single relative name such as `cn=foo.com`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LdapName {
    key: String,
    value: String,
}

impl LdapName {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for LdapName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| Error::Format(format!("Expected key=value, got {s:?}")))?;
        Ok(Self::new(key.trim(), value.trim()))
    }
}

impl fmt::Display for LdapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
