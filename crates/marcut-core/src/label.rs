//! Entity labels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Kind of sensitive entity a span carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    Email,
    Phone,
    Ssn,
    Card,
    Account,
    Url,
    Ip,
    Name,
    Org,
    Brand,
    Loc,
    Money,
    Number,
    Date,
    Percent,
}

/// Coarse grouping used for overlap priority and boundary snapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelClass {
    /// Structured identifiers (email, phone, SSN, account, card, URL, IP)
    Identifier,
    /// Named entities (person, organization, brand, location)
    Entity,
    /// Quantities (money, number, date, percent)
    Quantity,
}

impl EntityLabel {
    pub const ALL: [EntityLabel; 15] = [
        EntityLabel::Email,
        EntityLabel::Phone,
        EntityLabel::Ssn,
        EntityLabel::Card,
        EntityLabel::Account,
        EntityLabel::Url,
        EntityLabel::Ip,
        EntityLabel::Name,
        EntityLabel::Org,
        EntityLabel::Brand,
        EntityLabel::Loc,
        EntityLabel::Money,
        EntityLabel::Number,
        EntityLabel::Date,
        EntityLabel::Percent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Email => "EMAIL",
            EntityLabel::Phone => "PHONE",
            EntityLabel::Ssn => "SSN",
            EntityLabel::Card => "CARD",
            EntityLabel::Account => "ACCOUNT",
            EntityLabel::Url => "URL",
            EntityLabel::Ip => "IP",
            EntityLabel::Name => "NAME",
            EntityLabel::Org => "ORG",
            EntityLabel::Brand => "BRAND",
            EntityLabel::Loc => "LOC",
            EntityLabel::Money => "MONEY",
            EntityLabel::Number => "NUMBER",
            EntityLabel::Date => "DATE",
            EntityLabel::Percent => "PERCENT",
        }
    }

    pub fn class(&self) -> LabelClass {
        match self {
            EntityLabel::Email
            | EntityLabel::Phone
            | EntityLabel::Ssn
            | EntityLabel::Card
            | EntityLabel::Account
            | EntityLabel::Url
            | EntityLabel::Ip => LabelClass::Identifier,
            EntityLabel::Name | EntityLabel::Org | EntityLabel::Brand | EntityLabel::Loc => {
                LabelClass::Entity
            }
            EntityLabel::Money | EntityLabel::Number | EntityLabel::Date | EntityLabel::Percent => {
                LabelClass::Quantity
            }
        }
    }

    /// Overlap priority. Higher wins.
    pub fn rank(&self) -> u8 {
        match self.class() {
            LabelClass::Identifier => 3,
            LabelClass::Entity => 2,
            LabelClass::Quantity => 1,
        }
    }

    /// Labels that receive fuzzy cluster identifiers rather than exact-text counters
    pub fn is_clustered(&self) -> bool {
        matches!(self, EntityLabel::Name | EntityLabel::Org | EntityLabel::Brand)
    }

    /// Labels whose boundaries snap across digits and phone punctuation
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            EntityLabel::Phone
                | EntityLabel::Ssn
                | EntityLabel::Card
                | EntityLabel::Account
                | EntityLabel::Money
                | EntityLabel::Number
                | EntityLabel::Percent
        )
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityLabel {
    type Err = CoreError;

    /// Parse a provider label, accepting the aliases model providers emit.
    /// Unknown labels are rejected rather than mapped to a fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = match s.trim().to_ascii_uppercase().as_str() {
            "EMAIL" | "E-MAIL" => EntityLabel::Email,
            "PHONE" | "TELEPHONE" | "FAX" => EntityLabel::Phone,
            "SSN" => EntityLabel::Ssn,
            "CARD" | "CREDIT_CARD" => EntityLabel::Card,
            "ACCOUNT" | "IBAN" => EntityLabel::Account,
            "URL" | "URI" => EntityLabel::Url,
            "IP" | "IP_ADDRESS" => EntityLabel::Ip,
            "NAME" | "PERSON" | "HUMAN" | "INDIVIDUAL" => EntityLabel::Name,
            "ORG" | "ORGANIZATION" | "COMPANY" | "INSTITUTION" | "BUSINESS" => EntityLabel::Org,
            "BRAND" | "PRODUCT" | "SERVICE" => EntityLabel::Brand,
            "LOC" | "LOCATION" | "GPE" | "PLACE" | "ADDRESS" => EntityLabel::Loc,
            "MONEY" | "CURRENCY" => EntityLabel::Money,
            "NUMBER" | "QUANTITY" | "COUNT" | "AMOUNT" => EntityLabel::Number,
            "DATE" => EntityLabel::Date,
            "PERCENT" | "PERCENTAGE" => EntityLabel::Percent,
            _ => return Err(CoreError::UnknownLabel(s.to_string())),
        };
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering() {
        assert!(EntityLabel::Email.rank() > EntityLabel::Name.rank());
        assert!(EntityLabel::Loc.rank() > EntityLabel::Date.rank());
        assert_eq!(EntityLabel::Org.rank(), EntityLabel::Brand.rank());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("person".parse::<EntityLabel>().unwrap(), EntityLabel::Name);
        assert_eq!("GPE".parse::<EntityLabel>().unwrap(), EntityLabel::Loc);
        assert_eq!(" Company ".parse::<EntityLabel>().unwrap(), EntityLabel::Org);
        assert!("SECTION".parse::<EntityLabel>().is_err());
    }

    #[test]
    fn test_serde_uses_uppercase() {
        let json = serde_json::to_string(&EntityLabel::Ssn).unwrap();
        assert_eq!(json, "\"SSN\"");
        let parsed: EntityLabel = serde_json::from_str("\"BRAND\"").unwrap();
        assert_eq!(parsed, EntityLabel::Brand);
    }

    #[test]
    fn test_all_round_trips_through_display() {
        for label in EntityLabel::ALL {
            assert_eq!(label.to_string().parse::<EntityLabel>().unwrap(), label);
        }
    }
}
