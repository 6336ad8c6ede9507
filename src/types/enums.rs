// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Domain enums: equipment categories, roles and event kinds.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Equipment category.
///
/// Values are only ever built through [`EquipmentType::canonicalize`], so two
/// spellings of the same category ("weapon", "Weapons ") never end up as two
/// ledger keys. Serialization writes the display form; deserialization runs
/// the canonicalizer again.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EquipmentType {
    Weapons,
    Vehicles,
    Ammunition,
    Equipment,
    Supplies,
    /// Free-text category, title-cased.
    Other(String),
    Unknown,
}

impl EquipmentType {
    pub const STANDARD: [EquipmentType; 5] = [
        EquipmentType::Weapons,
        EquipmentType::Vehicles,
        EquipmentType::Ammunition,
        EquipmentType::Equipment,
        EquipmentType::Supplies,
    ];

    pub fn canonicalize(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() || lowered == "unknown" {
            return EquipmentType::Unknown;
        }
        if lowered.starts_with("weapon") {
            EquipmentType::Weapons
        } else if lowered.starts_with("vehicle") {
            EquipmentType::Vehicles
        } else if lowered.starts_with("ammo") || lowered.starts_with("ammun") {
            EquipmentType::Ammunition
        } else if lowered.starts_with("equip") {
            EquipmentType::Equipment
        } else if lowered.starts_with("supp") {
            EquipmentType::Supplies
        } else {
            EquipmentType::Other(title_case(&lowered))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EquipmentType::Weapons => "Weapons",
            EquipmentType::Vehicles => "Vehicles",
            EquipmentType::Ammunition => "Ammunition",
            EquipmentType::Equipment => "Equipment",
            EquipmentType::Supplies => "Supplies",
            EquipmentType::Other(label) => label,
            EquipmentType::Unknown => "Unknown",
        }
    }
}

// Only the ASCII first letter is upper-cased: full Unicode upper-casing can
// expand one char into several and would break idempotence.
fn title_case(lowered: &str) -> String {
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EquipmentType {
    fn from(raw: &str) -> Self {
        EquipmentType::canonicalize(raw)
    }
}

impl Serialize for EquipmentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EquipmentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EquipmentType::canonicalize(&raw))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "Base Commander")]
    BaseCommander,
    #[serde(rename = "Logistics Officer")]
    LogisticsOfficer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::BaseCommander, Role::LogisticsOfficer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::BaseCommander => "Base Commander",
            Role::LogisticsOfficer => "Logistics Officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Purchase,
    Transfer,
    Assignment,
    Expenditure,
    Adjustment,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Purchase => "purchase",
            EventKind::Transfer => "transfer",
            EventKind::Assignment => "assignment",
            EventKind::Expenditure => "expenditure",
            EventKind::Adjustment => "adjustment",
        }
    }

    /// Collection name used in URLs (`/purchases`, `/admin/transfers/replace`).
    pub fn plural(&self) -> &'static str {
        match self {
            EventKind::Purchase => "purchases",
            EventKind::Transfer => "transfers",
            EventKind::Assignment => "assignments",
            EventKind::Expenditure => "expenditures",
            EventKind::Adjustment => "adjustments",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = [
            EventKind::Purchase,
            EventKind::Transfer,
            EventKind::Assignment,
            EventKind::Expenditure,
            EventKind::Adjustment,
        ];
        let wanted = s.trim().to_lowercase();
        kinds
            .into_iter()
            .find(|kind| kind.as_str() == wanted || kind.plural() == wanted)
            .ok_or_else(|| format!("unknown event kind '{}'", s))
    }
}
