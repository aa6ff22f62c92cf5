//! Metal type of a stock item, ledger entry or price.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use karatbook_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Material {
    #[default]
    Gold,
    Silver,
}

impl Material {
    pub const ALL: [Material; 2] = [Material::Gold, Material::Silver];

    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Gold => "Gold",
            Material::Silver => "Silver",
        }
    }

    /// Lowercase key used in price endpoints (`/prices/gold`).
    pub fn key(&self) -> &'static str {
        match self {
            Material::Gold => "gold",
            Material::Silver => "silver",
        }
    }
}

impl core::fmt::Display for Material {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Material {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(Material::Gold),
            "silver" => Ok(Material::Silver),
            other => Err(DomainError::validation(format!(
                "material must be gold or silver, got '{other}'"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Material {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Material selector of a list view; `All` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialFilter {
    #[default]
    All,
    Only(Material),
}

impl MaterialFilter {
    pub fn matches(&self, material: Material) -> bool {
        match self {
            MaterialFilter::All => true,
            MaterialFilter::Only(m) => *m == material,
        }
    }
}

impl From<Material> for MaterialFilter {
    fn from(value: Material) -> Self {
        MaterialFilter::Only(value)
    }
}

impl FromStr for MaterialFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(MaterialFilter::All);
        }
        trimmed.parse().map(MaterialFilter::Only)
    }
}
