//! Shop tenant record and per-shop section visibility.
//!
//! # Invariants
//! - Section keys are drawn from the fixed [`ShopSection`] catalog.
//! - A shop without explicit settings shows every section.

use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type ShopId = Uuid;

const SHOP_NAME_MAX_CHARS: usize = 120;

/// UI areas that can be shown or hidden per shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopSection {
    Dashboard,
    Sales,
    Invoices,
    Customers,
    Products,
    Categories,
    Suppliers,
    Grn,
    Payments,
    Reports,
    Staff,
    Settings,
}

impl ShopSection {
    pub const ALL: [ShopSection; 12] = [
        Self::Dashboard,
        Self::Sales,
        Self::Invoices,
        Self::Customers,
        Self::Products,
        Self::Categories,
        Self::Suppliers,
        Self::Grn,
        Self::Payments,
        Self::Reports,
        Self::Staff,
        Self::Settings,
    ];

    /// Stable key used in JSON payloads and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Sales => "sales",
            Self::Invoices => "invoices",
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Suppliers => "suppliers",
            Self::Grn => "grn",
            Self::Payments => "payments",
            Self::Reports => "reports",
            Self::Staff => "staff",
            Self::Settings => "settings",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == value.trim())
    }
}

/// Visibility switch per section; always holds every catalog key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SectionVisibility(BTreeMap<ShopSection, bool>);

impl Default for SectionVisibility {
    fn default() -> Self {
        Self::all_visible()
    }
}

impl SectionVisibility {
    pub fn all_visible() -> Self {
        Self(
            ShopSection::ALL
                .into_iter()
                .map(|section| (section, true))
                .collect(),
        )
    }

    pub fn is_visible(&self, section: ShopSection) -> bool {
        self.0.get(&section).copied().unwrap_or(true)
    }

    pub fn set(&mut self, section: ShopSection, visible: bool) {
        self.0.insert(section, visible);
    }

    /// Sections currently switched on, in catalog order.
    pub fn visible_sections(&self) -> Vec<ShopSection> {
        ShopSection::ALL
            .into_iter()
            .filter(|section| self.is_visible(*section))
            .collect()
    }

    /// Builds a visibility map from a full replacement payload.
    ///
    /// Every catalog key must be present and no unknown key is accepted.
    pub fn from_complete(raw: &BTreeMap<String, bool>) -> Result<Self, ValidationError> {
        let parsed = parse_keys(raw)?;
        let missing = ShopSection::ALL
            .into_iter()
            .filter(|section| !parsed.contains_key(section))
            .map(|section| section.as_str().to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ValidationError::IncompleteSections(missing));
        }
        Ok(Self(parsed))
    }

    /// Merges a partial payload over the current values.
    pub fn apply_patch(&mut self, raw: &BTreeMap<String, bool>) -> Result<(), ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        let parsed = parse_keys(raw)?;
        self.0.extend(parsed);
        Ok(())
    }

    /// Parses the stored JSON form. Missing keys default to visible.
    pub fn from_stored_json(value: &str) -> Result<Self, String> {
        let raw: BTreeMap<String, bool> = serde_json::from_str(value)
            .map_err(|err| format!("invalid sections json: {err}"))?;
        let parsed = parse_keys(&raw).map_err(|err| err.to_string())?;
        let mut visibility = Self::all_visible();
        visibility.0.extend(parsed);
        Ok(visibility)
    }

    pub fn to_stored_json(&self) -> String {
        let raw = self
            .0
            .iter()
            .map(|(section, visible)| (section.as_str(), *visible))
            .collect::<BTreeMap<_, _>>();
        serde_json::to_string(&raw).unwrap_or_else(|_| "{}".to_string())
    }
}

fn parse_keys(raw: &BTreeMap<String, bool>) -> Result<BTreeMap<ShopSection, bool>, ValidationError> {
    raw.iter()
        .map(|(key, visible)| {
            ShopSection::parse(key)
                .map(|section| (section, *visible))
                .ok_or_else(|| ValidationError::UnknownSection(key.clone()))
        })
        .collect()
}

/// Tenant / business unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub sections: SectionVisibility,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Shop {
    /// Creates a shop with a generated id and every section visible.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: ShopId, name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            name: require_text("name", name, SHOP_NAME_MAX_CHARS)?,
            sections: SectionVisibility::all_visible(),
            created_at: 0,
            updated_at: 0,
        })
    }
}
