//! Discovery request payload.

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Input to one discovery run.
///
/// `postcode` and `activity_description` are mandatory. They default to empty
/// when absent from a JSON payload so that [`DiscoveryRequest::validate`] can
/// name the missing field instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    #[serde(default)]
    pub postcode: String,

    #[serde(default)]
    pub activity_description: String,

    #[serde(default)]
    pub anzsic_code: Option<String>,

    #[serde(default)]
    pub business_structure: Option<BusinessStructure>,

    #[serde(default)]
    pub controlled_substances: Option<ControlledSubstances>,
}

impl DiscoveryRequest {
    /// Create a request with the two mandatory fields.
    pub fn new(postcode: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            postcode: postcode.into(),
            activity_description: activity.into(),
            ..Default::default()
        }
    }

    /// Set the ANZSIC code used for the refined query.
    pub fn with_anzsic_code(mut self, code: impl Into<String>) -> Self {
        self.anzsic_code = Some(code.into());
        self
    }

    /// Set the business structure.
    pub fn with_business_structure(mut self, structure: BusinessStructure) -> Self {
        self.business_structure = Some(structure);
        self
    }

    /// Set the controlled substance flags.
    pub fn with_controlled_substances(mut self, substances: ControlledSubstances) -> Self {
        self.controlled_substances = Some(substances);
        self
    }

    /// Check mandatory fields.
    pub fn validate(&self) -> Result<()> {
        if self.postcode.trim().is_empty() {
            return Err(DiscoveryError::Validation { field: "postcode" });
        }
        if self.activity_description.trim().is_empty() {
            return Err(DiscoveryError::Validation {
                field: "activityDescription",
            });
        }
        Ok(())
    }

    /// Trimmed postcode.
    pub fn postcode(&self) -> &str {
        self.postcode.trim()
    }

    /// Trimmed activity description.
    pub fn activity(&self) -> &str {
        self.activity_description.trim()
    }

    /// Trimmed ANZSIC code, if one was given and is not blank.
    pub fn anzsic(&self) -> Option<&str> {
        self.anzsic_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Controlled substance flags, only when the business declared it
    /// handles controlled substances at all.
    pub fn controlled(&self) -> Option<&ControlledSubstances> {
        self.controlled_substances
            .as_ref()
            .filter(|substances| substances.uses_controlled)
    }
}

/// Legal structure of the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessStructure {
    SoleTrader,
    Partnership,
    Company,
    NonProfit,
}

/// Regulated substances the business handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlledSubstances {
    #[serde(default)]
    pub uses_controlled: bool,

    #[serde(default)]
    pub alcohol: Option<AlcoholFlags>,

    #[serde(default)]
    pub medicines: Option<MedicineFlags>,

    #[serde(default)]
    pub chemicals: Option<ChemicalFlags>,
}

impl ControlledSubstances {
    /// Flags with `uses_controlled` set and no categories.
    pub fn declared() -> Self {
        Self {
            uses_controlled: true,
            ..Default::default()
        }
    }

    pub fn with_alcohol(mut self, alcohol: AlcoholFlags) -> Self {
        self.alcohol = Some(alcohol);
        self
    }

    pub fn with_medicines(mut self, medicines: MedicineFlags) -> Self {
        self.medicines = Some(medicines);
        self
    }

    pub fn with_chemicals(mut self, chemicals: ChemicalFlags) -> Self {
        self.chemicals = Some(chemicals);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlcoholFlags {
    #[serde(default)]
    pub serve_on_premise: bool,
    #[serde(default)]
    pub takeaway: bool,
    #[serde(default)]
    pub brew_or_distil: bool,
}

impl AlcoholFlags {
    pub fn any(&self) -> bool {
        self.serve_on_premise || self.takeaway || self.brew_or_distil
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineFlags {
    #[serde(default)]
    pub dispense: bool,
    #[serde(default)]
    pub wholesale: bool,
    #[serde(default)]
    pub store_only: bool,
    /// Poisons schedules handled, e.g. `["S4", "S8"]`
    #[serde(default)]
    pub schedules: Vec<String>,
}

impl MedicineFlags {
    pub fn any(&self) -> bool {
        self.dispense || self.wholesale || self.store_only
    }

    pub fn has_schedules(&self) -> bool {
        self.schedules.iter().any(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemicalFlags {
    #[serde(default)]
    pub manufacture: bool,
    #[serde(default)]
    pub import_export: bool,
    #[serde(default)]
    pub transport: bool,
    #[serde(default)]
    pub store: bool,
}

impl ChemicalFlags {
    pub fn any(&self) -> bool {
        self.manufacture || self.import_export || self.transport || self.store
    }
}
