use chrono::NaiveDate;
use error_common::codes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sex recorded for a person or newborn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M", alias = "male")]
    Male,
    #[serde(rename = "F", alias = "female")]
    Female,
    #[serde(rename = "I", alias = "indeterminate")]
    Indeterminate,
}

impl Sex {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "M" | "H" | "MALE" => Some(Self::Male),
            "F" | "FEMALE" => Some(Self::Female),
            "I" | "INDETERMINATE" => Some(Self::Indeterminate),
            _ => None,
        }
    }
}

/// Where a service was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareSetting {
    Ambulatory,
    Inpatient,
}

impl CareSetting {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" | "ambulatory" | "ambulatorio" | "01" => Some(Self::Ambulatory),
            "h" | "inpatient" | "hospitalario" | "02" => Some(Self::Inpatient),
            _ => None,
        }
    }
}

/// Sex a procedure is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexRestriction {
    MaleOnly,
    FemaleOnly,
    Either,
}

impl SexRestriction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "M" | "H" => Some(Self::MaleOnly),
            "F" => Some(Self::FemaleOnly),
            "Z" | "A" | "" => Some(Self::Either),
            _ => None,
        }
    }

    /// Unknown or indeterminate sex never violates a restriction
    pub fn permits(self, sex: Option<Sex>) -> bool {
        match (self, sex) {
            (Self::MaleOnly, Some(Sex::Female)) | (Self::FemaleOnly, Some(Sex::Male)) => false,
            _ => true,
        }
    }
}

/// Care setting a procedure is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingRestriction {
    AmbulatoryOnly,
    InpatientOnly,
    Either,
}

impl SettingRestriction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::AmbulatoryOnly),
            "H" => Some(Self::InpatientOnly),
            "Z" | "" => Some(Self::Either),
            _ => None,
        }
    }

    pub fn permits(self, setting: Option<CareSetting>) -> bool {
        match (self, setting) {
            (Self::AmbulatoryOnly, Some(CareSetting::Inpatient))
            | (Self::InpatientOnly, Some(CareSetting::Ambulatory)) => false,
            _ => true,
        }
    }
}

/// Procedure catalog entry (also covers consultation codes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureEntry {
    pub code: String,
    pub description: String,
    pub sex_restriction: SexRestriction,
    pub setting_restriction: SettingRestriction,
    pub surgical: bool,
    pub enabled: bool,
}

impl ProcedureEntry {
    /// Check the declared restrictions against what the service recorded.
    ///
    /// # Errors
    ///
    /// Returns the first violated restriction; sex is checked before setting.
    pub fn check_restrictions(
        &self,
        sex: Option<Sex>,
        setting: Option<CareSetting>,
    ) -> Result<(), RestrictionViolation> {
        if !self.sex_restriction.permits(sex) {
            return Err(RestrictionViolation::Sex {
                code: self.code.clone(),
                allowed: self.sex_restriction,
                recorded: sex,
            });
        }
        if !self.setting_restriction.permits(setting) {
            return Err(RestrictionViolation::Setting {
                code: self.code.clone(),
                allowed: self.setting_restriction,
                recorded: setting,
            });
        }
        Ok(())
    }
}

/// Medication catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub code: String,
    pub description: String,
    pub pharmaceutical_form: String,
    pub controlled_substance: bool,
    pub enabled: bool,
}

/// A declared catalog restriction the service does not satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestrictionViolation {
    Sex {
        code: String,
        allowed: SexRestriction,
        recorded: Option<Sex>,
    },
    Setting {
        code: String,
        allowed: SettingRestriction,
        recorded: Option<CareSetting>,
    },
}

impl RestrictionViolation {
    pub fn causal_code(&self) -> &'static str {
        match self {
            Self::Sex { .. } => codes::deduction::SEX_RESTRICTION,
            Self::Setting { .. } => codes::deduction::SETTING_RESTRICTION,
        }
    }
}

impl fmt::Display for RestrictionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sex {
                code,
                allowed,
                recorded,
            } => write!(f, "code {code} is restricted to {allowed:?}, service recorded {recorded:?}"),
            Self::Setting {
                code,
                allowed,
                recorded,
            } => write!(f, "code {code} is restricted to {allowed:?}, service delivered {recorded:?}"),
        }
    }
}

/// Health regime of an affiliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeKind {
    Contributory,
    Subsidized,
}

/// Regime with its regime-specific trailing fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum Regime {
    Contributory {
        contributor_type: String,
        employer_id: Option<String>,
    },
    Subsidized {
        population_group: String,
        sisben_level: Option<String>,
    },
}

impl Regime {
    pub fn kind(&self) -> RegimeKind {
        match self {
            Self::Contributory { .. } => RegimeKind::Contributory,
            Self::Subsidized { .. } => RegimeKind::Subsidized,
        }
    }
}

/// Affiliation status as kept by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffiliationStatus {
    Active,
    SuspendedPending,
    Suspended,
    Retired,
    Deceased,
    Other(String),
}

impl AffiliationStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "AC" | "ACTIVO" | "ACTIVE" => Self::Active,
            "SP" | "SUSPENDIDO_PENDIENTE" | "SUSPENDED_PENDING" => Self::SuspendedPending,
            "SU" | "SUSPENDIDO" | "SUSPENDED" => Self::Suspended,
            "RE" | "RETIRADO" | "RETIRED" => Self::Retired,
            "AF" | "FALLECIDO" | "DECEASED" => Self::Deceased,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only these two statuses may receive covered services
    pub fn permits_coverage(&self) -> bool {
        matches!(self, Self::Active | Self::SuspendedPending)
    }
}

/// One person in the eligibility registry (unified over both regimes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub insurer_code: String,
    pub doc_type: String,
    pub doc_number: String,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub first_name: String,
    pub second_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub department_code: Option<String>,
    pub municipality_code: Option<String>,
    pub status: AffiliationStatus,
    pub effective_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub regime: Regime,
}

/// Outcome of an eligibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EligibilityResult {
    Eligible {
        regime: RegimeKind,
        active_insurer: String,
    },
    Ineligible {
        causal_code: String,
        reason: String,
    },
}

impl EligibilityResult {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    pub(crate) fn ineligible(causal_code: &str, reason: impl Into<String>) -> Self {
        Self::Ineligible {
            causal_code: causal_code.to_string(),
            reason: reason.into(),
        }
    }
}

/// Registry key; document types and numbers compare case- and blank-insensitively
pub fn person_key(doc_type: &str, doc_number: &str) -> String {
    format!(
        "{}:{}",
        doc_type.trim().to_ascii_uppercase(),
        doc_number.trim().to_ascii_uppercase()
    )
}
