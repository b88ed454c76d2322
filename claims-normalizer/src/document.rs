//! Wire shapes of the claim-batch document.
//!
//! Keys are the English names with the upstream electronic-claim names as
//! aliases. Numeric fields are kept as raw JSON values so a number or a
//! numeric string both parse; conversion to typed records happens in
//! [`crate::normalizer`], where a failure becomes a record-level skip.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawRoot {
    #[serde(default, alias = "numDocumentoIdObligado")]
    pub obligated_party_id: Option<String>,
    #[serde(default, alias = "numFactura")]
    pub invoice_number: Option<String>,
    #[serde(default, alias = "tipoNota")]
    pub note_type: Option<String>,
    #[serde(default, alias = "numNota")]
    pub note_number: Option<String>,
    #[serde(default, alias = "usuarios")]
    pub persons: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPerson {
    #[serde(default, alias = "tipoDocumentoIdentificacion")]
    pub document_type: Option<String>,
    #[serde(default, alias = "numDocumentoIdentificacion")]
    pub document_number: Option<String>,
    #[serde(default, alias = "tipoUsuario")]
    pub user_type: Option<String>,
    #[serde(default, alias = "fechaNacimiento")]
    pub birth_date: Option<String>,
    #[serde(default, alias = "codSexo")]
    pub sex: Option<String>,
    #[serde(default, alias = "codPaisResidencia")]
    pub residence_country: Option<String>,
    #[serde(default, alias = "codMunicipioResidencia")]
    pub residence_municipality: Option<String>,
    #[serde(default, alias = "codZonaTerritorialResidencia")]
    pub residence_zone: Option<String>,
}

/// Fields every service variant shares
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCommon {
    #[serde(default, alias = "codPrestador")]
    pub provider_id: Option<String>,
    #[serde(default, alias = "vrServicio")]
    pub billed_amount: Option<Value>,
    #[serde(default, alias = "codDiagnosticoPrincipal")]
    pub principal_diagnosis: Option<String>,
    #[serde(default)]
    pub related_diagnoses: Option<Vec<String>>,
    #[serde(default, rename = "codDiagnosticoRelacionado1")]
    pub related_diagnosis_1: Option<String>,
    #[serde(default, rename = "codDiagnosticoRelacionado2")]
    pub related_diagnosis_2: Option<String>,
    #[serde(default, rename = "codDiagnosticoRelacionado3")]
    pub related_diagnosis_3: Option<String>,
    #[serde(default, alias = "numDocumentoIdentificacion")]
    pub professional_id: Option<String>,
    #[serde(default, alias = "consecutivo")]
    pub consecutive: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawConsultation {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaInicioAtencion")]
    pub service_date: Option<String>,
    #[serde(default, alias = "codConsulta")]
    pub consultation_code: Option<String>,
    #[serde(default, alias = "finalidadTecnologiaSalud")]
    pub purpose: Option<String>,
    #[serde(default, alias = "modalidadGrupoServicioTecSal")]
    pub modality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProcedure {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaInicioAtencion")]
    pub service_date: Option<String>,
    #[serde(default, alias = "codProcedimiento")]
    pub procedure_code: Option<String>,
    #[serde(default, alias = "ambitoRealizacion")]
    pub care_setting: Option<String>,
    #[serde(default, alias = "numAutorizacion")]
    pub authorization_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMedication {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaDispensAdmon")]
    pub service_date: Option<String>,
    #[serde(default, alias = "codTecnologiaSalud")]
    pub drug_code: Option<String>,
    #[serde(default, alias = "nomTecnologiaSalud")]
    pub drug_name: Option<String>,
    #[serde(default, alias = "cantidadMedicamento")]
    pub quantity: Option<Value>,
    #[serde(default, alias = "vrUnitMedicamento")]
    pub unit_value: Option<Value>,
    #[serde(default, alias = "diasTratamiento")]
    pub treatment_days: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawEmergencyVisit {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaInicioAtencion")]
    pub service_date: Option<String>,
    #[serde(default, alias = "fechaEgreso")]
    pub discharge_date: Option<String>,
    #[serde(default, alias = "condicionDestinoUsuarioEgreso")]
    pub discharge_condition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawHospitalization {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaInicioAtencion")]
    pub admission_date: Option<String>,
    #[serde(default, alias = "fechaEgreso")]
    pub discharge_date: Option<String>,
    #[serde(default, alias = "viaIngresoServicioSalud")]
    pub entry_route: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAncillaryService {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaSuministroTecnologia")]
    pub service_date: Option<String>,
    #[serde(default, alias = "codTecnologiaSalud")]
    pub technology_code: Option<String>,
    #[serde(default, alias = "nomTecnologiaSalud")]
    pub technology_name: Option<String>,
    #[serde(default, alias = "tipoOS")]
    pub service_type: Option<String>,
    #[serde(default, alias = "cantidadOS")]
    pub quantity: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawNewbornCare {
    #[serde(flatten)]
    pub common: RawCommon,
    #[serde(default, alias = "fechaNacimiento")]
    pub birth_date: Option<String>,
    #[serde(default, alias = "edadGestacional")]
    pub gestational_age_weeks: Option<Value>,
    #[serde(default, alias = "codSexoBiologico")]
    pub sex: Option<String>,
    #[serde(default, alias = "peso")]
    pub weight_grams: Option<Value>,
    #[serde(default, alias = "fechaEgreso")]
    pub discharge_date: Option<String>,
}
