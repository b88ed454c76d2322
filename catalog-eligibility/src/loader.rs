//! Bulk loaders for delimited reference extracts
//!
//! Registry and catalog files are positional, delimiter-separated text. Bad
//! lines never abort a load: they are skipped and reported with their
//! 1-based line number.

use config_engine::{BulkLoadSettings, TextEncoding};
use serde::Serialize;
use tracing::{debug, info};

use crate::dates::parse_date;
use crate::models::{
    AffiliationStatus, EligibilityRecord, MedicationEntry, ProcedureEntry, Regime, RegimeKind,
    SettingRestriction, Sex, SexRestriction,
};

const REGISTRY_BASE_FIELDS: usize = 14;

/// Outcome of one bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

/// Splits raw bytes into decoded, trimmed fields
#[derive(Debug, Clone)]
pub struct DelimitedReader {
    delimiter: char,
    encoding: TextEncoding,
}

impl DelimitedReader {
    pub fn new(delimiter: char, encoding: TextEncoding) -> Self {
        Self { delimiter, encoding }
    }

    pub fn from_settings(settings: &BulkLoadSettings) -> Self {
        Self::new(settings.delimiter_char(), settings.encoding)
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        match self.encoding {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| format!("invalid UTF-8: {e}")),
            // Latin-1 maps every byte to the code point of the same value
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Non-blank lines as `(line number, fields or decode error)`
    pub fn rows<'a>(
        &'a self,
        input: &'a [u8],
    ) -> impl Iterator<Item = (usize, Result<Vec<String>, String>)> + 'a {
        input
            .split(|&b| b == b'\n')
            .enumerate()
            .filter_map(move |(index, raw)| {
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                if raw.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                let row = self.decode(raw).map(|line| {
                    let line = line.trim_start_matches('\u{feff}');
                    line.split(self.delimiter)
                        .map(|field| field.trim().trim_matches('"').trim().to_string())
                        .collect()
                });
                Some((index + 1, row))
            })
    }

    fn load<T>(
        &self,
        input: &[u8],
        what: &str,
        parse: impl Fn(&[String]) -> Result<T, String>,
    ) -> (Vec<T>, LoadReport) {
        let mut items = Vec::new();
        let mut report = LoadReport::default();

        for (line, row) in self.rows(input) {
            match row.and_then(|fields| parse(&fields)) {
                Ok(item) => {
                    items.push(item);
                    report.loaded += 1;
                }
                Err(reason) => {
                    debug!(line, %reason, "Skipping {} line", what);
                    report.skipped.push(SkippedLine { line, reason });
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "Loaded {} extract",
            what
        );
        (items, report)
    }

    /// Registry extract of one regime
    pub fn load_registry(&self, input: &[u8], regime: RegimeKind) -> (Vec<EligibilityRecord>, LoadReport) {
        self.load(input, "eligibility registry", |fields| parse_registry_row(fields, regime))
    }

    pub fn load_procedures(&self, input: &[u8]) -> (Vec<ProcedureEntry>, LoadReport) {
        self.load(input, "procedure catalog", parse_procedure_row)
    }

    pub fn load_medications(&self, input: &[u8]) -> (Vec<MedicationEntry>, LoadReport) {
        self.load(input, "medication catalog", parse_medication_row)
    }
}

fn field(fields: &[String], index: usize) -> &str {
    fields.get(index).map_or("", String::as_str)
}

fn required<'a>(fields: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
    let value = field(fields, index);
    if value.is_empty() {
        Err(format!("missing {name}"))
    } else {
        Ok(value)
    }
}

fn optional(fields: &[String], index: usize) -> Option<String> {
    let value = field(fields, index);
    (!value.is_empty()).then(|| value.to_string())
}

fn flag(fields: &[String], index: usize, name: &str) -> Result<bool, String> {
    match field(fields, index).to_ascii_uppercase().as_str() {
        "S" | "SI" | "Y" | "1" | "TRUE" => Ok(true),
        "N" | "NO" | "0" | "FALSE" => Ok(false),
        other => Err(format!("invalid {name} flag '{other}'")),
    }
}

fn parse_registry_row(fields: &[String], regime: RegimeKind) -> Result<EligibilityRecord, String> {
    if fields.len() < REGISTRY_BASE_FIELDS {
        return Err(format!(
            "expected at least {REGISTRY_BASE_FIELDS} fields, found {}",
            fields.len()
        ));
    }

    let effective_raw = required(fields, 12, "effective date")?;
    let effective_date =
        parse_date(effective_raw).ok_or_else(|| format!("invalid effective date '{effective_raw}'"))?;
    let termination_date = match optional(fields, 13) {
        Some(raw) => Some(parse_date(&raw).ok_or_else(|| format!("invalid termination date '{raw}'"))?),
        None => None,
    };

    let regime = match regime {
        RegimeKind::Contributory => Regime::Contributory {
            contributor_type: optional(fields, 14).unwrap_or_else(|| "C".to_string()),
            employer_id: optional(fields, 15),
        },
        RegimeKind::Subsidized => Regime::Subsidized {
            population_group: optional(fields, 14).unwrap_or_default(),
            sisben_level: optional(fields, 15),
        },
    };

    Ok(EligibilityRecord {
        insurer_code: required(fields, 0, "insurer code")?.to_string(),
        doc_type: required(fields, 1, "document type")?.to_ascii_uppercase(),
        doc_number: required(fields, 2, "document number")?.to_string(),
        first_surname: required(fields, 3, "first surname")?.to_string(),
        second_surname: optional(fields, 4),
        first_name: required(fields, 5, "first name")?.to_string(),
        second_name: optional(fields, 6),
        birth_date: parse_date(field(fields, 7)),
        sex: Sex::parse(field(fields, 8)),
        department_code: optional(fields, 9),
        municipality_code: optional(fields, 10),
        status: AffiliationStatus::parse(required(fields, 11, "affiliation status")?),
        effective_date,
        termination_date,
        regime,
    })
}

fn parse_procedure_row(fields: &[String]) -> Result<ProcedureEntry, String> {
    let sex_raw = field(fields, 2);
    let setting_raw = field(fields, 3);
    Ok(ProcedureEntry {
        code: required(fields, 0, "code")?.to_string(),
        description: field(fields, 1).to_string(),
        sex_restriction: SexRestriction::parse(sex_raw)
            .ok_or_else(|| format!("invalid sex restriction '{sex_raw}'"))?,
        setting_restriction: SettingRestriction::parse(setting_raw)
            .ok_or_else(|| format!("invalid setting restriction '{setting_raw}'"))?,
        surgical: flag(fields, 4, "surgical")?,
        enabled: flag(fields, 5, "enabled")?,
    })
}

fn parse_medication_row(fields: &[String]) -> Result<MedicationEntry, String> {
    Ok(MedicationEntry {
        code: required(fields, 0, "code")?.to_string(),
        description: field(fields, 1).to_string(),
        pharmaceutical_form: field(fields, 2).to_string(),
        controlled_substance: flag(fields, 3, "controlled")?,
        enabled: flag(fields, 4, "enabled")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_registry_load_skips_header_and_bad_lines() {
        let input = b"EPS,TIPO,NUMERO,APELLIDO1,APELLIDO2,NOMBRE1,NOMBRE2,NACIMIENTO,SEXO,DPTO,MPIO,ESTADO,AFILIACION,RETIRO\n\
EPS001,CC,1032456789,Gomez,,Ana,Maria,1985-06-01,F,11,001,AC,2020-01-01,,C,900123456\r\n\
\n\
EPS001,CC,52000111,Perez,Diaz,Luis,,01/02/1970,M,05,001,RE,2015-03-01,2022-12-31\n\
EPS001,TI,short,line\n";

        let reader = DelimitedReader::new(',', TextEncoding::Utf8);
        let (records, report) = reader.load_registry(input, RegimeKind::Contributory);

        assert_eq!(records.len(), 2);
        assert_eq!(report.loaded, 2);
        let skipped_lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(skipped_lines, vec![1, 5]);

        let ana = &records[0];
        assert_eq!(ana.effective_date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(ana.termination_date, None);
        assert_eq!(
            ana.regime,
            Regime::Contributory {
                contributor_type: "C".to_string(),
                employer_id: Some("900123456".to_string()),
            }
        );
        assert_eq!(records[1].status, AffiliationStatus::Retired);
        assert_eq!(
            records[1].termination_date,
            NaiveDate::from_ymd_opt(2022, 12, 31)
        );
    }

    #[test]
    fn test_pipe_delimited_subsidized_latin1() {
        // "Muñoz" in Latin-1
        let mut input = b"EPS002|CC|7000001|Mu".to_vec();
        input.push(0xF1);
        input.extend_from_slice(b"oz||Rosa||1990-01-01|F|76|001|AC|2019-05-01||4|A1\n");

        let reader = DelimitedReader::new('|', TextEncoding::Latin1);
        let (records, report) = reader.load_registry(&input, RegimeKind::Subsidized);

        assert!(report.skipped.is_empty());
        assert_eq!(records[0].first_surname, "Muñoz");
        assert_eq!(
            records[0].regime,
            Regime::Subsidized {
                population_group: "4".to_string(),
                sisben_level: Some("A1".to_string()),
            }
        );
    }

    #[test]
    fn test_invalid_utf8_is_a_line_skip() {
        let mut input = b"890201,Consulta general,Z,Z,N,S\n".to_vec();
        input.extend_from_slice(&[0xFF, 0xFE, b',', b'x', b'\n']);

        let reader = DelimitedReader::new(',', TextEncoding::Utf8);
        let (entries, report) = reader.load_procedures(&input);

        assert_eq!(entries.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("UTF-8"));
    }

    #[test]
    fn test_procedure_and_medication_rows() {
        let reader = DelimitedReader::new(',', TextEncoding::Utf8);

        let (procedures, report) =
            reader.load_procedures(b"735301,\"Cesarea segmentaria\",F,H,S,S\n890201,Consulta,Z,A,N,N\n");
        assert!(report.skipped.is_empty());
        assert_eq!(procedures[0].sex_restriction, SexRestriction::FemaleOnly);
        assert_eq!(procedures[0].setting_restriction, SettingRestriction::InpatientOnly);
        assert_eq!(procedures[0].description, "Cesarea segmentaria");
        assert!(!procedures[1].enabled);

        let (medications, report) = reader.load_medications(b"19943544-1,Morfina 10mg,Solucion inyectable,S,S\nBAD,,,maybe,S\n");
        assert_eq!(medications.len(), 1);
        assert!(medications[0].controlled_substance);
        assert_eq!(report.skipped.len(), 1);
    }
}
