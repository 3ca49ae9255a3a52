// Per-year configuration and reporting-period resolution.
//
// Both are resolved once in `main` and handed to the pipeline as plain
// values; nothing downstream looks them up again.
use crate::error::{ReportError, Result};
use crate::types::MONTHS;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

/// Full month names, in `MONTHS` order.
const MONTH_NAMES: [&str; 12] = [
    "ENERO",
    "FEBRERO",
    "MARZO",
    "ABRIL",
    "MAYO",
    "JUNIO",
    "JULIO",
    "AGOSTO",
    "SEPTIEMBRE",
    "OCTUBRE",
    "NOVIEMBRE",
    "DICIEMBRE",
];

/// Years a filename date may carry.
const PLAUSIBLE_YEARS: RangeInclusive<i32> = 1990..=2100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBundle {
    /// Unit code → display name.
    #[serde(default)]
    pub denominaciones: BTreeMap<String, String>,
    /// Program code → display name.
    #[serde(default)]
    pub programas_nombres: BTreeMap<String, String>,
    /// Whether this year's extract is expected to carry `CONG_` columns.
    #[serde(default = "default_true")]
    pub columnas_congelado: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ConfigBundle {
    fn default() -> Self {
        ConfigBundle {
            denominaciones: BTreeMap::new(),
            programas_nombres: BTreeMap::new(),
            columnas_congelado: true,
        }
    }
}

impl ConfigBundle {
    /// Display name of a unit, or the code itself when unmapped.
    pub fn unit_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.denominaciones.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Display name of a program, or `""` when unmapped.
    pub fn program_name(&self, code: &str) -> &str {
        self.programas_nombres
            .get(code)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Pick the bundle for `year` out of a JSON file keyed by year.
pub fn load_config(path: &Path, year: i32) -> Result<ConfigBundle> {
    let text = std::fs::read_to_string(path)?;
    let mut by_year: BTreeMap<String, ConfigBundle> = serde_json::from_str(&text)?;
    match by_year.remove(&year.to_string()) {
        Some(bundle) => Ok(bundle),
        None => {
            log::warn!(
                "{} has no configuration for {}; using empty lookups",
                path.display(),
                year
            );
            Ok(ConfigBundle::default())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriod {
    pub fecha: NaiveDate,
    /// 1 = January.
    pub mes: u32,
    pub anio: i32,
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// Month of a token that is an abbreviation (`ENE`) or a prefix of at least
/// three letters of a full name (`DIC`, `Diciem`, `diciembre`).
fn month_from_token(token: &str) -> Option<u32> {
    let token = token.to_uppercase();
    if token.chars().count() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .zip(MONTH_NAMES)
        .position(|(abbr, name)| *abbr == token || name.starts_with(&token))
        .map(|i| i as u32 + 1)
}

fn plausible_date(run: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(run, fmt)
        .ok()
        .filter(|d| PLAUSIBLE_YEARS.contains(&d.year()))
}

/// Find the reporting date embedded in an extract filename.
///
/// Tries, in order: an 8-digit `DDMMYYYY` run, the same run as `YYYYMMDD`,
/// then a month name token next to a 4-digit year (month end). Dates outside
/// `PLAUSIBLE_YEARS` are ignored.
pub fn detect_date(filename: &str) -> Option<NaiveDate> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let digit_runs: Vec<&str> = stem
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();
    for run in digit_runs.iter().filter(|r| r.len() == 8) {
        if let Some(d) = plausible_date(run, "%d%m%Y").or_else(|| plausible_date(run, "%Y%m%d")) {
            return Some(d);
        }
    }

    let tokens: Vec<&str> = stem
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect();
    let month = tokens.iter().find_map(|t| month_from_token(t))?;
    let year = digit_runs
        .iter()
        .filter(|r| r.len() == 4)
        .filter_map(|r| r.parse::<i32>().ok())
        .find(|y| PLAUSIBLE_YEARS.contains(y))?;
    last_day_of_month(year, month)
}

/// Resolve the reporting period from explicit overrides and the filename.
pub fn resolve_period(
    filename: &str,
    date: Option<NaiveDate>,
    month: Option<u32>,
    year: Option<i32>,
) -> Result<ReportingPeriod> {
    if let Some(m) = month {
        if !(1..=12).contains(&m) {
            return Err(ReportError::InvalidMonth(m));
        }
    }
    let fecha = match date.or_else(|| detect_date(filename)) {
        Some(d) => d,
        None => {
            let (Some(m), Some(y)) = (month, year) else {
                return Err(ReportError::Period(format!(
                    "no date found in {:?}; pass --date or --month with --year",
                    filename
                )));
            };
            last_day_of_month(y, m)
                .ok_or_else(|| ReportError::Period(format!("invalid year {}", y)))?
        }
    };
    Ok(ReportingPeriod {
        fecha,
        mes: month.unwrap_or_else(|| fecha.month()),
        anio: year.unwrap_or_else(|| fecha.year()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn detects_compact_dates() {
        assert_eq!(detect_date("MAP_30062025.csv"), Some(ymd(2025, 6, 30)));
        assert_eq!(detect_date("map-20250331.csv"), Some(ymd(2025, 3, 31)));
        // 20-11-1231 is a valid calendar date but not a plausible one.
        assert_eq!(detect_date("MAP_20111231.csv"), Some(ymd(2011, 12, 31)));
        assert_eq!(detect_date("MAP_31129999.csv"), None);
    }

    #[test]
    fn detects_month_names_as_month_end() {
        assert_eq!(detect_date("MAP FEB 2024.csv"), Some(ymd(2024, 2, 29)));
        assert_eq!(detect_date("cuadro_diciembre_2025.csv"), Some(ymd(2025, 12, 31)));
        assert_eq!(detect_date("reporte.csv"), None);
        assert_eq!(detect_date("MAP Septiem 2024.csv"), Some(ymd(2024, 9, 30)));
    }

    #[test]
    fn ordinary_words_are_not_months() {
        assert_eq!(detect_date("MAP_DICTAMEN_ENE_2025.csv"), Some(ymd(2025, 1, 31)));
        assert_eq!(detect_date("MARGEN_ABRIL_2025.csv"), Some(ymd(2025, 4, 30)));
        assert_eq!(detect_date("JULIANA_2025.csv"), None);
        assert_eq!(detect_date("MAP ENE 0001 2025.csv"), Some(ymd(2025, 1, 31)));
    }

    #[test]
    fn explicit_date_wins_over_the_filename() {
        let p = resolve_period("MAP_30062025.csv", Some(ymd(2025, 9, 15)), None, None).unwrap();
        assert_eq!(p.fecha, ymd(2025, 9, 15));
        assert_eq!(p.mes, 9);
        assert_eq!(p.anio, 2025);

        let p = resolve_period("extract.csv", Some(ymd(2024, 2, 29)), Some(1), None).unwrap();
        assert_eq!(p.fecha, ymd(2024, 2, 29));
        assert_eq!(p.mes, 1);
        assert_eq!(p.anio, 2024);
    }

    #[test]
    fn overrides_take_precedence() {
        let p = resolve_period("MAP_30062025.csv", None, Some(5), Some(2026)).unwrap();
        assert_eq!(p.fecha, ymd(2025, 6, 30));
        assert_eq!(p.mes, 5);
        assert_eq!(p.anio, 2026);

        let p = resolve_period("extract.csv", None, Some(3), Some(2025)).unwrap();
        assert_eq!(p.fecha, ymd(2025, 3, 31));
        assert_eq!(p.mes, 3);
    }

    #[test]
    fn unresolvable_period_is_an_error() {
        assert!(matches!(
            resolve_period("extract.csv", None, None, Some(2025)),
            Err(ReportError::Period(_))
        ));
        assert!(matches!(
            resolve_period("MAP_30062025.csv", None, Some(13), None),
            Err(ReportError::InvalidMonth(13))
        ));
    }

    #[test]
    fn lookups_degrade_to_defaults() {
        let mut cfg = ConfigBundle::default();
        cfg.denominaciones.insert("101".into(), "Oficina".into());
        cfg.programas_nombres.insert("E001".into(), "Sanidad".into());
        assert_eq!(cfg.unit_name("101"), "Oficina");
        assert_eq!(cfg.unit_name("999"), "999");
        assert_eq!(cfg.program_name("E001"), "Sanidad");
        assert_eq!(cfg.program_name("X"), "");
    }

    #[test]
    fn loads_the_requested_year() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"2025": {{"denominaciones": {{"101": "Oficina"}}, "columnas_congelado": false}}}}"#
        )
        .unwrap();
        let cfg = load_config(f.path(), 2025).unwrap();
        assert_eq!(cfg.unit_name("101"), "Oficina");
        assert!(!cfg.columnas_congelado);

        let missing = load_config(f.path(), 2030).unwrap();
        assert_eq!(missing, ConfigBundle::default());
    }
}
