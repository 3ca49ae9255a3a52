use crate::config::ConfigBundle;
use crate::error::{ReportError, Result};
use crate::types::{Measure, Monthly, SourceRecord, COL_PARTIDA, COL_PROGRAMA, COL_UNIDAD};
use crate::util::{decode_text, normalize_code, normalize_partida, parse_amount};
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// How many of the twelve `CONG_` columns were found.
    pub frozen_columns: usize,
}

/// Column positions of a MAP extract, resolved from its header row.
struct Layout {
    unidad: usize,
    programa: usize,
    partida: usize,
    original: [usize; 12],
    modificado: [usize; 12],
    ejercido: [usize; 12],
    congelado: [Option<usize>; 12],
}

impl Layout {
    fn from_headers(headers: &StringRecord, read_frozen: bool) -> Result<Layout> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim(), i))
            .collect();

        let mut missing: Vec<String> = Vec::new();
        let mut require = |name: &str| -> usize {
            match index.get(name) {
                Some(i) => *i,
                None => {
                    missing.push(name.to_string());
                    0
                }
            }
        };
        let unidad = require(COL_UNIDAD);
        let programa = require(COL_PROGRAMA);
        let partida = require(COL_PARTIDA);
        let [original, modificado, ejercido] =
            Measure::REQUIRED.map(|m| m.columns().each_ref().map(|c| require(c.as_str())));

        if !missing.is_empty() {
            return Err(ReportError::Schema { missing });
        }

        let congelado = if read_frozen {
            Measure::Congelado
                .columns()
                .each_ref()
                .map(|c| index.get(c.as_str()).copied())
        } else {
            [None; 12]
        };

        Ok(Layout {
            unidad,
            programa,
            partida,
            original,
            modificado,
            ejercido,
            congelado,
        })
    }

    fn frozen_columns(&self) -> usize {
        self.congelado.iter().filter(|c| c.is_some()).count()
    }

    fn parse(&self, headers: &StringRecord, rec: &StringRecord, line: u64) -> Result<SourceRecord> {
        let cell = |i: usize| rec.get(i).unwrap_or("");
        let amount = |i: usize| -> Result<Decimal> {
            parse_amount(cell(i)).ok_or_else(|| ReportError::InvalidNumber {
                line,
                column: headers.get(i).unwrap_or("").trim().to_string(),
                value: cell(i).to_string(),
            })
        };
        let monthly = |cols: &[usize; 12]| -> Result<Monthly> {
            let mut out = [Decimal::ZERO; 12];
            for (slot, &i) in out.iter_mut().zip(cols) {
                *slot = amount(i)?;
            }
            Ok(out)
        };

        let mut congelado = [None; 12];
        for (slot, col) in congelado.iter_mut().zip(&self.congelado) {
            if let Some(i) = col {
                *slot = Some(amount(*i)?);
            }
        }

        Ok(SourceRecord {
            line,
            unidad: normalize_code(cell(self.unidad)),
            programa: normalize_code(cell(self.programa)),
            partida: normalize_partida(cell(self.partida)),
            original: monthly(&self.original)?,
            modificado: monthly(&self.modificado)?,
            ejercido: monthly(&self.ejercido)?,
            congelado,
        })
    }
}

/// Parse an in-memory MAP extract.
///
/// Fails on the first missing mandatory column set or malformed amount; a
/// partially read table is never returned.
pub fn read_records(text: &str, config: &ConfigBundle) -> Result<(Vec<SourceRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();
    let layout = Layout::from_headers(&headers, config.columnas_congelado)?;

    let frozen_columns = layout.frozen_columns();
    if config.columnas_congelado && frozen_columns < 12 {
        log::warn!(
            "{} of 12 CONG_ columns present; missing frozen amounts count as zero",
            frozen_columns
        );
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        let line = rec.position().map(|p| p.line()).unwrap_or(0);
        records.push(layout.parse(&headers, &rec, line)?);
    }

    let report = LoadReport {
        total_rows: records.len(),
        frozen_columns,
    };
    log::info!(
        "read {} rows ({} frozen columns)",
        report.total_rows,
        report.frozen_columns
    );
    Ok((records, report))
}

pub fn load_records(path: &Path, config: &ConfigBundle) -> Result<(Vec<SourceRecord>, LoadReport)> {
    let bytes = std::fs::read(path)?;
    read_records(&decode_text(bytes), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::csv_text;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn reads_required_and_frozen_columns() {
        let text = csv_text(&[("101", "E001", "21101", 100, 80, 50)], true);
        let (records, report) = read_records(&text, &ConfigBundle::default()).unwrap();
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.frozen_columns, 12);
        let r = &records[0];
        assert_eq!(r.unidad, "101");
        assert_eq!(r.partida, "21101");
        assert_eq!(r.original[0], dec!(100));
        assert_eq!(r.modificado[11], dec!(80));
        assert_eq!(r.ejercido[5], dec!(50));
        assert_eq!(r.congelado[3], Some(Decimal::ZERO));
        assert_eq!(r.line, 2);
    }

    #[test]
    fn frozen_columns_are_optional() {
        let text = csv_text(&[("101", "E001", "21101", 1, 1, 1)], false);
        let (records, report) = read_records(&text, &ConfigBundle::default()).unwrap();
        assert_eq!(report.frozen_columns, 0);
        assert!(records[0].congelado.iter().all(Option::is_none));
    }

    #[test]
    fn frozen_columns_are_ignored_when_not_expected() {
        let text = csv_text(&[("101", "E001", "21101", 1, 1, 1)], true);
        let cfg = ConfigBundle {
            columnas_congelado: false,
            ..ConfigBundle::default()
        };
        let (records, report) = read_records(&text, &cfg).unwrap();
        assert_eq!(report.frozen_columns, 0);
        assert!(records[0].congelado.iter().all(Option::is_none));
    }

    #[test]
    fn missing_mandatory_columns_are_all_reported() {
        let text = "UNIDAD,PARTIDA,ORI_ENE\n101,21101,5\n";
        let err = read_records(text, &ConfigBundle::default()).unwrap_err();
        let ReportError::Schema { missing } = &err else {
            panic!("expected a schema error, got {err:?}");
        };
        assert!(missing.contains(&"PROGRAMA".to_string()));
        assert!(missing.contains(&"ORI_FEB".to_string()));
        assert!(missing.contains(&"EJE_DIC".to_string()));
        assert!(!missing.contains(&"ORI_ENE".to_string()));
        assert!(!missing.iter().any(|c| c.starts_with("CONG_")));
    }

    #[test]
    fn non_numeric_amounts_abort() {
        let text = csv_text(&[("101", "E001", "21101", 1, 1, 1)], false)
            .replacen(",1,", ",uno,", 1);
        let err = read_records(&text, &ConfigBundle::default()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::InvalidNumber { line: 2, ref column, ref value }
                if column == "ORI_ENE" && value == "uno"
        ));
    }

    #[test]
    fn codes_are_trimmed() {
        let text = csv_text(&[(" 101 ", " E001", "21101.0", 1, 1, 1)], false);
        let (records, _) = read_records(&text, &ConfigBundle::default()).unwrap();
        assert_eq!(records[0].unidad, "101");
        assert_eq!(records[0].programa, "E001");
        assert_eq!(records[0].partida, "21101");
    }

    #[test]
    fn loads_latin1_files() {
        let text = csv_text(&[("101", "PROGRAMA_X", "21101", 1, 1, 1)], false)
            .replace("PROGRAMA_X", "Año");
        let bytes: Vec<u8> = text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap())
            .collect();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        let (records, _) = load_records(f.path(), &ConfigBundle::default()).unwrap();
        assert_eq!(records[0].programa, "Año");
    }
}
