use crate::error::{ReportError, Result};
use crate::types::{EnrichedRecord, SourceRecord};
use rust_decimal::Decimal;

/// Chapter of a line item: the value of its first digit.
pub fn chapter_of(partida: &str, line: u64) -> Result<u8> {
    match partida.trim().chars().next().and_then(|c| c.to_digit(10)) {
        Some(d) => Ok(d as u8),
        None => Err(ReportError::InvalidPartida {
            line,
            value: partida.to_string(),
        }),
    }
}

fn sum(values: &[Decimal], line: u64, measure: &str) -> Result<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| ReportError::Overflow(format!("line {line}: {measure}")))
}

/// Sum of the frozen months, or zero if any of them has no column.
fn sum_frozen(values: &[Option<Decimal>], line: u64, measure: &str) -> Result<Decimal> {
    match values.iter().copied().collect::<Option<Vec<Decimal>>>() {
        Some(months) => sum(&months, line, measure),
        None => Ok(Decimal::ZERO),
    }
}

/// Add annual and period-to-date totals and the chapter to every record.
///
/// `mes` is the reporting month, 1 = January; period-to-date sums cover
/// months `1..=mes`.
pub fn enrich(records: &[SourceRecord], mes: u32) -> Result<Vec<EnrichedRecord>> {
    if !(1..=12).contains(&mes) {
        return Err(ReportError::InvalidMonth(mes));
    }
    let n = mes as usize;
    records
        .iter()
        .map(|r| {
            let line = r.line;
            Ok(EnrichedRecord {
                unidad: r.unidad.clone(),
                programa: r.programa.clone(),
                partida: r.partida.clone(),
                capitulo: chapter_of(&r.partida, line)?,
                original: sum(&r.original, line, "original")?,
                mod_anual: sum(&r.modificado, line, "annual modified")?,
                mod_periodo: sum(&r.modificado[..n], line, "period modified")?,
                ejercido: sum(&r.ejercido, line, "exercised")?,
                cong_anual: sum_frozen(&r.congelado, line, "annual frozen")?,
                cong_periodo: sum_frozen(&r.congelado[..n], line, "period frozen")?,
            })
        })
        .collect()
}
