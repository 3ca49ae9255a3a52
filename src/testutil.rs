// Builders shared by the unit tests.
use crate::types::{EnrichedRecord, Measure, SourceRecord, COL_PARTIDA, COL_PROGRAMA, COL_UNIDAD};
use rust_decimal::Decimal;

/// A MAP extract where every monthly cell of a measure holds the same value.
/// Rows are `(unidad, programa, partida, ori, mod, eje)`.
pub fn csv_text(rows: &[(&str, &str, &str, i64, i64, i64)], with_frozen: bool) -> String {
    let mut measures = Measure::REQUIRED.to_vec();
    if with_frozen {
        measures.push(Measure::Congelado);
    }
    let mut header = vec![
        COL_UNIDAD.to_string(),
        COL_PROGRAMA.to_string(),
        COL_PARTIDA.to_string(),
    ];
    for m in &measures {
        header.extend(m.columns().iter().cloned());
    }
    let mut out = header.join(",");
    out.push('\n');
    for (unidad, programa, partida, ori, modif, eje) in rows {
        let mut cells = vec![unidad.to_string(), programa.to_string(), partida.to_string()];
        for m in &measures {
            let v = match m {
                Measure::Original => *ori,
                Measure::Modificado => *modif,
                Measure::Ejercido => *eje,
                Measure::Congelado => 0,
            };
            cells.extend(std::iter::repeat(v.to_string()).take(12));
        }
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// A source record with every monthly value zero.
pub fn blank_source(unidad: &str, programa: &str, partida: &str) -> SourceRecord {
    SourceRecord {
        line: 2,
        unidad: unidad.to_string(),
        programa: programa.to_string(),
        partida: partida.to_string(),
        original: [Decimal::ZERO; 12],
        modificado: [Decimal::ZERO; 12],
        ejercido: [Decimal::ZERO; 12],
        congelado: [None; 12],
    }
}

/// An already-enriched row; the chapter comes from the first digit of `partida`.
pub fn row(
    unidad: &str,
    programa: &str,
    partida: &str,
    original: Decimal,
    mod_periodo: Decimal,
    ejercido: Decimal,
) -> EnrichedRecord {
    EnrichedRecord {
        unidad: unidad.to_string(),
        programa: programa.to_string(),
        partida: partida.to_string(),
        capitulo: partida.as_bytes()[0] - b'0',
        original,
        mod_anual: original,
        mod_periodo,
        ejercido,
        cong_anual: Decimal::ZERO,
        cong_periodo: Decimal::ZERO,
    }
}
