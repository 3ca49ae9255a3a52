use crate::config::{ConfigBundle, ReportingPeriod};
use crate::enrich::enrich;
use crate::error::Result;
use crate::rollup::{
    rollup_categories, rollup_global, rollup_programs, rollup_units, InclusionPolicy,
};
use crate::types::{
    Category, CategoryRow, Chapter, ChapterRow, Metadata, PartidaRow, ProgramRow, ResultBundle,
    SourceRecord, UnitSummaryRow,
};
use crate::util::{format_currency, format_pct, ratio};
use rust_decimal::Decimal;

/// Run the MAP pipeline: enrich the rows, roll them up and assemble the bundle.
///
/// Any error aborts before assembly; there is no partial result.
pub fn process_map(
    records: &[SourceRecord],
    period: &ReportingPeriod,
    config: &ConfigBundle,
) -> Result<ResultBundle> {
    let rows = enrich(records, period.mes)?;

    let totales = rollup_global(&rows, InclusionPolicy::Unfiltered)?.to_totals();
    let categorias = rollup_categories(&rows)?;
    let programas = rollup_programs(&rows)?;
    let units = rollup_units(&rows, config)?;
    log::info!(
        "{} rows, {} programs, {} units on the dashboard",
        rows.len(),
        programas.len(),
        units.kpis.len()
    );

    Ok(ResultBundle {
        totales,
        categorias,
        programas,
        resultados_por_ur: units.kpis,
        capitulos_por_ur: units.chapters,
        partidas_por_ur: units.partidas,
        metadata: Metadata {
            fecha_archivo: period.fecha,
            mes: period.mes,
            anio: period.anio,
            registros: rows.len(),
            config: config.clone(),
        },
        df_procesado: rows,
    })
}

/// "Resumen General": the four categories that add up to the total.
pub fn category_table(bundle: &ResultBundle) -> Vec<CategoryRow> {
    Category::ADDITIVE
        .iter()
        .filter_map(|&c| bundle.categorias.get(c).map(|t| (c, t)))
        .map(|(c, t)| CategoryRow {
            categoria: c.label().to_string(),
            original: format_currency(t.original),
            mod_anual: format_currency(t.modificado_anual),
            mod_periodo: format_currency(t.modificado_periodo),
            ejercido: format_currency(t.ejercido),
            disponible: format_currency(t.disponible),
            avance: format_pct(t.pct_avance),
        })
        .collect()
}

pub fn program_table(bundle: &ResultBundle) -> Vec<ProgramRow> {
    let config = &bundle.metadata.config;
    bundle
        .programas
        .iter()
        .map(|(code, t)| ProgramRow {
            programa: code.clone(),
            denominacion: config.program_name(code).to_string(),
            original: format_currency(t.original),
            mod_anual: format_currency(t.modificado_anual),
            mod_periodo: format_currency(t.modificado_periodo),
            ejercido: format_currency(t.ejercido),
            avance: format_pct(t.pct_avance),
        })
        .collect()
}

pub fn unit_summary_table(bundle: &ResultBundle) -> Vec<UnitSummaryRow> {
    let config = &bundle.metadata.config;
    bundle
        .resultados_por_ur
        .iter()
        .map(|(ur, k)| UnitSummaryRow {
            ur: ur.clone(),
            denominacion: config.unit_name(ur).to_string(),
            original: format_currency(k.original),
            mod_anual: format_currency(k.modificado_anual),
            mod_periodo: format_currency(k.modificado_periodo),
            ejercido: format_currency(k.ejercido),
            disp_anual: format_currency(k.disponible_anual),
            disp_periodo: format_currency(k.disponible_periodo),
            cong_anual: format_currency(k.congelado_anual),
            cong_periodo: format_currency(k.congelado_periodo),
            avance_anual: format_pct(k.pct_avance_anual),
            avance_periodo: format_pct(k.pct_avance_periodo),
        })
        .collect()
}

/// Chapter table of one unit: a "Total" row over the published chapter
/// figures, then chapters 2000, 3000 and 4000. Empty for an unknown unit.
pub fn chapter_table(bundle: &ResultBundle, ur: &str) -> Vec<ChapterRow> {
    let Some(caps) = bundle.capitulos_por_ur.get(&ur.to_string()) else {
        return Vec::new();
    };
    let (mut o, mut ma) = (Decimal::ZERO, Decimal::ZERO);
    let (mut mp, mut e) = (Decimal::ZERO, Decimal::ZERO);
    let mut rows = Vec::with_capacity(Chapter::ALL.len() + 1);
    for c in Chapter::ALL {
        let t = caps.get(c);
        o = o.saturating_add(t.original);
        ma = ma.saturating_add(t.modificado_anual);
        mp = mp.saturating_add(t.modificado_periodo);
        e = e.saturating_add(t.ejercido);
        rows.push(ChapterRow {
            ur: ur.to_string(),
            capitulo: format!("{}000", c.number()),
            denominacion: c.denomination().to_string(),
            original: format_currency(t.original),
            mod_anual: format_currency(t.modificado_anual),
            mod_periodo: format_currency(t.modificado_periodo),
            ejercido: format_currency(t.ejercido),
            disponible: format_currency(t.disponible_periodo),
            avance: format_pct(t.pct_avance_periodo),
        });
    }
    rows.insert(
        0,
        ChapterRow {
            ur: ur.to_string(),
            capitulo: "Total".to_string(),
            denominacion: String::new(),
            original: format_currency(o),
            mod_anual: format_currency(ma),
            mod_periodo: format_currency(mp),
            ejercido: format_currency(e),
            disponible: format_currency(mp.saturating_sub(e)),
            avance: format_pct(ratio(e, mp)),
        },
    );
    rows
}

pub fn partida_table(bundle: &ResultBundle, ur: &str) -> Vec<PartidaRow> {
    bundle
        .partidas_por_ur
        .get(&ur.to_string())
        .map(|list| {
            list.iter()
                .map(|p| PartidaRow {
                    ur: ur.to_string(),
                    partida: p.partida.clone(),
                    programa: p.programa.clone(),
                    denom_programa: p.denom_programa.clone(),
                    disponible: format_currency(p.disponible),
                    pct_del_total: format_pct(p.pct_del_total),
                })
                .collect()
        })
        .unwrap_or_default()
}
