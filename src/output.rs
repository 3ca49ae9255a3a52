use crate::error::Result;
use crate::reports::{
    category_table, chapter_table, partida_table, program_table, unit_summary_table,
};
use crate::types::ResultBundle;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub const RESUMEN_FILE: &str = "resumen_general.csv";
pub const PROGRAMAS_FILE: &str = "programas.csv";
pub const UNIDADES_FILE: &str = "resultados_por_ur.csv";
pub const CAPITULOS_FILE: &str = "capitulos_por_ur.csv";
pub const PARTIDAS_FILE: &str = "partidas_por_ur.csv";
pub const REGISTROS_FILE: &str = "registros_procesados.csv";
pub const BUNDLE_FILE: &str = "resultado.json";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write every sheet of the bundle plus its JSON form into `dir`.
/// Returns the written paths in a fixed order.
pub fn export_bundle(dir: &Path, bundle: &ResultBundle) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let units: Vec<&String> = bundle.resultados_por_ur.keys().collect();
    let chapters: Vec<_> = units.iter().flat_map(|ur| chapter_table(bundle, ur)).collect();
    let partidas: Vec<_> = units.iter().flat_map(|ur| partida_table(bundle, ur)).collect();

    let path = |name: &str| dir.join(name);
    write_csv(&path(RESUMEN_FILE), &category_table(bundle))?;
    write_csv(&path(PROGRAMAS_FILE), &program_table(bundle))?;
    write_csv(&path(UNIDADES_FILE), &unit_summary_table(bundle))?;
    write_csv(&path(CAPITULOS_FILE), &chapters)?;
    write_csv(&path(PARTIDAS_FILE), &partidas)?;
    write_csv(&path(REGISTROS_FILE), &bundle.df_procesado)?;
    write_json(&path(BUNDLE_FILE), bundle)?;

    Ok([
        RESUMEN_FILE,
        PROGRAMAS_FILE,
        UNIDADES_FILE,
        CAPITULOS_FILE,
        PARTIDAS_FILE,
        REGISTROS_FILE,
        BUNDLE_FILE,
    ]
    .iter()
    .map(|n| path(n))
    .collect())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
