// Entry point and high-level CLI flow.
//
// - Resolve the reporting period and the year's configuration.
// - Load and validate the MAP extract, then build the result bundle.
// - Print markdown previews of each table and export every sheet plus the
//   JSON bundle to the output directory.
mod config;
mod enrich;
mod error;
mod loader;
mod output;
mod reports;
mod rollup;
mod types;
mod util;

#[cfg(test)]
mod testutil;

use chrono::NaiveDate;
use clap::Parser;
use error::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use types::ResultBundle;

#[derive(Parser, Debug)]
#[command(
    name = "cuadro-presupuesto",
    version,
    about = "Resumen presupuestario y dashboard por UR a partir de un extracto MAP"
)]
struct Args {
    /// MAP extract (CSV, UTF-8 or Latin-1). The reporting date is read from
    /// its name unless --date is given.
    input: PathBuf,

    /// Reporting year; defaults to the year of the reporting date.
    #[arg(long)]
    year: Option<i32>,

    /// Reporting month 1-12; defaults to the month of the reporting date.
    #[arg(long)]
    month: Option<u32>,

    /// Reporting date, YYYY-MM-DD.
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// JSON file with per-year unit and program names.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the exported sheets.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Rows shown in each console preview.
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
}

fn print_previews(bundle: &ResultBundle, max_rows: usize) {
    let meta = &bundle.metadata;
    println!(
        "Periodo: {} (mes {}, año {}), {} registros\n",
        meta.fecha_archivo,
        meta.mes,
        meta.anio,
        util::format_int(meta.registros)
    );
    println!(
        "PEF Original {} | Modificado Anual {} | Mod. Periodo {} | Ejercido {}\n",
        util::format_currency(bundle.totales.original),
        util::format_currency(bundle.totales.modificado_anual),
        util::format_currency(bundle.totales.modificado_periodo),
        util::format_currency(bundle.totales.ejercido)
    );

    output::preview_table(
        "Resumen General",
        Some("Todos los capítulos"),
        &reports::category_table(bundle),
        max_rows,
    );
    output::preview_table(
        "Dashboard Presupuesto por UR",
        Some("Sin capítulo 1 ni partidas 39801 y 39810"),
        &reports::unit_summary_table(bundle),
        max_rows,
    );
    if bundle.resultados_por_ur.is_empty() {
        println!("No hay datos por UR disponibles\n");
    }
    if let Some(ur) = bundle.resultados_por_ur.keys().next() {
        let name = meta.config.unit_name(ur);
        output::preview_table(
            &format!("Estado del ejercicio por capítulo de gasto - {}", name),
            None,
            &reports::chapter_table(bundle, ur),
            max_rows,
        );
        output::preview_table(
            &format!("Cinco partidas con mayor disponible - {}", name),
            None,
            &reports::partida_table(bundle, ur),
            max_rows,
        );
    }
}

fn run(args: &Args) -> Result<()> {
    let filename = args
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let period = config::resolve_period(filename, args.date, args.month, args.year)?;
    let cfg = match &args.config {
        Some(path) => config::load_config(path, period.anio)?,
        None => config::ConfigBundle::default(),
    };

    let (records, load_report) = loader::load_records(&args.input, &cfg)?;
    println!(
        "Archivo: {} ({} registros)",
        args.input.display(),
        util::format_int(load_report.total_rows)
    );
    if load_report.frozen_columns == 0 {
        println!("Info: sin columnas CONG_; congelado reportado en cero.");
    }

    let bundle = reports::process_map(&records, &period, &cfg)?;
    print_previews(&bundle, args.preview_rows);

    let written = output::export_bundle(&args.out_dir, &bundle)?;
    println!("Outputs saved to {}:", args.out_dir.display());
    for p in &written {
        println!("  {}", p.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
