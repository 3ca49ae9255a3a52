use crate::config::ConfigBundle;
use crate::rollup::Grouped;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tabled::Tabled;

/// Month abbreviations used as column suffixes, January first.
pub const MONTHS: [&str; 12] = [
    "ENE", "FEB", "MAR", "ABR", "MAY", "JUN", "JUL", "AGO", "SEP", "OCT", "NOV", "DIC",
];

pub const COL_UNIDAD: &str = "UNIDAD";
pub const COL_PROGRAMA: &str = "PROGRAMA";
pub const COL_PARTIDA: &str = "PARTIDA";

/// The monthly measures of a MAP extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    Original,
    Modificado,
    Ejercido,
    Congelado,
}

static COLUMN_NAMES: Lazy<[[String; 12]; 4]> = Lazy::new(|| {
    [
        Measure::Original,
        Measure::Modificado,
        Measure::Ejercido,
        Measure::Congelado,
    ]
    .map(|m| MONTHS.map(|mes| format!("{}_{}", m.prefix(), mes)))
});

impl Measure {
    /// Measures whose twelve columns must be present.
    pub const REQUIRED: [Measure; 3] = [Measure::Original, Measure::Modificado, Measure::Ejercido];

    pub fn prefix(self) -> &'static str {
        match self {
            Measure::Original => "ORI",
            Measure::Modificado => "MOD",
            Measure::Ejercido => "EJE",
            Measure::Congelado => "CONG",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Column names for this measure, `ORI_ENE` through `ORI_DIC`.
    pub fn columns(self) -> &'static [String; 12] {
        &COLUMN_NAMES[self.index()]
    }
}

pub type Monthly = [Decimal; 12];

/// One row of the extract, validated against the MAP schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub line: u64,
    pub unidad: String,
    pub programa: String,
    pub partida: String,
    pub original: Monthly,
    pub modificado: Monthly,
    pub ejercido: Monthly,
    /// `None` for a month whose `CONG_` column is absent from the file.
    pub congelado: [Option<Decimal>; 12],
}

/// A source record plus its derived totals and chapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(rename = "UNIDAD")]
    pub unidad: String,
    #[serde(rename = "PROGRAMA")]
    pub programa: String,
    #[serde(rename = "PARTIDA")]
    pub partida: String,
    #[serde(rename = "CAPITULO")]
    pub capitulo: u8,
    #[serde(rename = "ORIGINAL")]
    pub original: Decimal,
    #[serde(rename = "MOD_ANUAL")]
    pub mod_anual: Decimal,
    #[serde(rename = "MOD_PERIODO")]
    pub mod_periodo: Decimal,
    #[serde(rename = "EJERCIDO")]
    pub ejercido: Decimal,
    #[serde(rename = "CONG_ANUAL")]
    pub cong_anual: Decimal,
    #[serde(rename = "CONG_PERIODO")]
    pub cong_periodo: Decimal,
}

/// Dashboard KPIs of one organizational unit (filtered rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitKpis {
    #[serde(rename = "Original")]
    pub original: Decimal,
    #[serde(rename = "Modificado_anual")]
    pub modificado_anual: Decimal,
    #[serde(rename = "Modificado_periodo")]
    pub modificado_periodo: Decimal,
    #[serde(rename = "Ejercido")]
    pub ejercido: Decimal,
    #[serde(rename = "Disponible_anual")]
    pub disponible_anual: Decimal,
    #[serde(rename = "Disponible_periodo")]
    pub disponible_periodo: Decimal,
    #[serde(rename = "Congelado_anual")]
    pub congelado_anual: Decimal,
    #[serde(rename = "Congelado_periodo")]
    pub congelado_periodo: Decimal,
    #[serde(rename = "Pct_avance_anual")]
    pub pct_avance_anual: Decimal,
    #[serde(rename = "Pct_avance_periodo")]
    pub pct_avance_periodo: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterTotals {
    #[serde(rename = "Original")]
    pub original: Decimal,
    #[serde(rename = "Modificado_anual")]
    pub modificado_anual: Decimal,
    #[serde(rename = "Modificado_periodo")]
    pub modificado_periodo: Decimal,
    #[serde(rename = "Ejercido")]
    pub ejercido: Decimal,
    #[serde(rename = "Disponible_periodo")]
    pub disponible_periodo: Decimal,
    #[serde(rename = "Pct_avance_periodo")]
    pub pct_avance_periodo: Decimal,
}

/// Dashboard spending chapters broken out per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chapter {
    Materiales,
    ServiciosGenerales,
    Transferencias,
}

impl Chapter {
    pub const ALL: [Chapter; 3] = [
        Chapter::Materiales,
        Chapter::ServiciosGenerales,
        Chapter::Transferencias,
    ];

    pub fn number(self) -> u8 {
        match self {
            Chapter::Materiales => 2,
            Chapter::ServiciosGenerales => 3,
            Chapter::Transferencias => 4,
        }
    }

    pub fn denomination(self) -> &'static str {
        match self {
            Chapter::Materiales => "Materiales y suministros",
            Chapter::ServiciosGenerales => "Servicios generales",
            Chapter::Transferencias => "Transferencias",
        }
    }
}

/// Chapters 2, 3 and 4 of one unit, always all three, in `Chapter::ALL` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterBreakdown(pub [(Chapter, ChapterTotals); 3]);

impl ChapterBreakdown {
    pub fn get(&self, chapter: Chapter) -> &ChapterTotals {
        &self.0[chapter as usize].1
    }
}

impl Serialize for ChapterBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (chapter, totals) in &self.0 {
            map.serialize_entry(&chapter.number().to_string(), totals)?;
        }
        map.end()
    }
}

/// One of the five-largest available balances of a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartidaDisponible {
    #[serde(rename = "Partida")]
    pub partida: String,
    #[serde(rename = "Programa")]
    pub programa: String,
    #[serde(rename = "Denom_Programa")]
    pub denom_programa: String,
    #[serde(rename = "Disponible")]
    pub disponible: Decimal,
    #[serde(rename = "Pct_del_total")]
    pub pct_del_total: Decimal,
}

/// Global, category and program rollups (unfiltered rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    #[serde(rename = "Original")]
    pub original: Decimal,
    #[serde(rename = "ModificadoAnualNeto")]
    pub modificado_anual: Decimal,
    #[serde(rename = "ModificadoPeriodoNeto")]
    pub modificado_periodo: Decimal,
    #[serde(rename = "Ejercido")]
    pub ejercido: Decimal,
    #[serde(rename = "Disponible")]
    pub disponible: Decimal,
    #[serde(rename = "Pct_avance")]
    pub pct_avance: Decimal,
}

/// Fixed spending categories of the general MAP summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ServiciosPersonales,
    GastoCorriente,
    Subsidios,
    OtrosProgramas,
    BienesMuebles,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::ServiciosPersonales,
        Category::GastoCorriente,
        Category::Subsidios,
        Category::OtrosProgramas,
        Category::BienesMuebles,
    ];

    /// `BienesMuebles` is a sub-view of `OtrosProgramas`; these four add up.
    pub const ADDITIVE: [Category; 4] = [
        Category::ServiciosPersonales,
        Category::GastoCorriente,
        Category::Subsidios,
        Category::OtrosProgramas,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::ServiciosPersonales => "servicios_personales",
            Category::GastoCorriente => "gasto_corriente",
            Category::Subsidios => "subsidios",
            Category::OtrosProgramas => "otros_programas",
            Category::BienesMuebles => "bienes_muebles",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::ServiciosPersonales => "Servicios Personales",
            Category::GastoCorriente => "Gasto Corriente",
            Category::Subsidios => "Subsidios",
            Category::OtrosProgramas => "Otros",
            Category::BienesMuebles => "Bienes Muebles",
        }
    }

    pub fn chapters(self) -> &'static [u8] {
        match self {
            Category::ServiciosPersonales => &[1],
            Category::GastoCorriente => &[2, 3],
            Category::Subsidios => &[4],
            Category::OtrosProgramas => &[5, 6, 7],
            Category::BienesMuebles => &[5],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotals(pub Vec<(Category, Totals)>);

impl CategoryTotals {
    pub fn get(&self, category: Category) -> Option<&Totals> {
        self.0.iter().find(|(c, _)| *c == category).map(|(_, t)| t)
    }
}

impl Serialize for CategoryTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, totals) in &self.0 {
            map.serialize_entry(category.key(), totals)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub fecha_archivo: NaiveDate,
    pub mes: u32,
    #[serde(rename = "año")]
    pub anio: i32,
    pub registros: usize,
    pub config: ConfigBundle,
}

/// Everything a run produces. Built once by `reports::process_map`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultBundle {
    pub totales: Totals,
    pub categorias: CategoryTotals,
    pub programas: Grouped<String, Totals>,
    pub resultados_por_ur: Grouped<String, UnitKpis>,
    pub capitulos_por_ur: Grouped<String, ChapterBreakdown>,
    pub partidas_por_ur: Grouped<String, Vec<PartidaDisponible>>,
    pub metadata: Metadata,
    #[serde(skip)]
    pub df_procesado: Vec<EnrichedRecord>,
}

// ---------------------------------------------------------------------------
// Presentation rows. Amounts are pre-formatted strings, as rendered.
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategoryRow {
    #[serde(rename = "Categoria")]
    #[tabled(rename = "Categoria")]
    pub categoria: String,
    #[serde(rename = "Original")]
    #[tabled(rename = "Original")]
    pub original: String,
    #[serde(rename = "Mod. Anual")]
    #[tabled(rename = "Mod. Anual")]
    pub mod_anual: String,
    #[serde(rename = "Mod. Periodo")]
    #[tabled(rename = "Mod. Periodo")]
    pub mod_periodo: String,
    #[serde(rename = "Ejercido")]
    #[tabled(rename = "Ejercido")]
    pub ejercido: String,
    #[serde(rename = "Disponible")]
    #[tabled(rename = "Disponible")]
    pub disponible: String,
    #[serde(rename = "% Avance")]
    #[tabled(rename = "% Avance")]
    pub avance: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct UnitSummaryRow {
    #[serde(rename = "UR")]
    #[tabled(rename = "UR")]
    pub ur: String,
    #[serde(rename = "Denominacion")]
    #[tabled(rename = "Denominacion")]
    pub denominacion: String,
    #[serde(rename = "Original")]
    #[tabled(rename = "Original")]
    pub original: String,
    #[serde(rename = "Mod. Anual")]
    #[tabled(rename = "Mod. Anual")]
    pub mod_anual: String,
    #[serde(rename = "Mod. Periodo")]
    #[tabled(rename = "Mod. Periodo")]
    pub mod_periodo: String,
    #[serde(rename = "Ejercido")]
    #[tabled(rename = "Ejercido")]
    pub ejercido: String,
    #[serde(rename = "Disp. Anual")]
    #[tabled(rename = "Disp. Anual")]
    pub disp_anual: String,
    #[serde(rename = "Disp. Periodo")]
    #[tabled(rename = "Disp. Periodo")]
    pub disp_periodo: String,
    #[serde(rename = "Cong. Anual")]
    #[tabled(rename = "Cong. Anual")]
    pub cong_anual: String,
    #[serde(rename = "Cong. Periodo")]
    #[tabled(rename = "Cong. Periodo")]
    pub cong_periodo: String,
    #[serde(rename = "% Avance Anual")]
    #[tabled(rename = "% Avance Anual")]
    pub avance_anual: String,
    #[serde(rename = "% Avance Periodo")]
    #[tabled(rename = "% Avance Periodo")]
    pub avance_periodo: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ChapterRow {
    #[serde(rename = "UR")]
    #[tabled(rename = "UR")]
    pub ur: String,
    #[serde(rename = "Capitulo")]
    #[tabled(rename = "Capitulo")]
    pub capitulo: String,
    #[serde(rename = "Denominacion")]
    #[tabled(rename = "Denominacion")]
    pub denominacion: String,
    #[serde(rename = "Original")]
    #[tabled(rename = "Original")]
    pub original: String,
    #[serde(rename = "Mod. Anual")]
    #[tabled(rename = "Mod. Anual")]
    pub mod_anual: String,
    #[serde(rename = "Mod. Periodo")]
    #[tabled(rename = "Mod. Periodo")]
    pub mod_periodo: String,
    #[serde(rename = "Ejercido")]
    #[tabled(rename = "Ejercido")]
    pub ejercido: String,
    #[serde(rename = "Disponible")]
    #[tabled(rename = "Disponible")]
    pub disponible: String,
    #[serde(rename = "% Avance")]
    #[tabled(rename = "% Avance")]
    pub avance: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PartidaRow {
    #[serde(rename = "UR")]
    #[tabled(rename = "UR")]
    pub ur: String,
    #[serde(rename = "Partida")]
    #[tabled(rename = "Partida")]
    pub partida: String,
    #[serde(rename = "Programa")]
    #[tabled(rename = "Programa")]
    pub programa: String,
    #[serde(rename = "Denom. Programa")]
    #[tabled(rename = "Denom. Programa")]
    pub denom_programa: String,
    #[serde(rename = "Disponible")]
    #[tabled(rename = "Disponible")]
    pub disponible: String,
    #[serde(rename = "% del Total")]
    #[tabled(rename = "% del Total")]
    pub pct_del_total: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProgramRow {
    #[serde(rename = "Programa")]
    #[tabled(rename = "Programa")]
    pub programa: String,
    #[serde(rename = "Denominacion")]
    #[tabled(rename = "Denominacion")]
    pub denominacion: String,
    #[serde(rename = "Original")]
    #[tabled(rename = "Original")]
    pub original: String,
    #[serde(rename = "Mod. Anual")]
    #[tabled(rename = "Mod. Anual")]
    pub mod_anual: String,
    #[serde(rename = "Mod. Periodo")]
    #[tabled(rename = "Mod. Periodo")]
    pub mod_periodo: String,
    #[serde(rename = "Ejercido")]
    #[tabled(rename = "Ejercido")]
    pub ejercido: String,
    #[serde(rename = "% Avance")]
    #[tabled(rename = "% Avance")]
    pub avance: String,
}
