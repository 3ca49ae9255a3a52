// Rollup engine.
//
// Every aggregate is a fresh pass over the enriched rows. Sums are carried
// unrounded in `Sums` and rounded exactly once when published; ratios always
// use the unrounded sums.
use crate::config::ConfigBundle;
use crate::error::{ReportError, Result};
use crate::types::{
    Category, CategoryTotals, Chapter, ChapterBreakdown, ChapterTotals, EnrichedRecord,
    PartidaDisponible, Totals, UnitKpis,
};
use crate::util::{ratio, round_money};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;

/// Payroll chapter, left out of the dashboard.
pub const PAYROLL_CHAPTER: u8 = 1;
/// Line items left out of the dashboard.
pub const EXCLUDED_PARTIDAS: [&str; 2] = ["39801", "39810"];
/// Length of the per-unit available-balance ranking.
pub const TOP_PARTIDAS: usize = 5;

/// Which rows an aggregate sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionPolicy {
    Unfiltered,
    /// No payroll chapter, no excluded line items.
    Dashboard,
}

impl InclusionPolicy {
    pub fn includes(self, r: &EnrichedRecord) -> bool {
        match self {
            InclusionPolicy::Unfiltered => true,
            InclusionPolicy::Dashboard => {
                r.capitulo != PAYROLL_CHAPTER && !EXCLUDED_PARTIDAS.contains(&r.partida.as_str())
            }
        }
    }
}

/// Map with first-insertion iteration order.
#[derive(Debug, Clone)]
pub struct Grouped<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K: PartialEq, V: PartialEq> PartialEq for Grouped<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq + Hash + Clone, V> Default for Grouped<K, V> {
    fn default() -> Self {
        Grouped {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Grouped<K, V> {
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let i = match self.index.get(&key) {
            Some(i) => *i,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, V::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }

    pub fn insert(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(i) => self.entries[*i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|i| &self.entries[*i].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn map_values<W>(self, mut f: impl FnMut(&K, V) -> W) -> Grouped<K, W> {
        let entries: Vec<(K, W)> = self
            .entries
            .into_iter()
            .map(|(k, v)| {
                let w = f(&k, v);
                (k, w)
            })
            .collect();
        Grouped {
            entries,
            index: self.index,
        }
    }
}

impl<K: Serialize, V: Serialize> Serialize for Grouped<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn add_checked(acc: Decimal, value: Decimal, measure: &str) -> Result<Decimal> {
    acc.checked_add(value).ok_or_else(|| ReportError::Overflow(measure.to_string()))
}

/// Unrounded running totals of the measures.
///
/// Built through `add`, both available balances are representable too.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sums {
    pub original: Decimal,
    pub mod_anual: Decimal,
    pub mod_periodo: Decimal,
    pub ejercido: Decimal,
    pub cong_anual: Decimal,
    pub cong_periodo: Decimal,
}

impl Sums {
    /// Fold one row in. On overflow `self` is left unchanged.
    pub fn add(&mut self, r: &EnrichedRecord) -> Result<()> {
        let next = Sums {
            original: add_checked(self.original, r.original, "original")?,
            mod_anual: add_checked(self.mod_anual, r.mod_anual, "annual modified")?,
            mod_periodo: add_checked(self.mod_periodo, r.mod_periodo, "period modified")?,
            ejercido: add_checked(self.ejercido, r.ejercido, "exercised")?,
            cong_anual: add_checked(self.cong_anual, r.cong_anual, "annual frozen")?,
            cong_periodo: add_checked(self.cong_periodo, r.cong_periodo, "period frozen")?,
        };
        for (budget, what) in [
            (next.mod_anual, "annual available"),
            (next.mod_periodo, "period available"),
        ] {
            if budget.checked_sub(next.ejercido).is_none() {
                return Err(ReportError::Overflow(what.to_string()));
            }
        }
        *self = next;
        Ok(())
    }

    pub fn of<'a>(rows: impl IntoIterator<Item = &'a EnrichedRecord>) -> Result<Sums> {
        let mut s = Sums::default();
        for r in rows {
            s.add(r)?;
        }
        Ok(s)
    }

    pub fn disponible_anual(&self) -> Decimal {
        self.mod_anual - self.ejercido
    }

    pub fn disponible_periodo(&self) -> Decimal {
        self.mod_periodo - self.ejercido
    }

    pub fn to_totals(&self) -> Totals {
        Totals {
            original: round_money(self.original),
            modificado_anual: round_money(self.mod_anual),
            modificado_periodo: round_money(self.mod_periodo),
            ejercido: round_money(self.ejercido),
            disponible: round_money(self.disponible_periodo()),
            pct_avance: ratio(self.ejercido, self.mod_periodo),
        }
    }

    pub fn to_unit_kpis(&self) -> UnitKpis {
        UnitKpis {
            original: round_money(self.original),
            modificado_anual: round_money(self.mod_anual),
            modificado_periodo: round_money(self.mod_periodo),
            ejercido: round_money(self.ejercido),
            disponible_anual: round_money(self.disponible_anual()),
            disponible_periodo: round_money(self.disponible_periodo()),
            congelado_anual: round_money(self.cong_anual),
            congelado_periodo: round_money(self.cong_periodo),
            pct_avance_anual: ratio(self.ejercido, self.mod_anual),
            pct_avance_periodo: ratio(self.ejercido, self.mod_periodo),
        }
    }

    pub fn to_chapter_totals(&self) -> ChapterTotals {
        ChapterTotals {
            original: round_money(self.original),
            modificado_anual: round_money(self.mod_anual),
            modificado_periodo: round_money(self.mod_periodo),
            ejercido: round_money(self.ejercido),
            disponible_periodo: round_money(self.disponible_periodo()),
            pct_avance_periodo: ratio(self.ejercido, self.mod_periodo),
        }
    }
}

/// Sum the rows admitted by `policy` into one group per key, in
/// first-occurrence order. Groups never hold zero rows.
pub fn rollup_by<'a, K, F>(
    rows: &'a [EnrichedRecord],
    policy: InclusionPolicy,
    key: F,
) -> Result<Grouped<K, Sums>>
where
    K: Eq + Hash + Clone,
    F: Fn(&'a EnrichedRecord) -> K,
{
    let mut groups: Grouped<K, Sums> = Grouped::default();
    for r in rows.iter().filter(|r| policy.includes(r)) {
        groups.entry_or_default(key(r)).add(r)?;
    }
    Ok(groups)
}

pub fn rollup_global(rows: &[EnrichedRecord], policy: InclusionPolicy) -> Result<Sums> {
    Sums::of(rows.iter().filter(|r| policy.includes(r)))
}

/// Category summary over every row.
pub fn rollup_categories(rows: &[EnrichedRecord]) -> Result<CategoryTotals> {
    let totals = Category::ALL
        .iter()
        .map(|&c| -> Result<(Category, Totals)> {
            let sums = Sums::of(rows.iter().filter(|r| c.chapters().contains(&r.capitulo)))?;
            Ok((c, sums.to_totals()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CategoryTotals(totals))
}

pub fn rollup_programs(rows: &[EnrichedRecord]) -> Result<Grouped<String, Totals>> {
    Ok(rollup_by(rows, InclusionPolicy::Unfiltered, |r| r.programa.clone())?
        .map_values(|_, s| s.to_totals()))
}

/// Chapters 2..4 of rows already narrowed to one unit.
pub fn chapter_breakdown(unit_rows: &[&EnrichedRecord]) -> Result<ChapterBreakdown> {
    let mut sums = [Sums::default(); 3];
    for r in unit_rows {
        if let Some(i) = Chapter::ALL.iter().position(|c| c.number() == r.capitulo) {
            sums[i].add(r)?;
        }
    }
    Ok(ChapterBreakdown(std::array::from_fn(|i| (Chapter::ALL[i], sums[i].to_chapter_totals()))))
}

/// The `TOP_PARTIDAS` largest positive available balances of one unit,
/// grouped by line item and program.
///
/// `unit_available` is the unit's unrounded period available, the base of
/// each entry's share.
pub fn top_partidas(
    unit_rows: &[&EnrichedRecord],
    unit_available: Decimal,
    config: &ConfigBundle,
) -> Result<Vec<PartidaDisponible>> {
    let mut groups: Grouped<(&str, &str), Sums> = Grouped::default();
    for r in unit_rows {
        groups
            .entry_or_default((r.partida.as_str(), r.programa.as_str()))
            .add(r)?;
    }
    let mut ranked: Vec<((&str, &str), Decimal)> = groups
        .iter()
        .map(|(k, s)| (*k, s.disponible_periodo()))
        .filter(|(_, disp)| *disp > Decimal::ZERO)
        .collect();
    // Stable: equal balances keep input order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked
        .into_iter()
        .take(TOP_PARTIDAS)
        .map(|((partida, programa), disp)| PartidaDisponible {
            partida: partida.to_string(),
            programa: programa.to_string(),
            denom_programa: config.program_name(programa).to_string(),
            disponible: round_money(disp),
            pct_del_total: ratio(disp, unit_available),
        })
        .collect())
}

/// Dashboard results of every unit with at least one admitted row.
pub struct UnitRollups {
    pub kpis: Grouped<String, UnitKpis>,
    pub chapters: Grouped<String, ChapterBreakdown>,
    pub partidas: Grouped<String, Vec<PartidaDisponible>>,
}

pub fn rollup_units(rows: &[EnrichedRecord], config: &ConfigBundle) -> Result<UnitRollups> {
    let mut by_unit: Grouped<&str, Vec<&EnrichedRecord>> = Grouped::default();
    for r in rows {
        // Seed every unit in first-occurrence order, admitted rows or not.
        let unit_rows = by_unit.entry_or_default(r.unidad.as_str());
        if InclusionPolicy::Dashboard.includes(r) {
            unit_rows.push(r);
        }
    }

    let mut out = UnitRollups {
        kpis: Grouped::default(),
        chapters: Grouped::default(),
        partidas: Grouped::default(),
    };
    for (unidad, unit_rows) in by_unit.iter() {
        if unit_rows.is_empty() {
            log::debug!("unit {} has no dashboard rows; skipped", unidad);
            continue;
        }
        let sums = Sums::of(unit_rows.iter().copied())?;
        let ur = unidad.to_string();
        out.kpis.insert(ur.clone(), sums.to_unit_kpis());
        out.chapters.insert(ur.clone(), chapter_breakdown(unit_rows)?);
        out.partidas.insert(
            ur,
            top_partidas(unit_rows, sums.disponible_periodo(), config)?,
        );
    }
    Ok(out)
}
