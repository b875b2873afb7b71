use crate::model::{AdminLevel, MatchField, MissingRow, ReferenceCodes, RegistryRecord};

/// Registry records whose code is absent from `reference`.
///
/// Output is sorted ascending by `HistoricalCode` (stable, so duplicates keep
/// registry order). A record without a value for `match_on` is always missing.
pub fn find_missing<'a>(
    records: &'a [RegistryRecord],
    reference: &ReferenceCodes,
    match_on: MatchField,
) -> Vec<&'a RegistryRecord> {
    let mut missing: Vec<&RegistryRecord> = records
        .iter()
        .filter(|r| match r.code_for(match_on) {
            Some(code) => !reference.contains(code),
            None => true,
        })
        .collect();
    missing.sort_by_key(|r| r.historical_code);
    missing
}

/// Project missing records to the rows stored in the dated log.
pub fn to_missing_rows(missing: &[&RegistryRecord]) -> Vec<MissingRow> {
    missing.iter().map(|r| MissingRow::from(*r)).collect()
}

/// Dated log key for one source at one level, e.g. `lindas_missing_communes`.
pub fn report_key(source: &str, level: AdminLevel) -> String {
    format!("{source}_missing_{}", level.kind_label())
}
