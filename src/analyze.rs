use std::collections::BTreeSet;

use crate::extract::{scan_entities, FederationMap};
use crate::model::entity::EntityRecord;
use crate::model::validation::ValidationCache;
use crate::parsers::metadata_tree::Element;
use crate::result::{AnalysisReport, DetailRow, Presence, UrlCheck};
use crate::validate::limiter::ConcurrencyLimiter;
use crate::validate::LinkChecker;

/// What the analysis pass needs to validate privacy statement URLs.
pub struct ValidationOptions<'a> {
    pub checker: &'a dyn LinkChecker,
    pub cache: Option<&'a mut ValidationCache>,
    pub limiter: &'a ConcurrencyLimiter,
}

/// Analyze every entity in a parsed metadata document.
pub fn analyze_document(
    root: &Element,
    federations: Option<&FederationMap>,
    validation: Option<ValidationOptions<'_>>,
) -> AnalysisReport {
    analyze(scan_entities(root, federations), validation)
}

/// Roll entity records up into global and per-federation statistics.
///
/// Records with an empty `entity_id` are counted but get no detail row.
/// When `validation` is given, the distinct SP privacy URLs are checked in a
/// single batch.
pub fn analyze<I>(entities: I, validation: Option<ValidationOptions<'_>>) -> AnalysisReport
where
    I: IntoIterator<Item = EntityRecord>,
{
    let records: Vec<EntityRecord> = entities.into_iter().collect();
    let mut report = AnalysisReport::default();

    for record in &records {
        report.global.record(record);
        if record.has_registration_authority() {
            report
                .federations
                .entry(record.federation_name.clone())
                .or_default()
                .record(record);
        }
    }

    let results = validation.map(|v| {
        let urls: Vec<String> = records
            .iter()
            .filter_map(EntityRecord::sp_privacy_url)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        tracing::debug!(distinct = urls.len(), "collected SP privacy URLs");
        v.checker.check_batch(&urls, v.cache, v.limiter)
    });
    report.validated = results.is_some();

    for record in &records {
        let url_check = results.as_ref().map(|results| {
            let result = record.sp_privacy_url().and_then(|url| results.get(url));
            match result {
                Some(result) => {
                    report.global.record_validation(result);
                    if record.has_registration_authority() {
                        if let Some(fed) = report.federations.get_mut(&record.federation_name) {
                            fed.record_validation(result);
                        }
                    }
                    UrlCheck::Checked(result.clone())
                }
                None => UrlCheck::NotChecked,
            }
        });

        if !record.has_identifier() {
            continue;
        }
        report.rows.push(detail_row(record, url_check));
    }

    tracing::info!(
        entities = report.global.total_entities,
        rows = report.rows.len(),
        federations = report.federations.len(),
        "analysis complete"
    );
    report
}

fn detail_row(record: &EntityRecord, url_check: Option<UrlCheck>) -> DetailRow {
    let (privacy, privacy_url) = if record.roles.sp {
        (
            Presence::from_bool(record.has_privacy),
            record.sp_privacy_url().map(str::to_string),
        )
    } else {
        (Presence::NotApplicable, None)
    };

    DetailRow {
        federation: record.federation_name.clone(),
        role: record.roles.label(),
        org_name: record.org_name.clone(),
        entity_id: record.entity_id.clone(),
        privacy,
        privacy_url,
        security: Presence::from_bool(record.has_security),
        sirtfi: Presence::from_bool(record.has_sirtfi),
        url_check,
    }
}
