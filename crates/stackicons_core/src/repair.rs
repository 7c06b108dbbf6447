use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::config::StoreSettings;
use crate::fallback::FallbackTable;
use crate::matcher::{ResolutionKind, resolve};
use crate::model::Item;
use crate::sanity::SanityClient;
use crate::store::{DocumentStore, WriteOutcome, fetch_items, write_items};

/// Which documents a run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairScope {
    pub document_type: String,
    pub document_id: String,
    pub source_language: String,
    pub target_language: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairOptions {
    pub dry_run: bool,
    /// Re-match items that already have an icon.
    pub overwrite_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResolution {
    pub name: String,
    pub icon: String,
    pub kind: ResolutionKind,
    pub matched_source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RepairReport {
    pub scope: RepairScope,
    pub source_items: usize,
    pub target_items: usize,
    pub resolutions: Vec<ItemResolution>,
    pub dry_run: bool,
    pub write: Option<WriteOutcome>,
    pub request_count: usize,
}

impl RepairReport {
    pub fn count(&self, kind: ResolutionKind) -> usize {
        self.resolutions
            .iter()
            .filter(|resolution| resolution.kind == kind)
            .count()
    }

    /// True when the write was accepted. A dry run never succeeds.
    pub fn write_succeeded(&self) -> bool {
        self.write.as_ref().is_some_and(WriteOutcome::is_success)
    }

    /// Fails when the mutation was sent and rejected. Dry runs pass.
    pub fn ensure_written(&self) -> Result<()> {
        match &self.write {
            Some(outcome) if !outcome.is_success() => bail!(
                "mutation for {} rejected with HTTP {}: {}",
                self.scope.document_id,
                outcome.status,
                outcome.body
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub scope: RepairScope,
    pub source: Vec<Item>,
    pub target: Vec<Item>,
}

pub fn repair_remote(
    settings: &StoreSettings,
    table: &FallbackTable,
    options: &RepairOptions,
) -> Result<RepairReport> {
    let mut client = SanityClient::from_settings(settings)?;
    run_repair(&mut client, &settings.scope(), table, options)
}

pub fn inspect_remote(settings: &StoreSettings) -> Result<InspectReport> {
    let mut client = SanityClient::from_settings(settings)?;
    inspect_with_store(&mut client, &settings.scope())
}

pub fn inspect_with_store<S: DocumentStore>(
    store: &mut S,
    scope: &RepairScope,
) -> Result<InspectReport> {
    let source = fetch_items(store, &scope.document_type, &scope.source_language)?;
    let target = fetch_items(store, &scope.document_type, &scope.target_language)?;
    Ok(InspectReport {
        scope: scope.clone(),
        source,
        target,
    })
}

/// Fetch both lists, fill target icons, and write the target list back.
pub fn run_repair<S: DocumentStore>(
    store: &mut S,
    scope: &RepairScope,
    table: &FallbackTable,
    options: &RepairOptions,
) -> Result<RepairReport> {
    let source = fetch_items(store, &scope.document_type, &scope.source_language)?;
    let mut target = fetch_items(store, &scope.document_type, &scope.target_language)?;
    info!(
        source = source.len(),
        target = target.len(),
        "fetched tech stack lists"
    );

    let resolutions = fill_icons(&mut target, &source, table, options.overwrite_existing);

    let write = if options.dry_run {
        info!("dry run; skipping mutation");
        None
    } else {
        let outcome = write_items(store, &scope.document_id, &target)?;
        if outcome.is_success() {
            info!(status = outcome.status, "tech stack patch accepted");
        } else {
            warn!(status = outcome.status, "tech stack patch rejected");
        }
        Some(outcome)
    };

    Ok(RepairReport {
        scope: scope.clone(),
        source_items: source.len(),
        target_items: target.len(),
        resolutions,
        dry_run: options.dry_run,
        write,
        request_count: store.request_count(),
    })
}

/// Give every target item an icon. Items are patched in place.
pub fn fill_icons(
    target: &mut [Item],
    source: &[Item],
    table: &FallbackTable,
    overwrite_existing: bool,
) -> Vec<ItemResolution> {
    let mut resolutions = Vec::with_capacity(target.len());
    for item in target.iter_mut() {
        let resolution = fill_icon(item, source, table, overwrite_existing);
        debug!(
            name = %resolution.name,
            icon = %resolution.icon,
            kind = resolution.kind.as_str(),
            "resolved icon"
        );
        if resolution.kind == ResolutionKind::Default {
            warn!(name = %resolution.name, "no match or table entry; using default icon");
        }
        resolutions.push(resolution);
    }
    resolutions
}

fn fill_icon(
    item: &mut Item,
    source: &[Item],
    table: &FallbackTable,
    overwrite_existing: bool,
) -> ItemResolution {
    let existing = item.icon().map(ToString::to_string);
    let kept = |icon: String, name: &str| ItemResolution {
        name: name.to_string(),
        icon,
        kind: ResolutionKind::Kept,
        matched_source: None,
    };

    if let Some(icon) = &existing
        && !overwrite_existing
    {
        return kept(icon.clone(), &item.name);
    }

    let resolved = resolve(&item.name, source, table);
    let from_source = matches!(
        resolved.kind,
        ResolutionKind::Containment | ResolutionKind::Normalized
    );
    // An existing icon only yields to a source match, never to the table.
    if let Some(icon) = existing
        && !from_source
    {
        return kept(icon, &item.name);
    }

    item.icon = Some(resolved.icon.clone());
    ItemResolution {
        name: item.name.clone(),
        icon: resolved.icon,
        kind: resolved.kind,
        matched_source: resolved.matched_source,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::bail;
    use serde_json::{Value, json};

    use super::{RepairOptions, RepairScope, fill_icons, inspect_with_store, run_repair};
    use crate::fallback::{DEFAULT_ICON, FallbackTable};
    use crate::matcher::ResolutionKind;
    use crate::model::Item;
    use crate::store::{DocumentStore, MutationRequest, WriteOutcome};

    #[derive(Default)]
    struct MockStore {
        documents: BTreeMap<String, Value>,
        writes: Vec<MutationRequest>,
        write_status: u16,
        write_body: String,
        fail_reads: bool,
        request_count: usize,
    }

    impl MockStore {
        fn with_lists(source: Value, target: Value) -> Self {
            Self {
                documents: BTreeMap::from([
                    ("en".to_string(), source),
                    ("ar".to_string(), target),
                ]),
                write_status: 200,
                write_body: r#"{"transactionId":"tx1","results":[{"id":"doc-ar","operation":"update"}]}"#
                    .to_string(),
                ..Self::default()
            }
        }

        fn written_items(&self) -> Vec<Value> {
            self.writes
                .last()
                .and_then(|request| request.mutations.first())
                .and_then(|mutation| mutation.patch.set.get("techStack.items"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        }
    }

    impl DocumentStore for MockStore {
        fn read(&mut self, query: &str) -> anyhow::Result<Value> {
            self.request_count += 1;
            if self.fail_reads {
                bail!("connection refused");
            }
            let language = self
                .documents
                .keys()
                .find(|language| query.contains(&format!("language == '{language}'")))
                .cloned();
            let result = language
                .and_then(|language| self.documents.get(&language).cloned())
                .map(|items| json!({"techStack": {"items": items}}))
                .unwrap_or(Value::Null);
            Ok(json!({"query": query, "result": result, "ms": 1}))
        }

        fn write(&mut self, request: &MutationRequest) -> anyhow::Result<WriteOutcome> {
            self.request_count += 1;
            self.writes.push(request.clone());
            Ok(WriteOutcome {
                status: self.write_status,
                body: self.write_body.clone(),
            })
        }

        fn request_count(&self) -> usize {
            self.request_count
        }
    }

    fn scope() -> RepairScope {
        RepairScope {
            document_type: "homepage".to_string(),
            document_id: "doc-ar".to_string(),
            source_language: "en".to_string(),
            target_language: "ar".to_string(),
        }
    }

    #[test]
    fn kafka_gets_icon_from_apache_kafka() {
        let mut store = MockStore::with_lists(
            json!([{"name": "Apache Kafka", "icon": "simple-icons:apachekafka"}]),
            json!([{"name": "Kafka"}]),
        );

        let report = run_repair(
            &mut store,
            &scope(),
            &FallbackTable::builtin(),
            &RepairOptions::default(),
        )
        .expect("repair");

        assert_eq!(report.resolutions.len(), 1);
        assert_eq!(report.resolutions[0].kind, ResolutionKind::Containment);
        assert_eq!(
            report.resolutions[0].matched_source.as_deref(),
            Some("Apache Kafka")
        );
        assert!(report.write_succeeded());
        assert!(report.ensure_written().is_ok());
        assert_eq!(report.request_count, 3);

        assert_eq!(store.writes.len(), 1);
        assert_eq!(store.writes[0].mutations[0].patch.id, "doc-ar");
        assert_eq!(
            store.written_items(),
            vec![json!({"name": "Kafka", "icon": "simple-icons:apachekafka"})]
        );
    }

    #[test]
    fn every_target_item_ends_with_an_icon() {
        let mut store = MockStore::with_lists(
            json!([
                {"name": "Google Cloud Platform", "icon": "simple-icons:googlecloud"},
                {"name": "Docker", "icon": "simple-icons:docker"},
                {"name": "Python", "icon": "simple-icons:python"}
            ]),
            json!([
                {"_key": "a", "name": "Google  Cloud Platform"},
                {"_key": "b", "name": "عامل ميناء"},
                {"_key": "c", "name": "شيء جديد"},
                {"_key": "d", "name": "Docker", "icon": ""},
                {"_key": "e", "name": "جرافانا", "icon": "simple-icons:grafana"}
            ]),
        );

        let report = run_repair(
            &mut store,
            &scope(),
            &FallbackTable::builtin(),
            &RepairOptions::default(),
        )
        .expect("repair");

        let kinds = report
            .resolutions
            .iter()
            .map(|resolution| resolution.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                ResolutionKind::Normalized,
                ResolutionKind::Table,
                ResolutionKind::Default,
                ResolutionKind::Containment,
                ResolutionKind::Kept,
            ]
        );
        assert_eq!(report.count(ResolutionKind::Default), 1);
        assert_eq!(report.resolutions[2].icon, DEFAULT_ICON);

        let written = store.written_items();
        assert_eq!(written.len(), 5);
        for item in &written {
            let icon = item.get("icon").and_then(Value::as_str).unwrap_or("");
            assert!(!icon.is_empty(), "missing icon in {item}");
            assert!(item.get("_key").is_some(), "lost _key in {item}");
        }
        assert_eq!(written[1]["icon"], json!("simple-icons:docker"));
    }

    #[test]
    fn dry_run_skips_the_write() {
        let mut store = MockStore::with_lists(json!([]), json!([{"name": "كافكا"}]));
        let report = run_repair(
            &mut store,
            &scope(),
            &FallbackTable::builtin(),
            &RepairOptions {
                dry_run: true,
                overwrite_existing: false,
            },
        )
        .expect("dry run");

        assert!(report.dry_run);
        assert!(report.write.is_none());
        assert!(!report.write_succeeded());
        assert!(store.writes.is_empty());
        assert_eq!(report.resolutions[0].icon, "simple-icons:apachekafka");
        assert_eq!(report.request_count, 2);
        assert!(report.ensure_written().is_ok());
    }

    #[test]
    fn rejected_write_is_reported_with_body() {
        let mut store = MockStore::with_lists(json!([]), json!([{"name": "x"}]));
        store.write_status = 403;
        store.write_body = r#"{"error":"Forbidden"}"#.to_string();

        let report = run_repair(
            &mut store,
            &scope(),
            &FallbackTable::builtin(),
            &RepairOptions::default(),
        )
        .expect("repair returns report");

        let write = report.write.as_ref().expect("write attempted");
        assert_eq!(write.status, 403);
        assert!(write.body.contains("Forbidden"));
        assert!(!report.write_succeeded());

        let error = report.ensure_written().expect_err("rejected write must fail");
        let rendered = error.to_string();
        assert!(rendered.contains("doc-ar rejected with HTTP 403"));
        assert!(rendered.contains("Forbidden"));
    }

    #[test]
    fn created_status_counts_as_written() {
        let mut store = MockStore::with_lists(json!([]), json!([{"name": "x"}]));
        store.write_status = 201;

        let report = run_repair(
            &mut store,
            &scope(),
            &FallbackTable::builtin(),
            &RepairOptions::default(),
        )
        .expect("repair");

        assert!(report.write_succeeded());
        assert!(report.ensure_written().is_ok());
    }

    #[test]
    fn missing_target_document_is_an_error() {
        let mut store = MockStore::with_lists(json!([]), json!([]));
        store.documents.remove("ar");

        let error = run_repair(
            &mut store,
            &scope(),
            &FallbackTable::builtin(),
            &RepairOptions::default(),
        )
        .expect_err("must fail");
        assert!(format!("{error:#}").contains("no `ar` document"));
        assert!(store.writes.is_empty());
    }

    #[test]
    fn read_failures_propagate() {
        let mut store = MockStore::with_lists(json!([]), json!([]));
        store.fail_reads = true;
        let error = inspect_with_store(&mut store, &scope()).expect_err("must fail");
        let rendered = format!("{error:#}");
        assert!(rendered.contains("failed to query `en` tech stack"));
        assert!(rendered.contains("connection refused"));
    }

    #[test]
    fn overwrite_existing_prefers_source_match_but_not_table() {
        let source = vec![Item::with_icon("Apache Kafka", "simple-icons:apachekafka")];
        let mut target = vec![
            Item::with_icon("Kafka", "old:kafka"),
            Item::with_icon("بايثون", "old:python"),
        ];

        let untouched = fill_icons(&mut target.clone(), &source, &FallbackTable::builtin(), false);
        assert!(
            untouched
                .iter()
                .all(|resolution| resolution.kind == ResolutionKind::Kept)
        );

        let resolutions = fill_icons(&mut target, &source, &FallbackTable::builtin(), true);
        assert_eq!(resolutions[0].kind, ResolutionKind::Containment);
        assert_eq!(target[0].icon.as_deref(), Some("simple-icons:apachekafka"));
        assert_eq!(resolutions[1].kind, ResolutionKind::Kept);
        assert_eq!(target[1].icon.as_deref(), Some("old:python"));
    }

    #[test]
    fn inspect_returns_both_lists_without_writing() {
        let mut store = MockStore::with_lists(
            json!([{"name": "Docker", "icon": "simple-icons:docker"}]),
            json!([{"name": "عامل ميناء"}]),
        );
        let report = inspect_with_store(&mut store, &scope()).expect("inspect");
        assert_eq!(report.source.len(), 1);
        assert_eq!(report.target[0].name, "عامل ميناء");
        assert!(store.writes.is_empty());
    }
}
