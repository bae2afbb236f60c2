use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::key::{Interner, KeyId};
use crate::metrics::{MetricHandle, MetricKind, Sample};
use crate::snapshot::{SeriesSnapshot, Snapshot};
use crate::tags::TagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(u32);

#[derive(Debug)]
struct MetricDef {
    name: KeyId,
}

#[derive(Debug)]
struct MetricSeries {
    name: Arc<str>,
    kind: MetricKind,
    series: DashMap<TagSet, MetricHandle>,
}

/// Thread-safe store of every metric series observed during a run.
///
/// A metric keeps the kind it was first registered with. Later samples for the same name
/// are applied to that kind.
#[derive(Debug, Default)]
pub struct Registry {
    interner: Interner,
    defs: RwLock<Vec<MetricDef>>,
    storage: DashMap<MetricId, MetricSeries>,
}

impl Registry {
    pub fn register(&self, name: &str, kind: MetricKind) -> MetricId {
        let name_id = self.interner.get_or_intern(name);

        if let Some(idx) = self.defs.read().iter().position(|d| d.name == name_id) {
            return MetricId(idx as u32);
        }

        let mut defs = self.defs.write();
        if let Some(idx) = defs.iter().position(|d| d.name == name_id) {
            return MetricId(idx as u32);
        }

        let id = MetricId(defs.len() as u32);
        defs.push(MetricDef { name: name_id });
        self.storage.insert(
            id,
            MetricSeries {
                name: Arc::from(name),
                kind,
                series: DashMap::new(),
            },
        );
        id
    }

    pub fn kind(&self, metric: MetricId) -> Option<MetricKind> {
        self.storage.get(&metric).map(|m| m.kind)
    }

    pub fn resolve_tags(&self, tags: &[(&str, &str)]) -> TagSet {
        TagSet::from_pairs(tags.iter().map(|(k, v)| {
            (
                self.interner.get_or_intern(k),
                self.interner.get_or_intern(v),
            )
        }))
    }

    /// Returns the write handle for one series, creating the series on first use.
    ///
    /// `None` only for an id that was not issued by this registry.
    pub fn handle(&self, metric: MetricId, tags: &[(&str, &str)]) -> Option<MetricHandle> {
        let tags = self.resolve_tags(tags);
        self.handle_for(metric, tags)
    }

    pub fn handle_for(&self, metric: MetricId, tags: TagSet) -> Option<MetricHandle> {
        let metric = self.storage.get(&metric)?;

        if let Some(handle) = metric.series.get(&tags) {
            return Some(handle.value().clone());
        }

        let kind = metric.kind;
        let handle = metric
            .series
            .entry(tags)
            .or_insert_with(|| MetricHandle::new(kind))
            .value()
            .clone();
        Some(handle)
    }

    pub fn record(&self, sample: Sample<'_>) {
        let id = self.register(sample.metric, sample.kind);
        if let Some(handle) = self.handle(id, sample.tags) {
            handle.record(sample.value);
        }
    }

    /// Copies every series. Each series is locked only while its own value is copied.
    pub fn snapshot(&self, elapsed: Duration) -> Snapshot {
        let mut out = Vec::new();

        for metric in self.storage.iter() {
            for series in metric.series.iter() {
                let mut tags: Vec<(Arc<str>, Arc<str>)> = series
                    .key()
                    .iter()
                    .filter_map(|(k, v)| {
                        Some((self.interner.resolve(k)?, self.interner.resolve(v)?))
                    })
                    .collect();
                tags.sort_by(|a, b| a.0.cmp(&b.0));

                out.push(SeriesSnapshot {
                    name: metric.name.clone(),
                    kind: metric.kind,
                    tags,
                    value: series.value().load(),
                });
            }
        }

        Snapshot::new(elapsed, out)
    }
}
