//! Per-family bookkeeping of the charts and dimensions a job has registered.

use std::collections::{HashMap, HashSet};

use netdata_plugin_charts::ChartHandle;

use crate::split::SummarySplit;

/// What a job knows about one metric family.
#[derive(Debug)]
pub struct CacheEntry {
    split: SummarySplit,
    charts: HashMap<String, ChartHandle>,
    dims: HashSet<String>,
}

impl CacheEntry {
    pub fn new(split: SummarySplit) -> Self {
        Self {
            split,
            charts: HashMap::new(),
            dims: HashSet::new(),
        }
    }

    pub fn split(&self) -> &SummarySplit {
        &self.split
    }

    pub fn has_chart(&self, chart_id: &str) -> bool {
        self.charts.contains_key(chart_id)
    }

    pub fn get_chart(&self, chart_id: &str) -> Option<ChartHandle> {
        self.charts.get(chart_id).copied()
    }

    pub fn put_chart(&mut self, chart_id: impl Into<String>, handle: ChartHandle) {
        self.charts.insert(chart_id.into(), handle);
    }

    pub fn remove_chart(&mut self, chart_id: &str) -> Option<ChartHandle> {
        self.charts.remove(chart_id)
    }

    pub fn charts(&self) -> impl Iterator<Item = (&str, ChartHandle)> {
        self.charts.iter().map(|(id, handle)| (id.as_str(), *handle))
    }

    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }

    pub fn has_dim(&self, dim_id: &str) -> bool {
        self.dims.contains(dim_id)
    }

    pub fn put_dim(&mut self, dim_id: impl Into<String>) {
        self.dims.insert(dim_id.into());
    }

    pub fn remove_dim(&mut self, dim_id: &str) -> bool {
        self.dims.remove(dim_id)
    }

    /// Forget every dimension of `chart_id`. Returns how many were dropped.
    pub fn remove_chart_dims(&mut self, chart_id: &str) -> usize {
        let prefix = SummarySplit::dim_prefix(chart_id);
        let before = self.dims.len();
        self.dims.retain(|dim_id| !dim_id.starts_with(&prefix));
        before - self.dims.len()
    }

    pub fn dim_count(&self) -> usize {
        self.dims.len()
    }
}

/// Family name to [`CacheEntry`]. Owned by exactly one job.
#[derive(Debug, Default)]
pub struct Cache {
    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, family: &str) -> bool {
        self.entries.contains_key(family)
    }

    pub fn get(&self, family: &str) -> Option<&CacheEntry> {
        self.entries.get(family)
    }

    pub fn get_mut(&mut self, family: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(family)
    }

    /// Insert or replace the entry of a family.
    pub fn put(&mut self, family: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(family.into(), entry);
    }

    /// The family's entry, created with `make` if it does not exist yet.
    pub fn get_or_insert_with(
        &mut self,
        family: &str,
        make: impl FnOnce() -> CacheEntry,
    ) -> &mut CacheEntry {
        self.entries
            .entry(family.to_string())
            .or_insert_with(make)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_with_creates_once() {
        let mut cache = Cache::new();
        let mut calls = 0;

        cache.get_or_insert_with("rpc", || {
            calls += 1;
            CacheEntry::new(SummarySplit::default())
        });
        cache.get_or_insert_with("rpc", || {
            calls += 1;
            CacheEntry::new(SummarySplit::default())
        });

        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("rpc"));
    }

    #[test]
    fn test_put_replaces_entry() {
        let mut cache = Cache::new();
        let mut entry = CacheEntry::new(SummarySplit::default());
        entry.put_dim("rpc#0.5");
        cache.put("rpc", entry);
        cache.put("rpc", CacheEntry::new(SummarySplit::default()));

        assert_eq!(cache.get("rpc").map(CacheEntry::dim_count), Some(0));
    }

    #[test]
    fn test_chart_ops() {
        let mut entry = CacheEntry::new(SummarySplit::default());
        let handle = ChartHandle::new(0, 0);

        assert!(!entry.has_chart("rpc"));
        entry.put_chart("rpc", handle);
        assert!(entry.has_chart("rpc"));
        assert_eq!(entry.get_chart("rpc"), Some(handle));
        assert_eq!(entry.remove_chart("rpc"), Some(handle));
        assert_eq!(entry.remove_chart("rpc"), None);
        assert_eq!(entry.chart_count(), 0);
    }

    #[test]
    fn test_remove_chart_dims_only_touches_that_chart() {
        let mut entry = CacheEntry::new(SummarySplit::default());
        entry.put_dim("rpc,m=GET#0.5");
        entry.put_dim("rpc,m=GET#0.9");
        entry.put_dim("rpc,m=GETX#0.5");
        entry.put_dim("rpc#0.5");

        assert_eq!(entry.remove_chart_dims("rpc,m=GET"), 2);
        assert!(entry.has_dim("rpc,m=GETX#0.5"));
        assert!(entry.has_dim("rpc#0.5"));
        assert_eq!(entry.dim_count(), 2);
    }
}
