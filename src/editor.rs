//! Field editor session: the calls a select-input UI makes against the picker.

use crate::client::PostcodeLookup;
use crate::config::PluginConfiguration;
use crate::field_value::{self, FieldSlot};
use crate::grouping::{group_for_display, selection_for_display};
use crate::result_cache::ResultCache;
use crate::search::{self, is_searchable};
use crate::types::DisplayOption;

/// Binds a configuration, a lookup backend and a field slot together.
///
/// Holds no UI state; every call reads the slot or queries the backend afresh.
pub struct FieldEditor<L, S> {
    config: PluginConfiguration,
    backend: L,
    cache: ResultCache,
    slot: S,
}

impl<L: PostcodeLookup, S: FieldSlot> FieldEditor<L, S> {
    /// Uses the process-wide result cache.
    pub fn new(config: &PluginConfiguration, backend: L, slot: S) -> Self {
        Self {
            config: config.normalized(),
            backend,
            cache: ResultCache::global().clone(),
            slot,
        }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &PluginConfiguration {
        &self.config
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Options for what the editor has typed so far
    pub async fn load_options(&self, input: &str) -> Vec<DisplayOption> {
        if !is_searchable(input) {
            return Vec::new();
        }

        let records = search::search(
            &self.backend,
            &self.cache,
            input,
            self.config.username(),
            &self.config.country(),
        )
        .await;

        group_for_display(&records, self.config.group_cities_by_postcode())
    }

    /// Options for what is currently stored in the field
    pub fn selected_options(&self) -> Vec<DisplayOption> {
        let records = field_value::decode(&self.slot.read());
        selection_for_display(&records, self.config.group_cities_by_postcode())
    }

    /// Store the new selection. Returns false when the host rejected the write.
    pub async fn handle_change(&self, options: &[DisplayOption]) -> bool {
        field_value::persist_selection(&self.slot, options).await
    }

    pub fn placeholder(&self) -> String {
        format!(
            "Type to search postcodes or cities in {}...",
            self.config.country()
        )
    }

    pub fn no_options_message(input: &str) -> &'static str {
        if !is_searchable(input) {
            "Type at least 2 characters to search"
        } else {
            "No results found"
        }
    }
}
