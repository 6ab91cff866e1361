pub mod client;
pub mod config;
pub mod editor;
pub mod field_value;
pub mod grouping;
pub mod result_cache;
pub mod search;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::{GeoNamesClient, GeoNamesConfig, LookupKind, PostcodeLookup};
pub use config::{PluginConfiguration, SettingsForm, normalize_country};
pub use editor::FieldEditor;
pub use field_value::{FieldSlot, MemoryFieldSlot, decode, decode_str, encode, persist_selection};
pub use grouping::{group_for_display, selection_for_display};
pub use result_cache::ResultCache;
pub use search::{is_searchable, merge_ranked, search, search_local};
pub use types::{DisplayOption, PostalRecord};
