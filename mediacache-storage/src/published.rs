//! Read-only view of resolved media for callers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use mediacache_core::{fields, CacheValues, MediaId, MediaKey, ValueOrigin, DATE_FORMAT};
use uuid::Uuid;

/// Index bookkeeping fields that are neither system fields nor properties.
const INDEX_FIELDS: [&str; 4] = [
    fields::INDEX_NODE_ID,
    fields::LEGACY_NODE_ID,
    fields::INDEX_PATH,
    "__IndexType",
];

fn is_property_key(key: &str) -> bool {
    !fields::SYSTEM
        .iter()
        .chain(INDEX_FIELDS.iter())
        .any(|system| system.eq_ignore_ascii_case(key))
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// A media item as handed out to callers.
///
/// Wraps the cached [`CacheValues`] without copying them.
#[derive(Debug, Clone)]
pub struct PublishedMedia {
    values: CacheValues,
}

impl From<CacheValues> for PublishedMedia {
    fn from(values: CacheValues) -> Self {
        Self::new(values)
    }
}

impl PublishedMedia {
    pub fn new(values: CacheValues) -> Self {
        Self { values }
    }

    pub fn cache_values(&self) -> &CacheValues {
        &self.values
    }

    pub fn origin(&self) -> ValueOrigin {
        self.values.origin()
    }

    fn int(&self, key: &str) -> Option<i32> {
        self.values.values().get(key).and_then(|v| v.trim().parse().ok())
    }

    fn text(&self, key: &str) -> &str {
        self.values.values().get(key).unwrap_or("")
    }

    pub fn id(&self) -> Option<MediaId> {
        self.values.id()
    }

    /// The unique key. Media stored before keys existed report the nil uuid.
    pub fn key(&self) -> Option<MediaKey> {
        self.values
            .values()
            .get(fields::KEY)
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
    }

    pub fn parent_id(&self) -> Option<MediaId> {
        self.int(fields::PARENT_ID)
    }

    pub fn level(&self) -> Option<i32> {
        self.int(fields::LEVEL)
    }

    pub fn sort_order(&self) -> Option<i32> {
        self.int(fields::SORT_ORDER)
    }

    pub fn path(&self) -> &str {
        self.values.values().stored_path()
    }

    pub fn name(&self) -> &str {
        self.text(fields::NODE_NAME)
    }

    pub fn node_type_alias(&self) -> &str {
        self.text(fields::NODE_TYPE_ALIAS)
    }

    pub fn create_date(&self) -> Option<DateTime<Utc>> {
        self.values.values().get(fields::CREATE_DATE).and_then(parse_date)
    }

    pub fn update_date(&self) -> Option<DateTime<Utc>> {
        self.values.values().get(fields::UPDATE_DATE).and_then(parse_date)
    }

    /// User-defined properties in stored order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.values().iter().filter(|(k, _)| is_property_key(k))
    }

    fn find_property(&self, alias: &str) -> Option<&str> {
        if !is_property_key(alias) {
            return None;
        }
        self.values.values().get_ignore_case(alias)
    }

    /// Look up a property by alias, ignoring case.
    ///
    /// Values read from the search index may also be stored in raw form
    /// under `__Raw_<alias>`; the raw value wins when present. The raw form
    /// alone does not make a property exist.
    pub fn property(&self, alias: &str) -> Option<&str> {
        let plain = self.find_property(alias)?;
        if self.values.is_search_indexed() {
            let raw_alias = format!("{}{}", fields::RAW_PREFIX, alias);
            if let Some(raw) = self.find_property(&raw_alias) {
                return Some(raw);
            }
        }
        Some(plain)
    }

    pub fn has_property(&self, alias: &str) -> bool {
        self.find_property(alias).is_some()
    }
}
