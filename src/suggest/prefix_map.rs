/// Key-ordered multimap supporting prefix-range queries.
///
/// Entries live in a vector sorted by key. Keys sharing a prefix are
/// contiguous in byte order, so a prefix query is one binary search for the
/// lower bound followed by a forward scan that stops at the first key
/// without the prefix. Duplicate keys are stored as separate entries in
/// insertion order.
#[derive(Debug, Clone)]
pub struct PrefixMap<V> {
    entries: Vec<Entry<V>>,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    key: String,
    value: V,
}

impl<V> Default for PrefixMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PrefixMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert an entry after any existing entries with the same key.
    /// Returns the new number of entries.
    pub fn insert(&mut self, key: &str, value: V) -> usize {
        let idx = self.entries.partition_point(|e| e.key.as_str() <= key);
        self.entries.insert(
            idx,
            Entry {
                key: key.to_string(),
                value,
            },
        );
        self.entries.len()
    }

    /// Get one entry with exactly this key (the first inserted, if several).
    pub fn get(&self, key: &str) -> Option<&V> {
        let idx = self.lower_bound(key);
        self.entries
            .get(idx)
            .filter(|e| e.key == key)
            .map(|e| &e.value)
    }

    /// Mutable variant of `get()`, for callers that treat values as buckets.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let idx = self.lower_bound(key);
        self.entries
            .get_mut(idx)
            .filter(|e| e.key == key)
            .map(|e| &mut e.value)
    }

    /// Every entry whose key starts with `prefix`, in key order.
    pub fn find_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a V)> {
        let start = self.lower_bound(prefix);
        self.entries[start..]
            .iter()
            .take_while(move |e| e.key.starts_with(prefix))
            .map(|e| (e.key.as_str(), &e.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lower_bound(&self, key: &str) -> usize {
        self.entries.partition_point(|e| e.key.as_str() < key)
    }
}
