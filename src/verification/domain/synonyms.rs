//! Canonical keywords and the labels accepted as evidence for them.

use std::collections::BTreeMap;

/// Built-in keyword table, grouped loosely by area of daily life.
const DEFAULT_ENTRIES: &[(&str, &[&str])] = &[
    ("kitchen", &["stove", "sink", "cookware", "pot", "pan", "cabinet", "counter", "kettle"]),
    ("sink", &["basin", "faucet", "tap", "washbasin"]),
    ("dishes", &["plate", "bowl", "cup", "tableware", "dish rack", "chopsticks"]),
    ("fridge", &["refrigerator", "freezer", "ice box"]),
    ("bathroom", &["toilet", "bathtub", "shower", "towel", "tile", "mirror"]),
    ("toilet", &["lavatory", "flush", "toilet seat"]),
    ("shower", &["shower head", "bathtub", "curtain"]),
    ("teeth", &["toothbrush", "toothpaste", "mouthwash", "floss"]),
    ("bedroom", &["bed", "pillow", "quilt", "blanket", "mattress"]),
    ("bed", &["pillow", "duvet", "sheet", "mattress", "bedding"]),
    ("wardrobe", &["closet", "hanger", "clothes", "dresser"]),
    ("laundry", &["washing machine", "clothes", "detergent", "laundry basket", "drying rack"]),
    ("living room", &["sofa", "couch", "television", "coffee table", "carpet"]),
    ("sofa", &["couch", "cushion", "armchair"]),
    ("desk", &["table", "chair", "lamp", "stationery", "workstation"]),
    ("computer", &["laptop", "monitor", "screen", "keyboard", "mouse"]),
    ("keyboard", &["keys", "typing", "laptop"]),
    ("gym", &["treadmill", "dumbbell", "barbell", "fitness", "exercise machine"]),
    ("treadmill", &["running machine", "fitness", "exercise"]),
    ("dumbbell", &["weights", "barbell", "kettlebell"]),
    ("yoga", &["yoga mat", "stretching", "mat"]),
    ("running", &["sneakers", "running shoes", "track", "jogging", "road"]),
    ("book", &["page", "novel", "textbook", "bookshelf", "reading"]),
    ("notebook", &["notes", "paper", "pen", "pencil", "handwriting"]),
    ("study", &["book", "notebook", "desk", "pen", "homework"]),
    ("dog", &["puppy", "leash", "pet", "dog food"]),
    ("litter box", &["cat litter", "cat", "scoop"]),
    ("broom", &["sweeping", "dustpan", "floor"]),
    ("mop", &["bucket", "floor", "mopping"]),
    ("vacuum", &["vacuum cleaner", "robot vacuum", "carpet", "floor"]),
    ("trash", &["garbage", "rubbish", "bin", "garbage bag", "waste"]),
    ("food", &["meal", "dish", "rice", "noodles", "bread", "plate"]),
    ("fruit", &["apple", "banana", "orange", "grape", "strawberry"]),
    ("vegetable", &["carrot", "tomato", "lettuce", "cabbage", "potato"]),
    ("plant", &["flower", "pot plant", "leaf", "watering can", "succulent"]),
];

/// Mapping from canonical keyword to the labels accepted as evidence for it.
///
/// Keywords are stored lower-cased. Each label list preserves insertion order
/// and holds no duplicates. The table only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSynonymTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl KeywordSynonymTable {
    /// Creates an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a table holding the built-in keywords.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (keyword, labels) in DEFAULT_ENTRIES {
            table.extend(keyword, labels.iter().copied());
        }
        table
    }

    /// Adds `keyword` if absent and appends any labels it does not yet list.
    pub fn extend<I, S>(&mut self, keyword: &str, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = normalize(keyword);
        if canonical.is_empty() {
            return;
        }
        let entry = self.entries.entry(canonical).or_default();
        for label in labels {
            let normalized = normalize(label.as_ref());
            if !normalized.is_empty() && !entry.contains(&normalized) {
                entry.push(normalized);
            }
        }
    }

    /// Returns `true` when `keyword` is a canonical keyword.
    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(&normalize(keyword))
    }

    /// Returns the labels listed for `keyword`, empty when unknown.
    #[must_use]
    pub fn synonyms(&self, keyword: &str) -> &[String] {
        self.entries
            .get(&normalize(keyword))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the keyword itself followed by its synonyms.
    #[must_use]
    pub fn candidates(&self, keyword: &str) -> Vec<String> {
        let canonical = normalize(keyword);
        let mut candidates = vec![canonical.clone()];
        candidates.extend(
            self.synonyms(&canonical)
                .iter()
                .filter(|label| **label != canonical)
                .cloned(),
        );
        candidates
    }

    /// Lists canonical keywords in lexical order.
    pub fn supported_keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of canonical keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no keywords are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
