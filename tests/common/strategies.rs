use proptest::prelude::*;

/// Input stream lengths, including the empty stream
pub fn stream_length_strategy() -> impl Strategy<Value = u32> {
    0u32..60
}

/// Item-count checkpoint thresholds
pub fn item_count_strategy() -> impl Strategy<Value = u32> {
    1u32..12
}

/// Failure type lineages of one to four generic names, most specific first
pub fn lineage_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,3}_error", 1..5).prop_filter("distinct names", |names| {
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        sorted.len() == names.len()
    })
}
