use hashbrown::HashMap;

/// Secondary index from key to positions in the log's insertion order.
pub type PosIndex<K> = HashMap<K, Vec<usize>>;
