use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

pub type HashMap<K, V> = FxHashMap<K, V>;

pub type HashSet<K> = FxHashSet<K>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeuronType {
    Input,
    #[default]
    Hidden,
    Output,
}
