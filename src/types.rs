use indexmap::{IndexMap, IndexSet};
use fxhash::{FxHashMap, FxBuildHasher};

pub type StrHashMap<'a, T> = FxHashMap::<&'a str, T>;

pub type StrIndexSet<'a> = IndexSet::<&'a str, FxBuildHasher>;
pub type StrIndexMap<'a, T> = IndexMap::<&'a str, T, FxBuildHasher>;
