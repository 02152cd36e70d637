//! Scaffolding shared by the record tests

use std::hash::{DefaultHasher, Hash, Hasher};

pub fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut state = DefaultHasher::new();
    value.hash(&mut state);
    state.finish()
}
