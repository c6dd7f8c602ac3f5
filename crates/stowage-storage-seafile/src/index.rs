use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::types::Library;

/// Immutable name → library lookup built from one `api2/repos` listing.
///
/// When two libraries share a name the later one in the listing wins.
#[derive(Debug, Default)]
pub(crate) struct LibraryIndex {
    libraries: Vec<Library>,
    by_name: HashMap<String, usize>,
}

impl LibraryIndex {
    pub fn build(libraries: Vec<Library>) -> Self {
        let by_name = libraries
            .iter()
            .enumerate()
            .map(|(i, lib)| (lib.name.clone(), i))
            .collect();
        Self { libraries, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Library> {
        self.by_name.get(name).map(|&i| &self.libraries[i])
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }
}

/// Holder that hands out consistent snapshots and swaps in rebuilt indexes.
#[derive(Debug, Default)]
pub(crate) struct IndexCell {
    current: RwLock<Arc<LibraryIndex>>,
}

impl IndexCell {
    pub fn snapshot(&self) -> Arc<LibraryIndex> {
        self.current.read().expect("library index poisoned").clone()
    }

    pub fn replace(&self, index: LibraryIndex) -> Arc<LibraryIndex> {
        let index = Arc::new(index);
        *self.current.write().expect("library index poisoned") = Arc::clone(&index);
        index
    }
}
