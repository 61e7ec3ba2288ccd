use std::sync::Arc;

use proptest::prelude::*;

use movemint::session::{SESSION_KEY, SessionService};
use movemint::storage::{KeyValueStore, MemoryStore};

proptest! {
    #[test]
    fn arbitrary_stored_text_never_panics(raw in ".{0,200}") {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_KEY, &raw).unwrap();
        let service = SessionService::with_store(store.clone());

        if service.load_session().is_none() {
            // unreadable values are cleaned up
            prop_assert!(store.get(SESSION_KEY).unwrap().is_none());
        }
    }

    #[test]
    fn truncated_session_reads_as_none(cut in 1_usize..60) {
        let store = Arc::new(MemoryStore::new());
        let service = SessionService::with_store(store.clone());
        service.start_session().unwrap();
        let raw = store.get(SESSION_KEY).unwrap().unwrap();
        let cut = cut.min(raw.len() - 1);
        store.set(SESSION_KEY, &raw[..cut]).unwrap();

        prop_assert!(service.load_session().is_none());
        prop_assert!(!service.has_active_session());
    }
}
