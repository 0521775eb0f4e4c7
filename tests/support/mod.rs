#![allow(dead_code)]

use std::sync::Arc;

use intentwise::persistence::{MemoryStore, PersistentStore};
use intentwise::{CategorySchema, CategorySpec, IntentService, ServiceConfig};

pub fn pricing_contact_schema() -> CategorySchema {
    CategorySchema::new()
        .with_category(
            "pricing",
            CategorySpec {
                keywords: vec!["price".into(), "cost".into()],
                responses: vec!["Contact us for a quote.".into()],
                follow_up: None,
            },
        )
        .with_category(
            "contact",
            CategorySpec {
                keywords: vec!["email".into(), "phone".into()],
                responses: vec!["Reach us at contact@example.com.".into()],
                follow_up: None,
            },
        )
}

pub fn open_service(store: Arc<dyn PersistentStore>) -> IntentService {
    IntentService::open(ServiceConfig::default(), store).expect("open service")
}

pub fn memory_service() -> (Arc<MemoryStore>, IntentService) {
    let store = Arc::new(MemoryStore::new());
    let service = open_service(store.clone());
    (store, service)
}
