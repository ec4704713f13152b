//! Transfer identifier generation

use uuid::Uuid;

/// Source of opaque, unique transfer ids
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn new_id(&self) -> String {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::{IdGenerator, UuidIds};
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| UuidIds.new_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
