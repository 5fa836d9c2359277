use uuid::Uuid;

use crate::stopwatch::StopwatchId;

/// Source of stopwatch identifiers. Injected at build time so embedders
/// can supply deterministic ids in tests or shorter ids for URLs.
pub trait IdSource: Send + Sync {
    fn generate(&self) -> StopwatchId;
}

/// Default id source, random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn generate(&self) -> StopwatchId {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.generate(), ids.generate());
    }
}
