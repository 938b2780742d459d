//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random notes and workloads that
//! maintain required invariants.

use crate::fixtures::{Note, NoteKind};
use proptest::prelude::*;

/// Strategy for generating note kinds.
pub fn note_kind_strategy() -> impl Strategy<Value = NoteKind> {
    prop_oneof![Just(NoteKind::Notice), Just(NoteKind::Reminder)]
}

/// Strategy for generating unsaved notes.
pub fn note_strategy() -> impl Strategy<Value = Note> {
    (
        note_kind_strategy(),
        prop::string::string_regex("[ -~]{0,64}").expect("invalid regex"),
        any::<bool>(),
    )
        .prop_map(|(kind, message, available)| Note::new(kind, &message, available))
}

/// Strategy for generating a batch of unsaved notes.
pub fn note_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<Note>> {
    prop::collection::vec(note_strategy(), 0..max_len)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to a proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
