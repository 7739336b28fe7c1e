//! Stage version-compatibility matrix (Open Question #2, SPEC_FULL.md §9).
//!
//! A greenfield implementation has exactly one schema generation per stage,
//! so every producer currently emits and accepts only `"1.0.0"`. The table
//! is centralized here, rather than asserted ad hoc at each call site, so a
//! future schema bump has one place to update.

use crate::envelope::Producer;

/// Versions a given producer's consumers currently accept.
#[must_use]
pub fn compatible_versions_for(producer: Producer) -> Vec<String> {
    match producer {
        Producer::Plan | Producer::Scaffold | Producer::Section | Producer::Assemble => {
            vec!["1.0.0".to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_producer_has_a_non_empty_entry() {
        for producer in [
            Producer::Plan,
            Producer::Scaffold,
            Producer::Section,
            Producer::Assemble,
        ] {
            assert!(!compatible_versions_for(producer).is_empty());
        }
    }
}
