//! Proptest strategies for bridge inputs.

use proptest::prelude::*;

/// Arbitrary binary payloads, including empty ones
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Partition keys as Kinesis accepts them (1 to 256 characters)
pub fn partition_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,64}"
}

/// Outcome script for a run of requests: `true` succeeds, `false` fails
pub fn outcome_script_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..16)
}
