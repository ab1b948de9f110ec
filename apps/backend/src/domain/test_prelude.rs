//! Shared proptest configuration for domain property tests.

use proptest::test_runner::Config as ProptestConfig;

/// Keep case counts modest so the suite stays fast in CI.
pub fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    }
}
