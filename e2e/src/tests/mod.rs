//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by route. Each test:
/// 1. Queues a mock provider response
/// 2. Sends a request to the REAL proxy
/// 3. Validates the response and what the provider received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Copilot ───────────────────────────────────────────────────────────
        test!(
            "copilot/completion",
            "Caller key: completion text returned as JSON",
            copilot::test_completion
        ),
        test!(
            "copilot/request_shape",
            "Provider gets max_tokens 50 and temperature 0.7, no stream",
            copilot::test_request_shape
        ),
        test!(
            "copilot/missing_key",
            "No key anywhere: 401, provider never called",
            copilot::test_missing_key
        ),
        test!(
            "copilot/provider_error",
            "Provider failure maps to generic 500",
            copilot::test_provider_error
        ),
        test!(
            "copilot/client_abort",
            "Client timeout mid-request leaves proxy serving",
            copilot::test_client_abort
        ),

        // ── Command ───────────────────────────────────────────────────────────
        test!(
            "command/stream_order",
            "Streamed deltas are relayed in provider order with finish part",
            command::test_stream_order
        ),
        test!(
            "command/request_shape",
            "Provider gets stream:true and max_tokens 2048",
            command::test_request_shape
        ),
        test!(
            "command/missing_key",
            "No key anywhere: 401, provider never called",
            command::test_missing_key
        ),
        test!(
            "command/provider_error",
            "Provider rejection before streaming maps to generic 500",
            command::test_provider_error
        ),
        test!(
            "command/invalid_body",
            "Malformed body: 400, provider never called",
            command::test_invalid_body
        ),
    ]
}
