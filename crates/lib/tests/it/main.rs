/*! Integration tests for Converge.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * Every test talks HTTP to in-process axum replicas (see `helpers`):
 * - replica: the HTTP client against both contract profiles
 * - scenario: end-to-end scenario runs, converging and not
 * - metrics: sequential benchmarks
 * - config: configuration files driving real runs
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("converge=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod metrics;
mod replica;
