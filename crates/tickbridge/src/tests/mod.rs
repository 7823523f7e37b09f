//! Test suites for the bridge.

pub(crate) mod support;
