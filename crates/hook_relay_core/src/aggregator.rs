//! Result aggregation.

use std::collections::BTreeMap;

use crate::executor::ExecutionResult;

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;

/// What a completed dispatch reports back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookReport {
    /// Hooks ran; details withheld
    Done,
    /// Per-hook results, ordered by hook name
    Details(BTreeMap<String, ExecutionResult>),
}

/// Builds the report for a finished batch.
///
/// Details are only included when the deployment opts in with
/// `return_scripts_info`; otherwise the sender only learns that hooks ran.
pub fn aggregate(results: BTreeMap<String, ExecutionResult>, return_scripts_info: bool) -> HookReport {
    if return_scripts_info {
        HookReport::Details(results)
    } else {
        HookReport::Done
    }
}
