/// Upstream data sources.
///
/// Each provider gets its own file; `fixtures` holds captured response
/// payloads for parser tests.

pub mod meteomatics;

#[cfg(test)]
pub(crate) mod fixtures;
