//! Shared daemon state.

mod gate;
mod peers;

pub use gate::Gate;

#[cfg(test)]
pub(crate) use gate::test_support;
