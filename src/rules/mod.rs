//! Path-based authorization.
//!
//! Rules map a path prefix, a uid selector and an operation selector to an
//! allow or deny decision. The table is read on every intercepted file
//! operation and written only from the control plane.

pub mod allowlist;
pub mod guard;
pub mod path;
pub mod table;

pub use allowlist::UidAllowlist;
pub use guard::AccessGuard;
pub use table::RuleTable;
