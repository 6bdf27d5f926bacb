//! In-memory stand-ins for the external search tools, plus a harness that
//! wires them into kit construction.

pub mod harness;
pub mod mock;

pub use harness::KitHarness;
pub use mock::{domain_hit, MockProfileSearch, MockSearch, ProfileCall, SearchCall};
