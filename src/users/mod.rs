/// Credential store: owns user identity records and enforces the
/// unique-email and admin-ceiling invariants.

mod store;

pub use store::{UserStore, MAX_ADMINS};
