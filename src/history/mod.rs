/// History store: owns the append-style log of recorded interactions and
/// their at-most-once feedback.

mod store;

pub use store::HistoryStore;
