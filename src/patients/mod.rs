/// Patient registry: visit records keyed by clinical history id, persisted
/// as JSON in the platform data directory. Browser-grade key-value storage,
/// not a database — one file, rewritten on every save.
pub mod model;
pub mod store;
