mod load_snapshot;
pub use load_snapshot::LoadSnapshot;

mod load_window;
pub use load_window::LoadWindow;

mod metadata;
pub use metadata::Metadata;

mod task_outcome;
pub use task_outcome::TaskOutcome;
