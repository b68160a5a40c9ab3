#[cfg(feature = "subscriber")]
mod journal;
#[cfg(feature = "subscriber")]
pub use journal::Journal;
