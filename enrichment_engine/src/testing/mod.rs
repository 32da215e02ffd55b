//! Stub and recording implementations of the domain ports, used by this
//! crate's own unit tests and by the end-to-end scenario tests under
//! `tests/`. Kept as a normal (not `#[cfg(test)]`) module so integration
//! test binaries, which compile the library as an ordinary dependency, can
//! reach it too.

mod clock;
mod kb;
mod ner;
mod pattern;

pub use clock::FixedClock;
pub use kb::{FakeKbProvider, KbLookupBehavior};
pub use ner::FakeNerModel;
pub use pattern::FakePatternMatcher;
