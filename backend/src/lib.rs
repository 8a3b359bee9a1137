//! Dead man's switch for on-chain inheritance.
//!
//! An owner registers a will, names beneficiaries with percentage shares, funds
//! it and keeps it alive by checking in. Once the owner has been silent for the
//! whole inactivity period, anyone may trigger distribution of the balance.

pub mod api;
pub mod authority;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod mirror;
pub mod telemetry;
pub mod will;

pub use api::{create_app, AppState};
pub use authority::{Authority, HttpAuthority, LocalAuthority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::WillError;
pub use events::{EventSink, OutcomeEvent, OutcomeKind};
pub use mirror::WillMirror;
