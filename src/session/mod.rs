//! Client session state: who is signed in, their profile, and where the
//! application should route them.

pub mod controller;
pub mod events;
pub mod state;
pub mod view;

pub use controller::{LoginOutcome, SessionController, SignUpOutcome, SignUpRequest};
pub use events::{Navigation, Notice, NoticeLevel, SessionEvent, SessionEvents};
pub use state::{SessionSnapshot, SessionState};
pub use view::{View, select_view};
