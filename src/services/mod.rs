//! Background services and shared server state.

pub mod accounts;
pub mod session_registry;
pub mod session_sweeper;

pub use accounts::{ProvisionedAccount, create_account};
pub use session_registry::SessionRegistry;
pub use session_sweeper::{SweeperConfig, start_session_sweeper};
