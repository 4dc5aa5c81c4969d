//! Authoritative pet storage, the server-side pet actions built on it, and
//! the hosted checkout flow that grants paid access.

mod error;
mod record;
mod traits;

pub mod actions;
pub mod conformance;
pub mod memory;
pub mod payment;

pub use actions::{ActionError, ErrorKind, PetActions, PetService};
pub use error::StorageError;
pub use memory::{InMemoryPetStorage, InMemoryUserDirectory, StaticSession};
pub use payment::{CheckoutConfig, CheckoutProvider, HostedCheckout, PaymentError};
pub use record::{CheckoutSession, UserIdentity};
pub use traits::{PetStorage, SessionProvider, UserDirectory};
