// Service exports
pub mod appwrite;
pub mod memory;
pub mod notifier;
pub mod store;

pub use appwrite::{AppwriteError, AppwriteProfileStore};
pub use memory::InMemoryProfileStore;
pub use notifier::{MatchNotifier, NotifyError, TracingNotifier};
pub use store::{ProfileStore, StoreError};
