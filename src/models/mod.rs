mod account;
mod analytics;
mod group;
mod snapshot;
mod user;

pub use account::*;
pub use analytics::*;
pub use group::*;
pub use snapshot::*;
pub use user::*;
