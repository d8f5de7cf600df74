mod accounts;
mod groups;
mod snapshots;
mod users;

pub use accounts::*;
pub use groups::*;
pub use snapshots::*;
pub use users::*;
