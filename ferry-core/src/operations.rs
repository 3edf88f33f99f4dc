//! Operation options

use serde::{Deserialize, Serialize};

/// Where the origin of a copy or move currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Origin {
    /// On local disk; the move uploads it.
    #[default]
    Local,
    /// Already on the remote backend; the move is a server-side copy.
    Remote,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MoveOptions {
    pub origin: Origin,
    pub delete_origin: bool,
}

impl MoveOptions {
    pub fn moving(origin: Origin) -> Self {
        Self { origin, delete_origin: true }
    }

    pub fn copying(origin: Origin) -> Self {
        Self { origin, delete_origin: false }
    }
}
