//! Scoped model access port.
//!
//! Some platforms only allow reading a user-selected file while an access
//! grant is held. The lifecycle manager acquires a grant before launching
//! and keeps it for the whole run; dropping the grant releases it.

use std::fmt::Debug;
use std::path::Path;

use super::ProcessError;

/// An access grant held for the duration of a server run.
///
/// Released when dropped.
pub trait AccessGrant: Send + Sync + Debug {
    /// Path the grant covers.
    fn path(&self) -> &Path;
}

/// Acquires scoped read access to a model file.
pub trait ModelAccessPort: Send + Sync {
    fn acquire(&self, path: &Path) -> Result<Box<dyn AccessGrant>, ProcessError>;
}
