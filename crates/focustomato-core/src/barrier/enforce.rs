//! Seam to the OS-level blocking mechanism.
//!
//! Killing processes or rewriting hosts/firewall rules is platform work the
//! core does not do. The host calls an [`Enforcer`] when a blocked target
//! is hit; a failure is logged and never stops the engine.

use tracing::info;

use super::target::TargetKind;
use crate::error::EnforceError;

pub trait Enforcer: Send + Sync {
    fn enforce_block(&self, kind: TargetKind, target: &str) -> Result<(), EnforceError>;
}

/// Default enforcer: records the block request in the log and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEnforcer;

impl Enforcer for LoggingEnforcer {
    fn enforce_block(&self, kind: TargetKind, target: &str) -> Result<(), EnforceError> {
        info!(%kind, blocked = target, "block requested");
        Ok(())
    }
}

impl<F> Enforcer for F
where
    F: Fn(TargetKind, &str) -> Result<(), EnforceError> + Send + Sync,
{
    fn enforce_block(&self, kind: TargetKind, target: &str) -> Result<(), EnforceError> {
        self(kind, target)
    }
}
