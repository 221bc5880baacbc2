//! Trait abstraction for the vehicle connection to enable testing

use async_trait::async_trait;

use crate::control::intent::{ControlAxis, FlipDirection, MotionDirection};
use crate::error::Result;

/// The vehicle operations the control core consumes.
///
/// One-shot maneuvers (`take_off`, `land`, `emergency_stop`, `flip`)
/// are long-running relative to the control tick and are executed on
/// dispatcher workers. `move_continuous` and `halt` are expected to
/// return quickly and are safe to issue from the tick loop.
#[async_trait]
pub trait Vehicle: Send + Sync {
    async fn take_off(&self) -> Result<()>;

    async fn land(&self) -> Result<()>;

    /// Stop all motors immediately. The drone drops; transport-level
    /// acknowledgement is not awaited.
    async fn emergency_stop(&self) -> Result<()>;

    async fn flip(&self, direction: FlipDirection) -> Result<()>;

    /// Start continuous movement on one axis at the given speed (cm/s).
    /// Persists until countermanded by `halt` or an opposing move.
    async fn move_continuous(&self, direction: MotionDirection, speed_cm_s: i32) -> Result<()>;

    /// Stop continuous movement on one axis.
    async fn halt(&self, axis: ControlAxis) -> Result<()>;

    async fn stream_on(&self) -> Result<()>;

    async fn stream_off(&self) -> Result<()>;
}
