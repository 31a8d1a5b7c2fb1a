use core::fmt;
use core::num::NonZeroU32;

use crate::error::{CoreError, CoreResult};

/// Boundary marker stored per exterior facet.
///
/// - `1` is reserved for walls
/// - `2..` are inflow/outflow planes declared by the caller
/// - `NonZero` keeps `Option<SubdomainId>` the size of a `u32`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct SubdomainId(NonZeroU32);

impl SubdomainId {
    pub const WALL: SubdomainId = SubdomainId(NonZeroU32::MIN);
    /// Inflow marker of a single-inlet pipe.
    pub const INFLOW: SubdomainId = SubdomainId(NonZeroU32::MIN.saturating_add(1));
    /// Outflow marker of a single-outlet pipe.
    pub const OUTFLOW: SubdomainId = SubdomainId(NonZeroU32::MIN.saturating_add(2));

    pub fn new(id: u32) -> CoreResult<Self> {
        NonZeroU32::new(id)
            .map(Self)
            .ok_or(CoreError::InvalidSubdomain { id })
    }

    /// Id for an inflow/outflow plane; refuses the reserved wall marker.
    pub fn plane(id: u32) -> CoreResult<Self> {
        if id < 2 {
            return Err(CoreError::InvalidSubdomain { id });
        }
        Self::new(id)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn is_wall(self) -> bool {
        self == Self::WALL
    }
}

impl TryFrom<u32> for SubdomainId {
    type Error = CoreError;

    fn try_from(value: u32) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl From<SubdomainId> for u32 {
    fn from(id: SubdomainId) -> u32 {
        id.get()
    }
}

impl fmt::Debug for SubdomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubdomainId({})", self.get())
    }
}

impl fmt::Display for SubdomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_is_one() {
        assert_eq!(SubdomainId::WALL.get(), 1);
        assert!(SubdomainId::new(1).unwrap().is_wall());
        assert!(!SubdomainId::new(2).unwrap().is_wall());
        assert_eq!(SubdomainId::INFLOW.get(), 2);
        assert_eq!(SubdomainId::OUTFLOW.get(), 3);
    }

    #[test]
    fn plane_ids_exclude_wall_and_zero() {
        assert!(SubdomainId::plane(0).is_err());
        assert!(SubdomainId::plane(1).is_err());
        assert_eq!(SubdomainId::plane(3).unwrap().get(), 3);
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<SubdomainId>(),
            core::mem::size_of::<Option<SubdomainId>>()
        );
    }
}
