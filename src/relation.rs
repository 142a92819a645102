use crate::errors::MeshError;

/// Offset of a neighbouring partition in the 3x3x3 block of partitions around
/// the current one. Every component is in `-1..=1` and at least one is non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NeighbourDirection([i8; 3]);

impl NeighbourDirection {
    pub fn new(offset: [i8; 3]) -> Option<Self> {
        let valid = offset.iter().all(|o| (-1..=1).contains(o)) && offset != [0, 0, 0];
        valid.then_some(Self(offset))
    }

    pub fn offset(&self) -> [i8; 3] {
        self.0
    }

    /// The direction seen from the other partition.
    pub fn reversed(&self) -> Self {
        Self([-self.0[0], -self.0[1], -self.0[2]])
    }
}

/// Classifies which partition (or boundary) the right endpoint of a face
/// belongs to.
///
/// The integer code (sid) enumerates the 3x3x3 block of partitions, with code
/// 13 for the current partition itself and code 27 reserved for physical
/// boundary ghosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationClass {
    Local,
    Neighbour(NeighbourDirection),
    Boundary,
}

impl RelationClass {
    /// Number of relation classes (and face buckets).
    pub const COUNT: usize = 28;
    const LOCAL_CODE: u8 = 13;
    const BOUNDARY_CODE: u8 = 27;

    pub fn code(&self) -> u8 {
        match self {
            RelationClass::Local => Self::LOCAL_CODE,
            RelationClass::Neighbour(direction) => {
                let [dx, dy, dz] = direction.offset();
                (9 * (dx + 1) + 3 * (dy + 1) + (dz + 1)) as u8
            }
            RelationClass::Boundary => Self::BOUNDARY_CODE,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, RelationClass::Local)
    }
}

impl TryFrom<u8> for RelationClass {
    type Error = MeshError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            Self::LOCAL_CODE => Ok(RelationClass::Local),
            Self::BOUNDARY_CODE => Ok(RelationClass::Boundary),
            0..=26 => {
                let code = code as i8;
                let offset = [code / 9 - 1, (code / 3) % 3 - 1, code % 3 - 1];
                NeighbourDirection::new(offset)
                    .map(RelationClass::Neighbour)
                    .ok_or(MeshError::InvalidRelationCode(code as u8))
            }
            _ => Err(MeshError::InvalidRelationCode(code)),
        }
    }
}

impl From<RelationClass> for u8 {
    fn from(relation: RelationClass) -> Self {
        relation.code()
    }
}
