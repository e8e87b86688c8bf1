/// Index of an entity in its [`World`](crate::World).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(&self) -> u32 {
        self.0
    }
}
