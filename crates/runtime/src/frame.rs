/// Repaint counter.
///
/// Index 0 means nothing has been drawn yet; each repaint advances it by one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1)
    }
}
