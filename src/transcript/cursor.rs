#[derive(Debug, Clone, Copy)]
pub struct NodeCursor<'a, T> {
    items: &'a [T],
    position: usize,
}

impl<'a, T> NodeCursor<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn peek(&self) -> Option<&'a T> {
        self.items.get(self.position)
    }

    pub fn advance(&mut self) -> Option<&'a T> {
        let item = self.items.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    pub fn advance_while(&mut self, mut predicate: impl FnMut(&T) -> bool) -> &'a [T] {
        let start = self.position;
        while let Some(item) = self.items.get(self.position) {
            if !predicate(item) {
                break;
            }
            self.position += 1;
        }
        &self.items[start..self.position]
    }
}
