use smallvec::SmallVec;

use super::defs::WindowHandle;

/// Open windows, bottom first. A handle occurs at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowStack {
    entries: SmallVec<[WindowHandle; 8]>,
}

impl WindowStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `window` on top. A window that is already stacked is moved to
    /// the top instead of being duplicated; returns whether it was new.
    pub fn push(&mut self, window: WindowHandle) -> bool {
        let existed = self.remove(window);
        self.entries.push(window);
        !existed
    }

    pub fn remove(&mut self, window: WindowHandle) -> bool {
        match self.position(window) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<WindowHandle> {
        self.entries.pop()
    }

    pub fn top(&self) -> Option<WindowHandle> {
        self.entries.last().copied()
    }

    pub fn is_top(&self, window: WindowHandle) -> bool {
        self.top() == Some(window)
    }

    pub fn contains(&self, window: WindowHandle) -> bool {
        self.entries.contains(&window)
    }

    pub fn position(&self, window: WindowHandle) -> Option<usize> {
        self.entries.iter().position(|entry| *entry == window)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = WindowHandle> + '_ {
        self.entries.iter().copied()
    }

    pub fn as_slice(&self) -> &[WindowHandle] {
        &self.entries
    }
}
