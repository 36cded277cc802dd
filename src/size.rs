use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A 2-D unsigned size in pixels. Equality is component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A resolvable handle to a size, so members can track a window's current
/// size without every member owning a copy that goes stale on resize.
pub trait SizeRef: Send + Sync {
    fn resolve(&self) -> Size;
}

/// A size that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize(pub Size);

impl SizeRef for FixedSize {
    fn resolve(&self) -> Size {
        self.0
    }
}

/// A size shared with, and updated by, an external owner (typically the
/// windowing layer on resize). Cheap to clone; the core only ever reads it
/// on the GPU thread, but updates may come from wherever the host's resize
/// callback runs.
#[derive(Debug, Clone)]
pub struct SharedSize(Arc<(AtomicU32, AtomicU32)>);

impl SharedSize {
    pub fn new(initial: Size) -> Self {
        Self(Arc::new((
            AtomicU32::new(initial.width),
            AtomicU32::new(initial.height),
        )))
    }

    pub fn set(&self, size: Size) {
        self.0 .0.store(size.width, Ordering::Relaxed);
        self.0 .1.store(size.height, Ordering::Relaxed);
    }
}

impl SizeRef for SharedSize {
    fn resolve(&self) -> Size {
        Size::new(
            self.0 .0.load(Ordering::Relaxed),
            self.0 .1.load(Ordering::Relaxed),
        )
    }
}

/// An owning, shareable handle to any [`SizeRef`] implementation.
pub type DynSizeRef = Arc<dyn SizeRef>;

pub fn fixed(size: Size) -> DynSizeRef {
    Arc::new(FixedSize(size))
}
