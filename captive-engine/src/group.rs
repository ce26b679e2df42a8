use std::ops::{Deref, DerefMut};

use captive_core::kernel::{GroupMarker, GroupOutcome, UndoGroups};
use tracing::trace;

/// 作用域内的撤销分组。未调用 [`UndoGroup::commit`] 就被丢弃时按放弃关闭，
/// 内核据此回滚分组内创建的草图与特征。
pub struct UndoGroup<'a, K: UndoGroups + ?Sized> {
    kernel: &'a mut K,
    marker: GroupMarker,
    committed: bool,
}

impl<'a, K: UndoGroups + ?Sized> UndoGroup<'a, K> {
    pub fn open(kernel: &'a mut K) -> Self {
        let marker = kernel.begin_group();
        trace!(group = marker.get(), "进入撤销分组");
        Self {
            kernel,
            marker,
            committed: false,
        }
    }

    #[inline]
    pub fn marker(&self) -> GroupMarker {
        self.marker
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<K: UndoGroups + ?Sized> Deref for UndoGroup<'_, K> {
    type Target = K;

    fn deref(&self) -> &K {
        &*self.kernel
    }
}

impl<K: UndoGroups + ?Sized> DerefMut for UndoGroup<'_, K> {
    fn deref_mut(&mut self) -> &mut K {
        &mut *self.kernel
    }
}

impl<K: UndoGroups + ?Sized> Drop for UndoGroup<'_, K> {
    fn drop(&mut self) {
        let outcome = if self.committed {
            GroupOutcome::Committed
        } else {
            GroupOutcome::Abandoned
        };
        self.kernel.end_group(self.marker, outcome);
    }
}
