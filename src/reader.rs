use crate::state::{IDLE_GENERATION, RcuShared, ReaderSlot};
use crate::sync::{Arc, AtomicU64, Ordering, fence};
use std::ops::Deref;

/// A reader thread's registration with an RCU cell.
///
/// Each participating thread creates exactly one `ReaderState` via
/// `Rcu::register_reader()` and drops it when the thread stops reading
/// (typically at thread exit); dropping unregisters the slot so the writer
/// no longer scans it.
///
/// `read()` takes `&mut self` and the returned guard borrows the state, so
/// acquiring a second guard from the same state while one is live is a
/// compile error rather than undefined behavior.
///
/// 读者线程在 RCU 单元上的注册。
/// 每个参与线程通过 `Rcu::register_reader()` 创建恰好一个 `ReaderState`，
/// 并在线程停止读取时（通常在线程退出时）drop 它；drop 会注销槽位，
/// 写入者不再扫描它。
/// `read()` 接受 `&mut self` 且返回的守卫借用该状态，因此在一个守卫存活
/// 时从同一状态获取第二个守卫是编译错误，而不是未定义行为。
pub struct ReaderState<T> {
    slot: Arc<ReaderSlot>,
    shared: Arc<RcuShared<T>>,
}

impl<T> ReaderState<T> {
    pub(crate) fn new(shared: Arc<RcuShared<T>>) -> Self {
        let slot = Arc::new(ReaderSlot {
            observed_generation: AtomicU64::new(IDLE_GENERATION),
        });

        // Register the reader immediately in the shared registry
        shared.readers.lock().push(Arc::clone(&slot));

        ReaderState { slot, shared }
    }

    /// Enter a read-side critical section.
    ///
    /// Publishes the observed generation, then loads the payload pointer:
    /// (1) load `current_generation` with `Acquire`;
    /// (2) store it into this reader's slot with `Relaxed`;
    /// (3) full `SeqCst` fence;
    /// (4) load the payload pointer with `Acquire`.
    ///
    /// The fence pairs with the one in the writer's collection scan: without
    /// it, the generation store could be ordered after the payload load from
    /// the writer's point of view, and the writer could free a payload this
    /// thread is still about to dereference. Weakening any of these orderings
    /// is a correctness bug, not a performance tradeoff.
    ///
    /// The guard never blocks and is valid for the payload current at
    /// acquisition; the payload it exposes survives at least until the guard
    /// is dropped.
    ///
    /// 进入读侧临界区。
    /// 先发布观察到的世代，再加载负载指针：
    /// (1) 以 `Acquire` 加载 `current_generation`；
    /// (2) 以 `Relaxed` 将其存入本读者的槽位；
    /// (3) 全 `SeqCst` 栅栏；
    /// (4) 以 `Acquire` 加载负载指针。
    /// 该栅栏与写入者回收扫描中的栅栏配对：没有它，从写入者的视角看，
    /// 世代写入可能被重排到负载加载之后，写入者就可能释放本线程即将
    /// 解引用的负载。弱化其中任何一个内存序都是正确性错误，而非性能取舍。
    #[inline]
    pub fn read(&mut self) -> ReadGuard<'_, T> {
        let generation = self.shared.current_generation.load(Ordering::Acquire);
        self.slot
            .observed_generation
            .store(generation, Ordering::Relaxed);

        fence(Ordering::SeqCst);

        let ptr = self.shared.payload.load(Ordering::Acquire);

        // SAFETY: ptr is never null (the writer always maintains a valid
        // payload), and the generation published above keeps the writer from
        // reclaiming it while the guard is live.
        ReadGuard {
            slot: &self.slot,
            payload: unsafe { &*ptr },
        }
    }
}

impl<T> Drop for ReaderState<T> {
    /// Unregister this reader's slot so the writer stops scanning it.
    /// 注销本读者的槽位，写入者不再扫描它。
    fn drop(&mut self) {
        self.shared
            .readers
            .lock()
            .retain(|other| !Arc::ptr_eq(other, &self.slot));
    }
}

/// A guard granting access to the payload current at acquisition time.
///
/// Obtained from `ReaderState::read()`. It is `#[must_use]` and not `Clone`;
/// its lifetime is bound to the `ReaderState` it came from. The guard does
/// not own the payload: reclamation is governed solely by the writer's
/// garbage list, which will not free this payload while the guard is live.
///
/// 一个授予访问获取时刻当前负载的守卫。
/// 从 `ReaderState::read()` 获得。它是 `#[must_use]` 且不可 `Clone`；
/// 其生命周期绑定到它来自的 `ReaderState`。守卫不拥有负载 —— 回收完全
/// 由写入者的垃圾列表决定，而垃圾列表在守卫存活时不会释放该负载。
#[must_use]
pub struct ReadGuard<'s, T> {
    slot: &'s ReaderSlot,
    payload: &'s T,
}

impl<'s, T> Deref for ReadGuard<'s, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.payload
    }
}

impl<'s, T> Drop for ReadGuard<'s, T> {
    /// Publish "idle" after all use of the payload, in program order.
    /// 在对负载的所有使用之后（按程序序）发布"空闲"。
    #[inline]
    fn drop(&mut self) {
        self.slot
            .observed_generation
            .store(IDLE_GENERATION, Ordering::Release);
    }
}
