use crate::sync::{Arc, AtomicPtr, AtomicU64, Mutex, Ordering};
use std::vec::Vec;

/// Generation value meaning "this reader is outside any read-side section".
/// 表示"该读者不在任何读侧临界区内"的世代值。
pub(crate) const IDLE_GENERATION: u64 = 0;

/// The generation a freshly created manager starts at. 0 is reserved for idle.
/// 新创建的管理器起始世代。0 保留给空闲状态。
pub(crate) const INITIAL_GENERATION: u64 = 1;

/// A slot allocated for a reader thread to record the generation it observed.
///
/// Cache-aligned to prevent false sharing between readers.
///
/// 为读者线程分配的槽，用于记录它观察到的世代。
/// 缓存对齐以防止读者之间的伪共享。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct ReaderSlot {
    /// The generation currently pinned by the reader, or IDLE_GENERATION.
    /// 读者当前钉住的世代，或 IDLE_GENERATION。
    pub(crate) observed_generation: AtomicU64,
}

/// Shared state for one RCU-managed payload.
///
/// Contains the generation counter, the current payload pointer and the
/// registry of reader slots.
///
/// 一个受 RCU 管理的负载的共享状态。
/// 包含世代计数器、当前负载指针和读者槽注册表。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct RcuShared<T> {
    /// The monotonic generation counter, advanced by the writer on update.
    /// 单调世代计数器，由写入者在更新时推进。
    pub(crate) current_generation: AtomicU64,
    /// The current payload. Always non-null and owned by the manager.
    /// 当前负载。始终非空，由管理器所有。
    pub(crate) payload: AtomicPtr<T>,
    /// All registered reader slots. Protected by a Mutex.
    /// 所有已注册的读者槽。由 Mutex 保护。
    pub(crate) readers: Mutex<Vec<Arc<ReaderSlot>>>,
    /// Retired payloads the writer could not reclaim before it was dropped
    /// (a reader still pinned them). Freed when the last handle goes away.
    /// 写入者被 drop 前无法回收的已退休负载（仍有读者钉住它们）。
    /// 最后一个句柄消失时释放。
    pub(crate) orphaned: Mutex<Vec<Box<T>>>,
}

impl<T> Drop for RcuShared<T> {
    /// The last handle to drop reclaims the final payload. No reader can be
    /// live here: every `ReaderState` holds an `Arc` to this state.
    ///
    /// 最后一个被 drop 的句柄回收最终负载。此处不可能有存活的读者：
    /// 每个 `ReaderState` 都持有指向此状态的 `Arc`。
    fn drop(&mut self) {
        let ptr = self.payload.load(Ordering::Relaxed);
        if !ptr.is_null() {
            unsafe {
                drop(Box::from_raw(ptr));
            }
        }
    }
}
