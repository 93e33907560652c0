use crate::garbage::GarbageList;
use crate::reader::ReaderState;
use crate::state::{IDLE_GENERATION, INITIAL_GENERATION, RcuShared};
use crate::sync::{Arc, AtomicPtr, AtomicU64, Mutex, Ordering, fence};
use std::vec::Vec;

/// A generation-based RCU cell for one shared payload.
///
/// `Rcu<T>` is the entry point for a read-copy-update managed value: one
/// writer occasionally installs a replacement payload while any number of
/// reader threads access the current one without locking. Retired payloads
/// are reclaimed only once no reader can still observe them.
///
/// It manages:
/// - The monotonic generation counter.
/// - Registration of per-thread reader states.
/// - Creation of the unique writer.
///
/// `Rcu<T>` is `Clone` and can be safely shared across threads. Typically,
/// you create one at startup and clone it to every thread that needs to
/// register a reader.
///
/// **Typical Usage**:
/// ```
/// use agent_sync::Rcu;
///
/// // Main thread: create the cell and get the writer
/// let (mut writer, rcu) = Rcu::new(String::from("config v1"));
///
/// // Reader threads: register once, then read
/// let mut reader = rcu.register_reader();
/// {
///     let guard = reader.read();
///     assert_eq!(&*guard, "config v1");
/// }
///
/// // Writer thread: install a replacement
/// writer.update(String::from("config v2"));
/// ```
///
/// 一个基于世代的 RCU 单元，管理一个共享负载。
/// `Rcu<T>` 是读-复制-更新托管值的入口点：一个写入者偶尔安装替换负载，
/// 任意数量的读者线程无锁地访问当前负载。已退休的负载只有在没有读者
/// 还可能观察到它时才会被回收。
/// 它管理：
/// - 单调世代计数器。
/// - 每线程读者状态的注册。
/// - 唯一写入者的创建。
/// `Rcu<T>` 是 `Clone` 的，可以安全地在线程间共享。
pub struct Rcu<T> {
    shared: Arc<RcuShared<T>>,
}

// Manual impl: the handle is clonable even when T is not.
impl<T> Clone for Rcu<T> {
    fn clone(&self) -> Self {
        Rcu {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Rcu<T> {
    /// Create a new RCU cell owning `initial` at generation 1.
    ///
    /// Returns the unique writer and the clonable registration handle. The
    /// writer is not `Clone` and its operations take `&mut self`, so the
    /// single-writer requirement is enforced by ownership rather than left
    /// as a runtime precondition.
    ///
    /// 创建一个新的 RCU 单元，在世代 1 拥有 `initial`。
    /// 返回唯一写入者和可克隆的注册句柄。写入者不可 `Clone`，其操作
    /// 接受 `&mut self`，因此单写入者要求由所有权而非运行时前置条件保证。
    pub fn new(initial: T) -> (RcuWriter<T>, Self) {
        let shared = Arc::new(RcuShared {
            current_generation: AtomicU64::new(INITIAL_GENERATION),
            payload: AtomicPtr::new(Box::into_raw(Box::new(initial))),
            readers: Mutex::new(Vec::new()),
            orphaned: Mutex::new(Vec::new()),
        });

        let writer = RcuWriter {
            shared: shared.clone(),
            garbage: GarbageList::new(),
        };

        (writer, Rcu { shared })
    }

    /// Register a new reader state for the current thread.
    ///
    /// Returns a `ReaderState` that should be stored per-thread: create one
    /// when a thread starts participating and drop it when the thread is
    /// done. Each `ReaderState` must be used by only one thread at a time.
    ///
    /// 为当前线程注册一个新的读者状态。
    /// 返回应按线程存储的 `ReaderState`：线程开始参与时创建，线程结束时
    /// drop。每个 `ReaderState` 同一时刻只能被一个线程使用。
    #[inline]
    pub fn register_reader(&self) -> ReaderState<T> {
        ReaderState::new(self.shared.clone())
    }
}

/// The unique writer for an RCU cell.
///
/// There is exactly one `RcuWriter` per `Rcu`, owned by the writer thread.
/// It is responsible for:
/// - Installing replacement payloads and advancing the generation counter.
/// - Holding retired payloads until no reader can observe them.
/// - Scanning registered readers and reclaiming old payloads.
///
/// **Thread Safety**: `RcuWriter` is `Send` but not `Clone`; updates are
/// serialized by the `&mut self` receiver.
///
/// 一个 RCU 单元的唯一写入者。
/// 每个 `Rcu` 恰好有一个 `RcuWriter`，由写入者线程持有。
/// 它负责：
/// - 安装替换负载并推进世代计数器。
/// - 持有已退休负载，直到没有读者能观察到它们。
/// - 扫描已注册读者并回收旧负载。
/// **线程安全性**：`RcuWriter` 是 `Send` 的但不可 `Clone`；更新由
/// `&mut self` 接收者串行化。
pub struct RcuWriter<T> {
    shared: Arc<RcuShared<T>>,
    garbage: GarbageList<T>,
}

impl<T: Send + Sync + 'static> RcuWriter<T> {
    /// Install `payload` as the current value and retire the old one.
    ///
    /// The swap of the payload pointer happens strictly before the
    /// generation increment (both `Release`): a reader that observes the new
    /// generation therefore also observes the new payload, never the other
    /// way around. The displaced payload is retired at the pre-increment
    /// generation and a collection pass runs immediately.
    ///
    /// 将 `payload` 安装为当前值并退休旧值。
    /// 负载指针的交换严格先于世代递增（均为 `Release`）：观察到新世代的
    /// 读者因此也观察到新负载，反之绝不会发生。被替换的负载以递增前的
    /// 世代退休，并立即运行一次回收。
    pub fn update(&mut self, payload: T) {
        let new_ptr = Box::into_raw(Box::new(payload));
        let old_ptr = self.shared.payload.swap(new_ptr, Ordering::Release);

        // Returns the pre-increment generation, which is the retirement tag:
        // readers pinned at it may still hold old_ptr.
        let retired_at = self
            .shared
            .current_generation
            .fetch_add(1, Ordering::Release);

        // SAFETY: old_ptr came from Box::into_raw in `new`/`update` and was
        // just unlinked; only the garbage list refers to it from here on.
        debug_assert!(!old_ptr.is_null());
        self.garbage
            .retire(unsafe { Box::from_raw(old_ptr) }, retired_at);

        self.collect();
    }
}

impl<T> RcuWriter<T> {
    /// Perform a reclamation pass.
    ///
    /// Scans all registered reader slots under the registry lock, taking a
    /// full fence first so a reader's generation store in `read()` cannot be
    /// missed, and computes the minimum non-idle observed generation. Every
    /// retired payload older than that minimum is freed; with no active
    /// reader, everything is.
    ///
    /// `update` already collects, so calling this directly is only needed to
    /// reclaim after readers went idle without further updates. Safe to call
    /// at any time.
    ///
    /// 执行一次回收。
    /// 在注册表锁下扫描所有已注册的读者槽，先取一个全栅栏以确保不会错过
    /// 读者在 `read()` 中的世代写入，并计算最小的非空闲观察世代。所有比
    /// 该最小值更旧的已退休负载都被释放；没有活跃读者时全部释放。
    /// `update` 已经会回收，因此仅当读者转为空闲而没有后续更新时才需要
    /// 直接调用。任何时候调用都是安全的。
    pub fn collect(&mut self) {
        let readers = self.shared.readers.lock();

        // Pairs with the SeqCst fence in ReaderState::read: either the scan
        // sees the reader's generation store, or the reader's payload load
        // sees the already-swapped pointer.
        fence(Ordering::SeqCst);

        let mut oldest_active: Option<u64> = None;
        for slot in readers.iter() {
            let generation = slot.observed_generation.load(Ordering::Acquire);
            if generation != IDLE_GENERATION {
                oldest_active = Some(match oldest_active {
                    Some(min) => min.min(generation),
                    None => generation,
                });
            }
        }
        drop(readers);

        self.garbage.collect(oldest_active);

        log::trace!(
            "rcu collect: oldest_active={:?}, retired_pending={}",
            oldest_active,
            self.garbage.len()
        );
    }

    /// Number of retired payloads not yet reclaimed.
    /// 尚未回收的已退休负载数量。
    #[inline]
    pub fn retired_len(&self) -> usize {
        self.garbage.len()
    }

    #[cfg(test)]
    pub(crate) fn last_collected_generation(&self) -> u64 {
        self.garbage.last_collected_generation()
    }
}

impl<T> Drop for RcuWriter<T> {
    /// Final reclamation pass. Payloads still pinned by a reader cannot be
    /// freed here; they are parked in the shared state and dropped with it,
    /// once every reader state and handle is gone.
    ///
    /// 最后一次回收。仍被读者钉住的负载不能在此释放；它们被寄存到共享
    /// 状态中，待所有读者状态和句柄消失后随之 drop。
    fn drop(&mut self) {
        self.collect();

        let survivors = self.garbage.drain_all();
        if !survivors.is_empty() {
            self.shared.orphaned.lock().extend(survivors);
        }
    }
}
