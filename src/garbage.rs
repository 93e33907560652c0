use std::boxed::Box;
use std::collections::VecDeque;

/// Retired payloads awaiting reclamation, in retirement-generation order.
///
/// The writer pushes one entry per update, tagged with the generation that
/// was current when the payload was unlinked from the shared pointer. Entries
/// are reclaimed once every reader has moved past their generation.
///
/// Invariant: retained entries are exactly those whose generation is greater
/// than `last_collected_generation`.
///
/// 等待回收的已退休负载，按退休世代排序。
///
/// 写入者每次更新推入一个条目，标记为负载从共享指针上摘除时的当前世代。
/// 一旦所有读者都越过了某条目的世代，它就会被回收。
///
/// 不变量：保留的条目恰好是世代大于 `last_collected_generation` 的那些。
pub(crate) struct GarbageList<T> {
    /// Queue of (retirement generation, payload), ascending by generation.
    /// (退休世代, 负载) 队列，按世代升序。
    queue: VecDeque<(u64, Box<T>)>,
    /// The newest generation whose garbage has already been freed.
    /// 其垃圾已被释放的最新世代。
    last_collected_generation: u64,
}

impl<T> GarbageList<T> {
    /// 创建一个新的空垃圾列表。
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            last_collected_generation: 0,
        }
    }

    /// Number of retired payloads not yet reclaimed.
    /// 尚未回收的已退休负载数量。
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Add a retired payload tagged with its retirement generation.
    ///
    /// Generations are monotonic by construction (one retirement per update,
    /// each at a strictly larger generation than the last).
    ///
    /// 添加一个已退休负载，并标记其退休世代。
    /// 世代由构造保证单调（每次更新退休一个，世代严格递增）。
    #[inline]
    pub(crate) fn retire(&mut self, payload: Box<T>, generation: u64) {
        debug_assert!(
            self.queue
                .back()
                .is_none_or(|(last, _)| *last < generation),
            "retirement generations must be strictly increasing"
        );
        self.queue.push_back((generation, payload));
    }

    /// Reclaim every payload no reader can still observe.
    ///
    /// `oldest_active` is the minimum generation pinned by any reader, or
    /// `None` when every reader is idle. With no active reader everything is
    /// reclaimed; otherwise only payloads retired strictly before
    /// `oldest_active` are, since a reader pinned at generation g may still
    /// hold the payload that was retired at g.
    ///
    /// 回收所有读者都不再可能观察到的负载。
    ///
    /// `oldest_active` 是任何读者钉住的最小世代，所有读者空闲时为 `None`。
    /// 没有活跃读者时回收全部；否则只回收退休世代严格小于 `oldest_active`
    /// 的负载，因为钉在世代 g 的读者可能仍持有在 g 退休的负载。
    pub(crate) fn collect(&mut self, oldest_active: Option<u64>) {
        match oldest_active {
            None => {
                if let Some((newest, _)) = self.queue.back() {
                    self.last_collected_generation = *newest;
                }
                self.queue.clear();
            }
            Some(min_active) => {
                while let Some((generation, _)) = self.queue.front() {
                    if *generation >= min_active {
                        break;
                    }
                    self.queue.pop_front();
                }
                self.last_collected_generation =
                    self.last_collected_generation.max(min_active - 1);
            }
        }
    }

    /// Hand every remaining retired payload to the caller (writer teardown).
    /// 将所有剩余的已退休负载交给调用者（写入者销毁时）。
    pub(crate) fn drain_all(&mut self) -> Vec<Box<T>> {
        self.queue.drain(..).map(|(_, payload)| payload).collect()
    }

    /// The newest generation whose retired payloads are known freed.
    /// 已知其退休负载均被释放的最新世代。
    #[cfg(test)]
    pub(crate) fn last_collected_generation(&self) -> u64 {
        self.last_collected_generation
    }
}
