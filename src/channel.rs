use antidote::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned by `Sender::send` when the payload could not be enqueued.
///
/// The payload is handed back in both variants, so a producer can retry,
/// drop it, or apply backpressure. A full buffer is an expected, recoverable
/// outcome, not a fault.
///
/// `Sender::send` 在负载无法入队时返回的错误。
/// 两个变体都会交还负载，生产者可以重试、丢弃或施加背压。
/// 缓冲区满是预期的可恢复结果，不是故障。
#[derive(Error, PartialEq, Eq)]
pub enum SendError<T> {
    /// The ring buffer already holds `capacity` items.
    /// 环形缓冲区已持有 `capacity` 个条目。
    #[error("channel is full")]
    Full(T),
    /// The receiver handle was dropped; no item will ever be consumed.
    /// 接收者句柄已被 drop；不会再有条目被消费。
    #[error("receiver was dropped")]
    Disconnected(T),
}

impl<T> SendError<T> {
    /// Recover ownership of the payload that failed to send.
    /// 取回发送失败的负载的所有权。
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(payload) | SendError::Disconnected(payload) => payload,
        }
    }
}

// Manual impl so T does not need to be Debug.
impl<T> std::fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Full(_) => f.write_str("Full(..)"),
            SendError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}

/// Fixed-capacity FIFO ring of payload slots. Capacity never changes after
/// construction; callers needing more throughput size the channel up front.
///
/// 固定容量的 FIFO 环形槽。容量在构造后不再变化；需要更高吞吐的调用者
/// 应预先调大通道。
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    len: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ring {
            slots: slots.into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Non-blocking push. Returns the payload on a full ring.
    /// 非阻塞推入。环满时返还负载。
    fn push(&mut self, payload: T) -> Result<(), T> {
        if self.len == self.slots.len() {
            return Err(payload);
        }
        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = Some(payload);
        self.len += 1;
        Ok(())
    }

    /// Non-blocking pop in FIFO order.
    /// 按 FIFO 顺序的非阻塞弹出。
    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let payload = self.slots[self.head].take();
        debug_assert!(payload.is_some());
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        payload
    }
}

/// Everything behind the channel mutex: the ring plus the handle counts the
/// receive path consults.
/// 通道互斥锁后面的全部状态：环，加上接收路径要查询的句柄计数。
struct ChannelInner<T> {
    ring: Ring<T>,
    /// Live `Sender` handles. When this reaches 0, a waiting receiver stops
    /// waiting: no more data can ever arrive.
    /// 存活的 `Sender` 句柄数。归零时等待中的接收者停止等待：不会再有数据。
    sender_count: usize,
    /// Cleared when the `Receiver` is dropped; `send` then fails fast.
    /// `Receiver` 被 drop 时清除；之后 `send` 快速失败。
    receiver_alive: bool,
}

struct ChannelShared<T> {
    inner: Mutex<ChannelInner<T>>,
    /// Producer→consumer wakeup only; never used for mutual exclusion.
    /// 仅用于生产者→消费者唤醒；绝不用于互斥。
    available: Condvar,
}

/// Create a bounded MPSC channel with `capacity` slots.
///
/// Returns the initial sender and the unique receiver. The shared state is
/// freed once every handle is dropped (`Arc` takes the place of the manual
/// sender/receiver refcounts of a hand-rolled implementation).
///
/// # Panics
/// Panics if `capacity` is zero: a zero-slot channel could never deliver.
///
/// 创建一个有 `capacity` 个槽的有界 MPSC 通道。
/// 返回初始发送者和唯一接收者。所有句柄被 drop 后共享状态被释放
/// （`Arc` 取代了手写实现中的发送者/接收者手动引用计数）。
///
/// # Panics
/// `capacity` 为零时 panic —— 零槽通道永远无法投递。
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    assert!(capacity > 0, "channel capacity must be positive");

    let shared = Arc::new(ChannelShared {
        inner: Mutex::new(ChannelInner {
            ring: Ring::with_capacity(capacity),
            sender_count: 1,
            receiver_alive: true,
        }),
        available: Condvar::new(),
    });

    (
        Sender {
            shared: shared.clone(),
        },
        Receiver { shared },
    )
}

/// Producer handle for a bounded MPSC channel.
///
/// Cloneable; every clone references the same ring buffer. `send` never
/// blocks: a full buffer is reported back to the producer together with the
/// payload.
///
/// 有界 MPSC 通道的生产者句柄。
/// 可克隆；每个克隆引用同一个环形缓冲区。`send` 绝不阻塞：
/// 缓冲区满时连同负载一起报告给生产者。
pub struct Sender<T> {
    shared: Arc<ChannelShared<T>>,
}

impl<T> Sender<T> {
    /// Enqueue `payload` without blocking.
    ///
    /// On success the consumer is signalled. On failure the payload is
    /// returned inside the error so the caller keeps ownership.
    ///
    /// 非阻塞入队 `payload`。
    /// 成功时唤醒消费者。失败时负载放在错误里返还，调用者保留所有权。
    pub fn send(&self, payload: T) -> Result<(), SendError<T>> {
        let mut inner = self.shared.inner.lock();
        if !inner.receiver_alive {
            return Err(SendError::Disconnected(payload));
        }
        match inner.ring.push(payload) {
            Ok(()) => {
                drop(inner);
                self.shared.available.notify_one();
                Ok(())
            }
            Err(payload) => Err(SendError::Full(payload)),
        }
    }
}

impl<T> Clone for Sender<T> {
    /// Register one more producer on the same channel.
    /// 在同一通道上再注册一个生产者。
    fn clone(&self) -> Self {
        let mut inner = self.shared.inner.lock();
        // Overflow must be reported, not wrapped: a wrapped count of 0 would
        // make the receiver believe all producers are gone.
        assert!(
            inner.sender_count < usize::MAX,
            "sender count overflow"
        );
        inner.sender_count += 1;
        drop(inner);

        Sender {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.sender_count -= 1;
        let last = inner.sender_count == 0;
        drop(inner);

        if last {
            // Wake a parked receiver so it can observe "no more senders"
            // instead of waiting out its timeout.
            log::trace!("channel: last sender dropped");
            self.shared.available.notify_all();
        }
    }
}

/// The unique consumer handle for a bounded MPSC channel.
///
/// Not `Clone`: the channel supports exactly one consumer. Items are
/// delivered strictly in the order producers successfully enqueued them.
///
/// 有界 MPSC 通道的唯一消费者句柄。
/// 不可 `Clone`：通道恰好支持一个消费者。条目严格按生产者成功入队的
/// 顺序投递。
pub struct Receiver<T> {
    shared: Arc<ChannelShared<T>>,
}

impl<T> Receiver<T> {
    /// Non-blocking receive.
    /// 非阻塞接收。
    pub fn try_recv(&self) -> Option<T> {
        self.shared.inner.lock().ring.pop()
    }

    /// Receive the next item, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` immediately, without waiting, when the buffer is
    /// empty and no live sender remains, since no item can ever arrive.
    /// Otherwise waits on the condition variable in a loop, re-deriving the
    /// remaining time from the deadline on every wakeup (spurious wakeups
    /// included) and retrying the pop after each one. The loop ends when a
    /// pop succeeds, the sender count drops to zero, or the deadline passes.
    ///
    /// 接收下一个条目，最多等待 `timeout`。
    /// 当缓冲区为空且没有存活的发送者时立即返回 `None`，不等待 ——
    /// 因为不可能再有条目到达。否则在循环中等待条件变量，每次唤醒
    /// （包括虚假唤醒）都从截止时刻重新推导剩余时间，并在每次唤醒后
    /// 重试弹出。弹出成功、发送者计数归零或截止时刻已过时循环结束。
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let mut inner = self.shared.inner.lock();

        if let Some(payload) = inner.ring.pop() {
            return Some(payload);
        }
        if inner.sender_count == 0 || timeout.is_zero() {
            return None;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let (guard, _) = self.shared.available.wait_timeout(inner, deadline - now);
            inner = guard;

            if let Some(payload) = inner.ring.pop() {
                return Some(payload);
            }
            if inner.sender_count == 0 {
                return None;
            }
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.shared.inner.lock().receiver_alive = false;
        log::trace!("channel: receiver dropped");
    }
}
