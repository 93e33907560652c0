//! Generation-based RCU and a bounded MPSC channel for tracing agents.
//!
//! Two independent primitives with the same producer/consumer thread
//! topology (many short-lived worker threads, one long-lived background
//! thread):
//!
//! - [`Rcu`]: one writer occasionally replaces a shared payload; any number
//!   of reader threads access the current payload without locking. Retired
//!   payloads are reclaimed only once no reader can still observe them,
//!   tracked through a monotonic generation counter.
//! - [`bounded`]: a fixed-capacity multi-producer/single-consumer channel.
//!   `send` never blocks (a full ring is reported back with the payload);
//!   `recv_timeout` blocks on a condition variable with a bounded timeout
//!   and returns early once every sender is gone.
//!
//! Run the loom models with:
//! `RUSTFLAGS="--cfg loom" cargo test --features loom --test loom_tests --release`
//!
//! 面向追踪代理的基于世代的 RCU 和有界 MPSC 通道。
//!
//! 两个独立的原语，共享同一种生产者/消费者线程拓扑
//! （多个短命工作线程，一个长命后台线程）：
//!
//! - [`Rcu`]：一个写入者偶尔替换共享负载；任意数量的读者线程无锁访问
//!   当前负载。已退休负载通过单调世代计数器追踪，只有在没有读者还能
//!   观察到它时才被回收。
//! - [`bounded`]：固定容量的多生产者/单消费者通道。`send` 绝不阻塞
//!   （环满时连同负载一起报告）；`recv_timeout` 在条件变量上有界等待，
//!   所有发送者消失后提前返回。

mod channel;
mod garbage;
mod rcu;
mod reader;
mod state;
mod sync;

pub use channel::{Receiver, SendError, Sender, bounded};
pub use rcu::{Rcu, RcuWriter};
pub use reader::{ReadGuard, ReaderState};

#[cfg(test)]
mod tests;
