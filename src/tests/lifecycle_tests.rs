/// 生命周期和内存安全测试模块
/// 测试守卫生命周期、负载析构计数和句柄销毁顺序
use crate::{Rcu, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Counted {
    value: i32,
    drops: Arc<AtomicUsize>,
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn counted(value: i32, drops: &Arc<AtomicUsize>) -> Counted {
    Counted {
        value,
        drops: drops.clone(),
    }
}

/// 测试1: 守卫生命周期约束 —— 引用在守卫存活期间有效
#[test]
fn test_guard_lifetime_constraint() {
    let (_writer, rcu) = Rcu::new(42i32);
    let mut reader = rcu.register_reader();

    let guard = reader.read();
    let value: &i32 = &guard;
    assert_eq!(*value, 42);
    // guard 在这里被 drop，引用随之失效（编译器保证）
}

/// 测试2: 从不更新时，负载随最后一个句柄释放，恰好一次
#[test]
fn test_initial_payload_dropped_once() {
    let drops = Arc::new(AtomicUsize::new(0));

    {
        let (_writer, rcu) = Rcu::new(counted(1, &drops));
        let mut reader = rcu.register_reader();
        let guard = reader.read();
        assert_eq!(guard.value, 1);
    }

    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

/// 测试3: 守卫 drop 后的回收 —— drop 回调验证
#[test]
fn test_reclamation_after_guard_drop() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut writer, rcu) = Rcu::new(counted(1, &drops));
    let mut reader = rcu.register_reader();

    let guard = reader.read();
    writer.update(counted(2, &drops));

    // 守卫仍然钉住初始负载
    assert_eq!(guard.value, 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    drop(guard);
    writer.collect();

    // 初始负载恰好被释放一次
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

/// 测试4: 读者状态 drop 即注销 —— 写入者不再把它当作活跃
#[test]
fn test_reader_state_drop_unregisters() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut writer, rcu) = Rcu::new(counted(1, &drops));

    let mut reader = rcu.register_reader();
    {
        let _guard = reader.read();
    }
    drop(reader);

    writer.update(counted(2, &drops));
    writer.update(counted(3, &drops));

    // 已注销的读者不阻止任何回收
    assert_eq!(writer.retired_len(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

/// 测试5: 写入者先于活跃读者被 drop —— 被钉住的负载寄存到共享状态
#[test]
fn test_writer_dropped_before_reader() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (mut writer, rcu) = Rcu::new(counted(1, &drops));
    let mut reader = rcu.register_reader();

    let guard = reader.read();
    writer.update(counted(2, &drops));
    drop(writer);

    // 守卫仍可安全访问被替换下来的负载
    assert_eq!(guard.value, 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    drop(guard);
    drop(reader);
    drop(rcu);

    // 两个负载（寄存的旧负载 + 当前负载）都恰好释放一次
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

/// 测试6: 通道销毁时排空剩余条目
#[test]
fn test_channel_drops_queued_items() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = bounded(4);

    sender.send(counted(1, &drops)).unwrap();
    sender.send(counted(2, &drops)).unwrap();
    sender.send(counted(3, &drops)).unwrap();

    drop(sender);
    drop(receiver);

    assert_eq!(drops.load(Ordering::SeqCst), 3);
}

/// 测试7: Disconnected 返还的负载由调用者释放
#[test]
fn test_disconnected_payload_ownership() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = bounded(4);
    drop(receiver);

    let err = sender.send(counted(1, &drops)).unwrap_err();
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    let payload = err.into_inner();
    assert_eq!(payload.value, 1);
    drop(payload);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

/// 测试8: 接收到的条目归接收者所有
#[test]
fn test_received_item_ownership() {
    let drops = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = bounded(2);

    sender.send(counted(7, &drops)).unwrap();
    let item = receiver.try_recv().unwrap();
    assert_eq!(item.value, 7);

    drop(sender);
    drop(receiver);
    // 通道销毁不触碰已移出的条目
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    drop(item);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}
