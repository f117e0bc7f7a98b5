// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源缓存
//!
//! `ResourceCache` 管理所有挂载点的缓存分区，并维护一个全局的容量上限。
//! 只要还有分区注册，就会有一个后台淘汰任务周期性运行：
//! 总大小超过 `max_size_kb` 时，反复在所有分区中找出全局最久未使用的条目并淘汰，
//! 直到总大小降到上限的 973/1024 以下，避免刚淘汰完又被下一次写入触发。
//!
//! 缓存实例通过依赖注入传递，不存在全局单例。

mod entry;
mod section;

pub use entry::CacheEntry;
pub use section::CacheSection;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 默认缓存总容量（KB）
pub const DEFAULT_MAX_SIZE_KB: u64 = 10240;
/// 默认单个文件可缓存的最大尺寸（KB）
pub const DEFAULT_MAX_FILE_SIZE_KB: u64 = 200;
/// `max_file_size_kb` 的上限
pub const MAX_FILE_SIZE_KB_LIMIT: u64 = 2097151;
/// 默认淘汰周期
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// 淘汰目标：降到上限的 973/1024
const EVICTION_TARGET_NUMERATOR: u64 = 973;
const EVICTION_TARGET_DENOMINATOR: u64 = 1024;

/// 获取互斥锁；若锁被污染则恢复并继续
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("缓存锁被污染，恢复并继续");
            poisoned.into_inner()
        }
    }
}

struct EvictionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// 缓存的诊断统计，通过全量扫描得到
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub sections: usize,
    pub entries: usize,
    pub total_size: u64,
}

pub struct ResourceCache {
    sections: Mutex<HashMap<String, Arc<CacheSection>>>,
    // 单独计数，避免每次判断都锁住整个表
    section_count: AtomicUsize,
    max_size_kb: AtomicU64,
    max_file_size_kb: AtomicU64,
    eviction_interval: Duration,
    eviction: Mutex<Option<EvictionTask>>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::with_eviction_interval(DEFAULT_EVICTION_INTERVAL)
    }

    pub fn with_eviction_interval(eviction_interval: Duration) -> Self {
        Self {
            sections: Mutex::new(HashMap::new()),
            section_count: AtomicUsize::new(0),
            max_size_kb: AtomicU64::new(DEFAULT_MAX_SIZE_KB),
            max_file_size_kb: AtomicU64::new(DEFAULT_MAX_FILE_SIZE_KB),
            eviction_interval,
            eviction: Mutex::new(None),
        }
    }

    /// 单进程场景的便捷构造：按配置设置容量并包装为 `Arc`
    pub fn shared(max_size_kb: u64, max_file_size_kb: u64) -> Arc<Self> {
        let cache = Self::new();
        cache.set_max_size_kb(max_size_kb);
        cache.set_max_file_size_kb(max_file_size_kb);
        Arc::new(cache)
    }

    pub fn max_size_kb(&self) -> u64 {
        self.max_size_kb.load(Ordering::Relaxed)
    }

    /// 设置缓存总容量，小于 1 的值会被修正为 1
    pub fn set_max_size_kb(&self, value: u64) {
        let clamped = value.max(1);
        if clamped != value {
            warn!("max_size_kb={}超出范围，已修正为{}", value, clamped);
        }
        self.max_size_kb.store(clamped, Ordering::Relaxed);
    }

    pub fn max_file_size_kb(&self) -> u64 {
        self.max_file_size_kb.load(Ordering::Relaxed)
    }

    /// 设置单文件缓存阈值，超过上限的值会被修正
    pub fn set_max_file_size_kb(&self, value: u64) {
        let clamped = value.min(MAX_FILE_SIZE_KB_LIMIT);
        if clamped != value {
            warn!("max_file_size_kb={}超出范围，已修正为{}", value, clamped);
        }
        self.max_file_size_kb.store(clamped, Ordering::Relaxed);
    }

    /// 单个资源允许写入缓存的最大字节数
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_kb() * 1024
    }

    pub fn section_count(&self) -> usize {
        self.section_count.load(Ordering::Acquire)
    }

    /// 注册一个新分区。同名分区已存在说明调用方有 bug，直接 panic。
    ///
    /// 有分区且淘汰任务未运行时启动后台淘汰任务。
    pub fn add_section(self: &Arc<Self>, name: &str) -> Arc<CacheSection> {
        let mut sections = lock_or_recover(&self.sections);
        if sections.contains_key(name) {
            panic!("缓存分区{}已存在，同一个缓存中的分区名称必须唯一", name);
        }
        let section = Arc::new(CacheSection::new(name));
        sections.insert(name.to_string(), Arc::clone(&section));
        let count = self.section_count.fetch_add(1, Ordering::AcqRel) + 1;
        info!("缓存分区{}已注册，当前分区数：{}", name, count);
        // 首个分区注册时若不在运行时中，之后在运行时中注册分区时补启动
        self.start_eviction();
        section
    }

    /// 注销分区并清空其内容；最后一个分区注销时停止淘汰任务
    pub fn remove_section(&self, name: &str) {
        let mut sections = lock_or_recover(&self.sections);
        let Some(section) = sections.remove(name) else {
            return;
        };
        section.clear();
        let count = self.section_count.fetch_sub(1, Ordering::AcqRel) - 1;
        info!("缓存分区{}已注销，当前分区数：{}", name, count);
        if count == 0 {
            self.stop_eviction();
        }
    }

    pub fn section(&self, name: &str) -> Option<Arc<CacheSection>> {
        lock_or_recover(&self.sections).get(name).cloned()
    }

    /// 停止淘汰任务并注销所有分区
    pub fn shutdown(&self) {
        let mut sections = lock_or_recover(&self.sections);
        for (_, section) in sections.drain() {
            section.clear();
        }
        self.section_count.store(0, Ordering::Release);
        self.stop_eviction();
    }

    pub fn is_eviction_running(&self) -> bool {
        lock_or_recover(&self.eviction).is_some()
    }

    pub fn stats(&self) -> CacheStats {
        let sections = self.snapshot_sections();
        CacheStats {
            sections: sections.len(),
            entries: sections.iter().map(|s| s.len()).sum(),
            total_size: sections.iter().map(|s| s.computed_size()).sum(),
        }
    }

    fn snapshot_sections(&self) -> Vec<Arc<CacheSection>> {
        lock_or_recover(&self.sections).values().cloned().collect()
    }

    fn start_eviction(self: &Arc<Self>) {
        let mut eviction = lock_or_recover(&self.eviction);
        if eviction.is_some() {
            return;
        }
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("当前线程不在Tokio运行时中，缓存淘汰任务不会启动");
                return;
            }
        };
        let cancel = CancellationToken::new();
        let task = handle.spawn(eviction_loop(
            Arc::downgrade(self),
            self.eviction_interval,
            cancel.clone(),
        ));
        info!("缓存淘汰任务已启动，周期{:?}", self.eviction_interval);
        *eviction = Some(EvictionTask {
            cancel,
            handle: task,
        });
    }

    fn stop_eviction(&self) {
        if let Some(task) = lock_or_recover(&self.eviction).take() {
            task.cancel.cancel();
            // 任务会在下一个挂起点观察到取消并退出，这里不等待
            drop(task.handle);
            info!("缓存淘汰任务已停止");
        }
    }

    /// 执行一轮淘汰，返回释放的字节数。
    ///
    /// 每淘汰一个条目就让出一次调度，避免大量淘汰时独占运行时。
    pub async fn evict(&self, cancel: &CancellationToken) -> u64 {
        let sections = self.snapshot_sections();
        let max_size_kb = self.max_size_kb();
        let mut total = total_size(&sections);
        if total / 1024 <= max_size_kb {
            return 0;
        }

        let target = max_size_kb * 1024 * EVICTION_TARGET_NUMERATOR / EVICTION_TARGET_DENOMINATOR;
        debug!(
            "缓存总大小{} bytes超出上限{} KB，开始淘汰，目标{} bytes",
            total, max_size_kb, target
        );
        let mut freed = 0;
        while total > target {
            if cancel.is_cancelled() {
                debug!("缓存淘汰被取消");
                break;
            }
            let victim = sections
                .iter()
                .filter_map(|section| section.least_recent_use_time().map(|t| (t, section)))
                .min_by_key(|(time, _)| *time);
            let Some((_, section)) = victim else {
                break;
            };
            freed += section.remove_least_recent_item();
            tokio::task::yield_now().await;
            total = total_size(&sections);
        }
        debug!("本轮淘汰释放{} bytes，当前总大小{} bytes", freed, total);
        freed
    }
}

fn total_size(sections: &[Arc<CacheSection>]) -> u64 {
    sections.iter().map(|s| s.total_size()).sum()
}

async fn eviction_loop(cache: Weak<ResourceCache>, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let Some(cache) = cache.upgrade() else {
            break;
        };
        cache.evict(&cancel).await;
    }
    debug!("缓存淘汰循环退出");
}
