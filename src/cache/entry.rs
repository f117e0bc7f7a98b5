// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::lock_or_recover;
use crate::param::CompressionMethod;

/// 单个资源的缓存状态。
///
/// `(last_modified_utc, length)` 是资源在写入缓存时的身份，也是唯一的新鲜度判据。
/// 条目一旦过期就整体替换，从不原地修改这两个字段；变体只增不减。
#[derive(Debug)]
pub struct CacheEntry {
    last_modified_utc: DateTime<Utc>,
    length: u64,
    variants: Mutex<HashMap<CompressionMethod, Bytes>>,
    size_in_cache: AtomicU64,
}

impl CacheEntry {
    pub fn new(last_modified_utc: DateTime<Utc>, length: u64) -> Self {
        Self {
            last_modified_utc,
            length,
            variants: Mutex::new(HashMap::new()),
            size_in_cache: AtomicU64::new(0),
        }
    }

    pub fn last_modified_utc(&self) -> DateTime<Utc> {
        self.last_modified_utc
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// 该条目所有变体占用的字节数之和
    pub fn size_in_cache(&self) -> u64 {
        self.size_in_cache.load(Ordering::Acquire)
    }

    /// 判断条目是否仍然描述同一个版本的资源
    pub fn matches(&self, last_modified_utc: DateTime<Utc>, length: u64) -> bool {
        self.last_modified_utc == last_modified_utc && self.length == length
    }

    /// 取出某种压缩方式下的缓存字节。`Bytes` 的克隆只增加引用计数。
    pub fn variant(&self, method: CompressionMethod) -> Option<Bytes> {
        lock_or_recover(&self.variants).get(&method).cloned()
    }

    pub fn has_variant(&self, method: CompressionMethod) -> bool {
        lock_or_recover(&self.variants).contains_key(&method)
    }

    /// 写入一个变体，返回条目大小的增量。
    ///
    /// 只能由所属的分区在持有分区锁时调用，这样分区的总大小与条目大小始终一致。
    /// 并发请求可能重复生成同一个变体，此时保留先写入的那份，增量为 0。
    pub(super) fn store_variant(&self, method: CompressionMethod, content: Bytes) -> u64 {
        let mut variants = lock_or_recover(&self.variants);
        if variants.contains_key(&method) {
            return 0;
        }
        let added = content.len() as u64;
        variants.insert(method, content);
        self.size_in_cache.fetch_add(added, Ordering::AcqRel);
        added
    }
}
