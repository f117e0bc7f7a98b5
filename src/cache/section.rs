// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 缓存分区
//!
//! 每个挂载点独占一个分区，分区之间的键互不冲突。
//!
//! 条目按最近使用顺序串成一条双向链表。链表节点存放在一个 `Vec` 里，
//! `prev`/`next` 保存的是节点下标而不是指针，空出的槽位通过空闲列表复用，
//! 因此插入、删除、提升和淘汰都是 O(1)。
//!
//! 所有修改都在分区锁内完成，锁内只做下标和哈希表的调整，不做任何 I/O。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use log::debug;

use super::entry::CacheEntry;
use super::lock_or_recover;
use crate::param::CompressionMethod;

struct Node {
    key: String,
    entry: Arc<CacheEntry>,
    last_used_at: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Default)]
struct SectionState {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    oldest: Option<usize>,
    newest: Option<usize>,
    total_size: u64,
}

impl SectionState {
    fn node(&self, id: usize) -> &Node {
        self.nodes[id].as_ref().expect("链表下标指向了空槽位")
    }

    fn node_mut(&mut self, id: usize) -> &mut Node {
        self.nodes[id].as_mut().expect("链表下标指向了空槽位")
    }

    fn allocate(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    /// 把节点从链表中摘下，但不释放槽位
    fn unlink(&mut self, id: usize) {
        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.oldest = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.newest = prev,
        }
        let node = self.node_mut(id);
        node.prev = None;
        node.next = None;
    }

    /// 把已摘下的节点挂到链表尾部（最新）
    fn link_newest(&mut self, id: usize) {
        let previous_newest = self.newest;
        {
            let node = self.node_mut(id);
            node.prev = previous_newest;
            node.next = None;
        }
        match previous_newest {
            Some(p) => self.node_mut(p).next = Some(id),
            None => self.oldest = Some(id),
        }
        self.newest = Some(id);
    }

    fn release(&mut self, id: usize) -> Node {
        self.unlink(id);
        let node = self.nodes[id].take().expect("链表下标指向了空槽位");
        self.free.push(id);
        self.index.remove(&node.key);
        self.total_size -= node.entry.size_in_cache();
        node
    }
}

/// 单个挂载点的缓存分区。
pub struct CacheSection {
    name: String,
    state: Mutex<SectionState>,
}

impl CacheSection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(SectionState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 以最新节点的身份加入条目。
    ///
    /// 调用方应先 `remove` 旧条目；若两个并发请求同时未命中并先后加入同一个键，
    /// 后加入者替换前者，总大小仍保持一致。
    pub fn add(&self, path: &str, entry: Arc<CacheEntry>) {
        let mut state = lock_or_recover(&self.state);
        if let Some(existing) = state.index.get(path).copied() {
            debug!("分区{}中的键{}已存在，以后写入者为准", self.name, path);
            state.release(existing);
        }
        let size = entry.size_in_cache();
        let id = state.allocate(Node {
            key: path.to_string(),
            entry,
            last_used_at: Instant::now(),
            prev: None,
            next: None,
        });
        state.link_newest(id);
        state.index.insert(path.to_string(), id);
        state.total_size += size;
    }

    /// 删除条目；键不存在时什么也不做
    pub fn remove(&self, path: &str) {
        let mut state = lock_or_recover(&self.state);
        if let Some(id) = state.index.get(path).copied() {
            state.release(id);
        }
    }

    /// 查询条目。命中时把它提升为最新并刷新使用时间，未命中没有任何副作用。
    pub fn try_get(&self, path: &str) -> Option<Arc<CacheEntry>> {
        let mut state = lock_or_recover(&self.state);
        let id = state.index.get(path).copied()?;
        if state.newest != Some(id) {
            state.unlink(id);
            state.link_newest(id);
        }
        let node = state.node_mut(id);
        node.last_used_at = Instant::now();
        Some(Arc::clone(&node.entry))
    }

    /// 最久未使用节点的使用时间；分区为空时返回 `None`，相当于“无限远的未来”
    pub fn least_recent_use_time(&self) -> Option<Instant> {
        let state = lock_or_recover(&self.state);
        state.oldest.map(|id| state.node(id).last_used_at)
    }

    /// 淘汰最久未使用的条目，返回释放的字节数
    pub fn remove_least_recent_item(&self) -> u64 {
        let mut state = lock_or_recover(&self.state);
        match state.oldest {
            Some(id) => {
                let node = state.release(id);
                debug!("分区{}淘汰条目{}", self.name, node.key);
                node.entry.size_in_cache()
            }
            None => 0,
        }
    }

    pub fn clear(&self) {
        let mut state = lock_or_recover(&self.state);
        *state = SectionState::default();
    }

    /// 为条目追加一个变体。
    ///
    /// 只有当 `entry` 仍是该键当前对应的条目时才写入，
    /// 已被替换或淘汰的条目不会再占用缓存，返回值表示是否写入。
    pub fn add_variant(
        &self,
        path: &str,
        entry: &Arc<CacheEntry>,
        method: CompressionMethod,
        content: Bytes,
    ) -> bool {
        let mut state = lock_or_recover(&self.state);
        let current = match state.index.get(path) {
            Some(&id) => Arc::ptr_eq(&state.node(id).entry, entry),
            None => false,
        };
        if !current {
            return false;
        }
        let added = entry.store_variant(method, content);
        state.total_size += added;
        true
    }

    pub fn total_size(&self) -> u64 {
        lock_or_recover(&self.state).total_size
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.state).index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, path: &str) -> bool {
        lock_or_recover(&self.state).index.contains_key(path)
    }

    /// 从最旧到最新列出所有键，仅用于诊断
    pub fn keys_oldest_first(&self) -> Vec<String> {
        let state = lock_or_recover(&self.state);
        let mut keys = Vec::with_capacity(state.index.len());
        let mut cursor = state.oldest;
        while let Some(id) = cursor {
            let node = state.node(id);
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }

    /// 全量扫描重新计算总大小，仅用于诊断
    pub fn computed_size(&self) -> u64 {
        let state = lock_or_recover(&self.state);
        state
            .nodes
            .iter()
            .flatten()
            .map(|node| node.entry.size_in_cache())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn entry_with_size(size: usize) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(Utc::now(), size as u64));
        entry.store_variant(CompressionMethod::None, Bytes::from(vec![b'x'; size]));
        entry
    }

    #[test]
    fn test_add_and_try_get() {
        let section = CacheSection::new("/");
        section.add("/a.txt", entry_with_size(10));
        assert_eq!(section.len(), 1);
        assert_eq!(section.total_size(), 10);
        assert!(section.try_get("/a.txt").is_some());
        assert!(section.try_get("/b.txt").is_none());
    }

    #[test]
    fn test_try_get_promotes_to_newest() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(1));
        section.add("/b", entry_with_size(1));
        section.add("/c", entry_with_size(1));
        assert_eq!(section.keys_oldest_first(), vec!["/a", "/b", "/c"]);

        section.try_get("/a");
        assert_eq!(section.keys_oldest_first(), vec!["/b", "/c", "/a"]);

        section.try_get("/a");
        assert_eq!(section.keys_oldest_first(), vec!["/b", "/c", "/a"]);
    }

    #[test]
    fn test_miss_has_no_side_effects() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(1));
        section.add("/b", entry_with_size(1));
        section.try_get("/missing");
        assert_eq!(section.keys_oldest_first(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_remove_fixes_both_ends() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(1));
        section.add("/b", entry_with_size(2));
        section.add("/c", entry_with_size(3));

        section.remove("/a");
        assert_eq!(section.keys_oldest_first(), vec!["/b", "/c"]);
        section.remove("/c");
        assert_eq!(section.keys_oldest_first(), vec!["/b"]);
        assert_eq!(section.total_size(), 2);
        section.remove("/b");
        assert!(section.is_empty());
        assert_eq!(section.total_size(), 0);
        assert!(section.least_recent_use_time().is_none());

        section.remove("/b");
        assert!(section.is_empty());
    }

    #[test]
    fn test_remove_middle_node() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(1));
        section.add("/b", entry_with_size(1));
        section.add("/c", entry_with_size(1));
        section.remove("/b");
        assert_eq!(section.keys_oldest_first(), vec!["/a", "/c"]);
    }

    #[test]
    fn test_remove_least_recent_item() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(5));
        section.add("/b", entry_with_size(7));
        section.try_get("/a");

        assert_eq!(section.remove_least_recent_item(), 7);
        assert!(!section.contains_key("/b"));
        assert_eq!(section.remove_least_recent_item(), 5);
        assert_eq!(section.remove_least_recent_item(), 0);
    }

    #[test]
    fn test_least_recent_use_time_tracks_oldest() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(1));
        let first = section.least_recent_use_time().unwrap();
        section.add("/b", entry_with_size(1));
        assert_eq!(section.least_recent_use_time(), Some(first));
        section.try_get("/a");
        assert!(section.least_recent_use_time().unwrap() >= first);
    }

    #[test]
    fn test_add_existing_key_replaces() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(10));
        section.add("/a", entry_with_size(3));
        assert_eq!(section.len(), 1);
        assert_eq!(section.total_size(), 3);
    }

    #[test]
    fn test_add_variant_updates_total() {
        let section = CacheSection::new("/");
        let entry = Arc::new(CacheEntry::new(Utc::now(), 4));
        section.add("/a", Arc::clone(&entry));
        assert_eq!(section.total_size(), 0);

        assert!(section.add_variant("/a", &entry, CompressionMethod::None, Bytes::from("abcd")));
        assert!(section.add_variant("/a", &entry, CompressionMethod::Gzip, Bytes::from("zz")));
        assert_eq!(section.total_size(), 6);
        assert_eq!(section.computed_size(), 6);
    }

    #[test]
    fn test_add_variant_ignores_replaced_entry() {
        let section = CacheSection::new("/");
        let stale = Arc::new(CacheEntry::new(Utc::now(), 4));
        section.add("/a", Arc::clone(&stale));
        section.remove("/a");
        section.add("/a", Arc::new(CacheEntry::new(Utc::now(), 8)));

        assert!(!section.add_variant("/a", &stale, CompressionMethod::None, Bytes::from("abcd")));
        assert_eq!(section.total_size(), 0);
    }

    #[test]
    fn test_clear() {
        let section = CacheSection::new("/");
        section.add("/a", entry_with_size(1));
        section.add("/b", entry_with_size(1));
        section.clear();
        assert!(section.is_empty());
        assert_eq!(section.total_size(), 0);
        assert!(section.keys_oldest_first().is_empty());
        section.add("/c", entry_with_size(2));
        assert_eq!(section.keys_oldest_first(), vec!["/c"]);
    }

    #[test]
    fn test_slots_are_reused() {
        let section = CacheSection::new("/");
        for round in 0..3 {
            for i in 0..10 {
                section.add(&format!("/{}-{}", round, i), entry_with_size(1));
            }
            for i in 0..10 {
                section.remove(&format!("/{}-{}", round, i));
            }
        }
        assert!(lock_or_recover(&section.state).nodes.len() <= 10);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, u16),
        Get(u8),
        Remove(u8),
        Evict,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16, 0u16..512).prop_map(|(k, s)| Op::Add(k, s)),
            (0u8..16).prop_map(Op::Get),
            (0u8..16).prop_map(Op::Remove),
            Just(Op::Evict),
        ]
    }

    proptest! {
        #[test]
        fn prop_lru_order_and_size_accounting(ops in proptest::collection::vec(op_strategy(), 1..200)) {
            let section = CacheSection::new("/");
            // 参照模型：按最近使用顺序排列的 (键, 大小)
            let mut model: Vec<(String, u64)> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(k, s) => {
                        let key = format!("/{}", k);
                        model.retain(|(m, _)| m != &key);
                        model.push((key.clone(), s as u64));
                        section.add(&key, entry_with_size(s as usize));
                    }
                    Op::Get(k) => {
                        let key = format!("/{}", k);
                        if let Some(pos) = model.iter().position(|(m, _)| m == &key) {
                            let item = model.remove(pos);
                            model.push(item);
                            prop_assert!(section.try_get(&key).is_some());
                        } else {
                            prop_assert!(section.try_get(&key).is_none());
                        }
                    }
                    Op::Remove(k) => {
                        let key = format!("/{}", k);
                        model.retain(|(m, _)| m != &key);
                        section.remove(&key);
                    }
                    Op::Evict => {
                        let expected = if model.is_empty() { 0 } else { model.remove(0).1 };
                        prop_assert_eq!(section.remove_least_recent_item(), expected);
                    }
                }

                let keys: Vec<String> = model.iter().map(|(k, _)| k.clone()).collect();
                prop_assert_eq!(section.keys_oldest_first(), keys);
                let expected_size: u64 = model.iter().map(|(_, s)| *s).sum();
                prop_assert_eq!(section.total_size(), expected_size);
                prop_assert_eq!(section.computed_size(), expected_size);
                prop_assert_eq!(section.least_recent_use_time().is_none(), model.is_empty());
            }
        }
    }
}
