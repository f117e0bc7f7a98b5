// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 字节范围请求
//!
//! 只支持单个 `bytes` 范围。多段范围、非 `bytes` 单位以及无法解析的头部都按完整响应处理。

use chrono::{DateTime, Utc};
use log::debug;

use crate::util::{parse_http_date, truncate_to_seconds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    /// 返回完整资源
    Full,
    /// 返回闭区间 `[start, end]`
    Partial { start: u64, end: u64 },
    /// 416
    Unsatisfiable,
}

impl RangeDecision {
    pub fn content_range(&self, total: u64) -> Option<String> {
        match *self {
            RangeDecision::Full => None,
            RangeDecision::Partial { start, end } => Some(format!("bytes {}-{}/{}", start, end, total)),
            RangeDecision::Unsatisfiable => Some(format!("bytes */{}", total)),
        }
    }
}

/// `If-Range` 的校验器与当前表示不匹配时返回 false，此时应忽略 Range
fn if_range_matches(if_range: &str, etag: &str, last_modified: &DateTime<Utc>) -> bool {
    let if_range = if_range.trim();
    if if_range.starts_with('"') {
        // 强比较
        return if_range == etag;
    }
    if if_range.starts_with("W/") {
        return false;
    }
    match parse_http_date(if_range) {
        Some(date) => date == truncate_to_seconds(last_modified),
        None => false,
    }
}

/// 根据 `Range`/`If-Range` 头决定如何响应一个长度为 `content_length` 的未压缩表示
pub fn evaluate(
    range: Option<&str>,
    if_range: Option<&str>,
    content_length: u64,
    etag: &str,
    last_modified: &DateTime<Utc>,
) -> RangeDecision {
    let range = match range {
        Some(r) => r.trim(),
        None => return RangeDecision::Full,
    };
    if let Some(if_range) = if_range {
        if !if_range_matches(if_range, etag, last_modified) {
            debug!("If-Range不匹配，忽略Range：{}", range);
            return RangeDecision::Full;
        }
    }

    let spec = match range.split_once('=') {
        Some((unit, spec)) if unit.trim().eq_ignore_ascii_case("bytes") => spec.trim(),
        _ => return RangeDecision::Full,
    };
    if spec.contains(',') {
        debug!("不支持多段范围请求，返回完整资源：{}", range);
        return RangeDecision::Full;
    }
    let (first, last) = match spec.split_once('-') {
        Some((first, last)) => (first.trim(), last.trim()),
        None => return RangeDecision::Full,
    };

    if first.is_empty() {
        // 后缀范围：最后 n 个字节
        let suffix = match last.parse::<u64>() {
            Ok(n) => n,
            Err(_) => return RangeDecision::Full,
        };
        if suffix == 0 || content_length == 0 {
            return RangeDecision::Unsatisfiable;
        }
        let start = content_length.saturating_sub(suffix);
        return RangeDecision::Partial {
            start,
            end: content_length - 1,
        };
    }

    let start = match first.parse::<u64>() {
        Ok(n) => n,
        Err(_) => return RangeDecision::Full,
    };
    if last.is_empty() {
        // 开放范围：从 start 到末尾
        if start >= content_length {
            return RangeDecision::Unsatisfiable;
        }
        return RangeDecision::Partial {
            start,
            end: content_length - 1,
        };
    }

    let end = match last.parse::<u64>() {
        Ok(n) => n,
        Err(_) => return RangeDecision::Full,
    };
    if end < start {
        return RangeDecision::Full;
    }
    if start >= content_length || end >= content_length {
        return RangeDecision::Unsatisfiable;
    }
    RangeDecision::Partial { start, end }
}
