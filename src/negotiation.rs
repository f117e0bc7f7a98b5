// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容编码协商
//!
//! 根据 `Accept-Encoding`（RFC 7231 §5.3.4）在 identity、gzip、deflate 之间做主动协商。
//! 没有任何可接受的编码时，由协商方直接写出 406 响应。

use std::io;

use log::debug;
use tokio::io::AsyncWrite;

use crate::context::{HttpContext, StatusResponse};
use crate::param::CompressionMethod;

#[derive(Debug, Default)]
struct Preferences {
    gzip: Option<f32>,
    deflate: Option<f32>,
    identity: Option<f32>,
    any: Option<f32>,
}

fn parse_quality(params: &str) -> f32 {
    for param in params.split(';') {
        if let Some((name, value)) = param.split_once('=') {
            if name.trim().eq_ignore_ascii_case("q") {
                return value.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
            }
        }
    }
    1.0
}

fn parse_preferences(header: &str) -> Preferences {
    let mut preferences = Preferences::default();
    for item in header.split(',') {
        let (coding, params) = match item.split_once(';') {
            Some((coding, params)) => (coding, params),
            None => (item, ""),
        };
        let quality = parse_quality(params);
        match coding.trim().to_lowercase().as_str() {
            "gzip" | "x-gzip" => preferences.gzip = Some(quality),
            "deflate" => preferences.deflate = Some(quality),
            "identity" => preferences.identity = Some(quality),
            "*" => preferences.any = Some(quality),
            _ => {}
        }
    }
    preferences
}

/// 选择响应使用的压缩方式；返回 `None` 表示没有可接受的编码。
///
/// 按 q 值选择权重最高的编码（压缩方式之间同权重时 gzip 优先）。压缩与 identity 权重相同时，
/// `prefer_compression` 为 true 则压缩，否则不压缩。
pub fn negotiate(accept_encoding: Option<&str>, prefer_compression: bool) -> Option<CompressionMethod> {
    let header = match accept_encoding {
        Some(h) => h,
        None => return Some(CompressionMethod::None),
    };
    let preferences = parse_preferences(header);

    let gzip = preferences.gzip.or(preferences.any).unwrap_or(0.0);
    let deflate = preferences.deflate.or(preferences.any).unwrap_or(0.0);
    let explicit_identity = preferences.identity.or(preferences.any);

    let best_compression = if gzip > 0.0 && gzip >= deflate {
        Some((CompressionMethod::Gzip, gzip))
    } else if deflate > 0.0 {
        Some((CompressionMethod::Deflate, deflate))
    } else {
        None
    };

    // 未列出 identity 时它总是可接受的，但没有自己的权重，视为与最佳压缩方式同权重
    let identity = match (explicit_identity, best_compression) {
        (Some(weight), _) => weight,
        (None, Some((_, weight))) => weight,
        (None, None) => 1.0,
    };

    match best_compression {
        // 权重更高的一方胜出，权重相同时由 prefer_compression 决定
        Some((method, weight)) if weight > identity || (weight == identity && prefer_compression) => {
            Some(method)
        }
        _ if identity > 0.0 => Some(CompressionMethod::None),
        _ => None,
    }
}

impl<W: AsyncWrite + Unpin + Send> HttpContext<W> {
    /// 协商压缩方式。协商失败时直接写出 406 并返回 `Ok(None)`，调用方应立即结束处理。
    pub async fn try_determine_compression(
        &mut self,
        prefer_compression: bool,
    ) -> io::Result<Option<CompressionMethod>> {
        let accept_encoding = self.request().accept_encoding().map(|s| s.to_string());
        match negotiate(accept_encoding.as_deref(), prefer_compression) {
            Some(method) => {
                debug!("[ID{}]协商得到的压缩方式：{}", self.id(), method);
                Ok(Some(method))
            }
            None => {
                debug!(
                    "[ID{}]无法满足Accept-Encoding：{:?}，返回406",
                    self.id(),
                    accept_encoding
                );
                let page = StatusResponse::html(406, None);
                self.send_status_response(&page).await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::HttpRequestMethod;
    use crate::request::Request;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_no_header_means_identity() {
        assert_eq!(negotiate(None, true), Some(CompressionMethod::None));
    }

    #[test]
    fn test_prefers_gzip_when_compression_preferred() {
        assert_eq!(negotiate(Some("gzip, deflate, br"), true), Some(CompressionMethod::Gzip));
        assert_eq!(negotiate(Some("deflate"), true), Some(CompressionMethod::Deflate));
        assert_eq!(
            negotiate(Some("gzip;q=0.5, deflate;q=0.8"), true),
            Some(CompressionMethod::Deflate)
        );
    }

    #[test]
    fn test_unlisted_identity_ties_with_compression() {
        assert_eq!(negotiate(Some("gzip;q=0.3"), true), Some(CompressionMethod::Gzip));
        assert_eq!(negotiate(Some("gzip;q=0.3"), false), Some(CompressionMethod::None));
    }

    #[test]
    fn test_quality_ordering_between_identity_and_compression() {
        assert_eq!(
            negotiate(Some("gzip;q=0.1, identity;q=1"), true),
            Some(CompressionMethod::None)
        );
        assert_eq!(
            negotiate(Some("deflate;q=0.4, identity;q=0.5"), true),
            Some(CompressionMethod::None)
        );
        assert_eq!(
            negotiate(Some("gzip;q=0.9, identity;q=0.5"), false),
            Some(CompressionMethod::Gzip)
        );
        assert_eq!(
            negotiate(Some("gzip;q=0.5, identity;q=0.5"), true),
            Some(CompressionMethod::Gzip)
        );
        assert_eq!(
            negotiate(Some("gzip;q=0.5, identity;q=0.5"), false),
            Some(CompressionMethod::None)
        );
    }

    #[test]
    fn test_identity_when_not_preferred() {
        assert_eq!(negotiate(Some("gzip, deflate"), false), Some(CompressionMethod::None));
    }

    #[test]
    fn test_compression_forced_when_identity_refused() {
        assert_eq!(
            negotiate(Some("gzip, identity;q=0"), false),
            Some(CompressionMethod::Gzip)
        );
        assert_eq!(negotiate(Some("*;q=0, deflate"), false), Some(CompressionMethod::Deflate));
    }

    #[test]
    fn test_unknown_codings_fall_back_to_identity() {
        assert_eq!(negotiate(Some("br"), true), Some(CompressionMethod::None));
        assert_eq!(negotiate(Some(""), true), Some(CompressionMethod::None));
    }

    #[test]
    fn test_nothing_acceptable() {
        assert_eq!(negotiate(Some("identity;q=0"), true), None);
        assert_eq!(negotiate(Some("*;q=0"), true), None);
        assert_eq!(negotiate(Some("br, *;q=0"), false), None);
    }

    #[test]
    fn test_wildcard_enables_gzip() {
        assert_eq!(negotiate(Some("*"), true), Some(CompressionMethod::Gzip));
    }

    #[tokio::test]
    async fn test_failed_negotiation_writes_406() {
        let request =
            Request::new(HttpRequestMethod::Get, "/").with_header("Accept-Encoding", "identity;q=0");
        let mut ctx = HttpContext::new(7, request, Vec::new(), CancellationToken::new());
        let result = ctx.try_determine_compression(true).await.unwrap();
        assert!(result.is_none());
        assert!(ctx.headers_sent());
        let output = String::from_utf8(ctx.into_writer()).unwrap();
        assert!(output.starts_with("HTTP/1.1 406 Not Acceptable"));
    }
}
