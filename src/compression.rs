// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 压缩包装器
//!
//! `Compressor` 按协商出的压缩方式对写入的数据进行编码，并统计写入的未压缩字节数。
//! 它既用于把内容完整压缩进内存以便写入缓存，也用于流式传输：
//! 每写入一块数据后调用 `take_output` 取走已经产生的压缩字节即可转发给客户端。

use std::io::{self, Write};

use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::debug;

use crate::param::CompressionMethod;

enum Encoder {
    Identity(Vec<u8>),
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(DeflateEncoder<Vec<u8>>),
}

pub struct Compressor {
    method: CompressionMethod,
    encoder: Encoder,
    uncompressed_len: u64,
}

impl Compressor {
    pub fn new(method: CompressionMethod) -> Self {
        let encoder = match method {
            CompressionMethod::None => Encoder::Identity(Vec::new()),
            CompressionMethod::Gzip => {
                Encoder::Gzip(GzEncoder::new(Vec::new(), Compression::default()))
            }
            CompressionMethod::Deflate => {
                Encoder::Deflate(DeflateEncoder::new(Vec::new(), Compression::default()))
            }
        };
        Self {
            method,
            encoder,
            uncompressed_len: 0,
        }
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// 已写入的未压缩字节数
    pub fn uncompressed_len(&self) -> u64 {
        self.uncompressed_len
    }

    /// 取走目前为止产生的输出字节
    pub fn take_output(&mut self) -> Vec<u8> {
        match &mut self.encoder {
            Encoder::Identity(buffer) => std::mem::take(buffer),
            Encoder::Gzip(encoder) => std::mem::take(encoder.get_mut()),
            Encoder::Deflate(encoder) => std::mem::take(encoder.get_mut()),
        }
    }

    /// 结束编码，返回尚未取走的全部输出（包括压缩流的尾部）
    pub fn finish(self) -> io::Result<Vec<u8>> {
        let uncompressed_len = self.uncompressed_len;
        let method = self.method;
        let output = match self.encoder {
            Encoder::Identity(buffer) => buffer,
            Encoder::Gzip(encoder) => encoder.finish()?,
            Encoder::Deflate(encoder) => encoder.finish()?,
        };
        debug!(
            "压缩完成: {}, 原始大小: {} bytes, 剩余输出: {} bytes",
            method,
            uncompressed_len,
            output.len()
        );
        Ok(output)
    }
}

impl Write for Compressor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = match &mut self.encoder {
            Encoder::Identity(buffer) => {
                buffer.extend_from_slice(buf);
                buf.len()
            }
            Encoder::Gzip(encoder) => encoder.write(buf)?,
            Encoder::Deflate(encoder) => encoder.write(buf)?,
        };
        self.uncompressed_len += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.encoder {
            Encoder::Identity(_) => Ok(()),
            Encoder::Gzip(encoder) => encoder.flush(),
            Encoder::Deflate(encoder) => encoder.flush(),
        }
    }
}

/// 一次性压缩整块数据
pub fn compress(data: &[u8], method: CompressionMethod) -> io::Result<Vec<u8>> {
    let mut compressor = Compressor::new(method);
    compressor.write_all(data)?;
    compressor.finish()
}

/// 已经经过压缩的媒体类型，再压缩只会浪费 CPU
pub fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/jpeg",
        "image/jpg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/avif",
        "image/x-icon",
        "video/",
        "audio/",
        "application/zip",
        "application/x-rar",
        "application/x-7z-compressed",
        "application/gzip",
        "application/x-gzip",
        "font/woff",
        "font/woff2",
        "application/vnd.ms-fontobject",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}
