#![allow(dead_code)]

use h1_cgi::{Error, Limits, Request};
use std::sync::Once;

pub fn setup_logger() {
    static START: Once = Once::new();
    START.call_once(|| {
        let test_log = std::env::var("TEST_LOG")
            .map(|x| x != "0" && x.to_lowercase() != "false")
            .unwrap_or(false);
        let level = if test_log {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        };
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Warn)
            .filter_module("h1_cgi", level)
            .target(env_logger::Target::Stdout)
            .init();
    });
}

/// Line endings to CRLF, for requests written as multi line literals.
pub fn crlf(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Parse `raw` in one go. The request is returned even if incomplete.
pub fn parse(raw: &[u8]) -> Result<Request, Error> {
    parse_with(raw, Limits::default())
}

pub fn parse_with(raw: &[u8], limits: Limits) -> Result<Request, Error> {
    setup_logger();
    let mut req = Request::with_limits(limits);
    req.parse(raw)?;
    Ok(req)
}

/// Parse `raw` delivered in chunks of `size` bytes.
pub fn parse_split(raw: &[u8], size: usize) -> Result<Request, Error> {
    setup_logger();
    let mut req = Request::new();
    for chunk in raw.chunks(size) {
        req.parse(chunk)?;
    }
    Ok(req)
}

/// Deterministic pseudo random bytes, so failures can be reproduced.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(seed | 1)
    }

    pub fn next(&mut self) -> u64 {
        // xorshift64
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    /// Between `min` and `min + max` bytes. Readable data is lowercase hex,
    /// otherwise any byte value.
    pub fn data(&mut self, min: usize, max: usize, readable: bool) -> Vec<u8> {
        let count = min + self.below(max as u64 + 1) as usize;
        let mut v = count.to_string().into_bytes();
        v.push(b'/');
        for _ in 0..count {
            let n = self.next();
            if readable {
                v.push(b"0123456789abcdef"[(n % 16) as usize]);
            } else {
                v.push((n >> 24) as u8);
            }
        }
        v
    }
}
