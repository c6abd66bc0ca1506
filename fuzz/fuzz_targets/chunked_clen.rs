#![no_main]
use libfuzzer_sys::fuzz_target;

use h1_cgi::{Limits, Request};

// Well formed head, fuzzed body framing.
fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }

    let mut head = b"POST / HTTP/1.1\r\nHost: fuzz\r\n".to_vec();

    if data[0] < 128 {
        head.extend_from_slice(b"Transfer-Encoding: chunked\r\n");
    } else {
        let mut arr = [0_u8; 8];
        arr.copy_from_slice(&data[1..9]);
        let size = u64::from_be_bytes(arr) % 100_000;
        head.extend_from_slice(format!("Content-Length: {}\r\n", size).as_bytes());
    }
    head.extend_from_slice(b"\r\n");

    let mut limits = Limits::default();
    limits.max_body_in_memory = 1024;
    limits.max_body_size = Some(50_000);

    let mut req = Request::with_limits(limits);
    if req.parse(&head).is_err() {
        // content-length above max_body_size
        assert!(data[0] >= 128);
        return;
    }

    match req.consume(&data[9..]) {
        Ok(used) => {
            assert!(used <= data.len() - 9);
            if req.is_finished() {
                let body = req.body_mut().read_all().unwrap();
                assert_eq!(body.len() as u64, req.body().len());
            } else {
                assert_eq!(used, data.len() - 9);
            }
        }
        Err(_) => {
            assert!(req.is_failed());
            assert!(req.env().is_empty());
        }
    }
});
