#![no_main]
use libfuzzer_sys::fuzz_target;

use h1_cgi::Request;

// Whatever the input, feeding it split must agree with feeding it whole.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split = 1 + data[0] as usize;
    let data = &data[1..];

    let mut whole = Request::new();
    let whole_res = whole.parse(data);

    let mut parts = Request::new();
    let mut parts_res = Ok(false);
    for chunk in data.chunks(split) {
        parts_res = parts.parse(chunk);
        if parts_res.is_err() {
            break;
        }
    }

    assert_eq!(whole_res.is_ok(), parts_res.is_ok());
    assert_eq!(whole.state(), parts.state());
    assert_eq!(whole.env(), parts.env());

    if whole.is_finished() {
        let a = whole.body_mut().read_all().unwrap();
        let b = parts.body_mut().read_all().unwrap();
        assert_eq!(a, b);
    }
});
