#![no_main]
use libfuzzer_sys::fuzz_target;

use async_std::io::Cursor;
use h1_cgi::server;

fuzz_target!(|data: &[u8]| {
    let stream = Cursor::new(data.to_vec());

    async_std::task::block_on(async move {
        let mut conn = server::handshake(stream);
        while let Some(req) = conn.accept().await {
            if let Ok(mut req) = req {
                assert!(req.is_finished());
                req.body_mut().read_all().unwrap();
            }
        }
    });
});
