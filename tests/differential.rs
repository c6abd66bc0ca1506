// Compare the environment against what httparse makes of the same bytes.

use h1_cgi::{Error, Request};

mod common;

const REQUESTS: &[&[u8]] = &[
    b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n",
    b"GET /forums/1/topics/2375?page=1#posts-17408 HTTP/1.1\r\nHost: localhost\r\n\r\n",
    b"POST /postit HTTP/1.0\r\nHost: localhost:3000\r\nContent-Type: text/html\r\nContent-Length: 0\r\n\r\n",
    b"OPTIONS * HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\nX-Forwarded-For: 10.0.0.1\r\n\r\n",
    b"GET http://example.com/abs?x=1 HTTP/1.1\r\nUser-Agent: Mozilla/4.0 (compatible; MSIE 6.0)\r\n\r\n",
    b"DELETE /a/b/c HTTP/1.1\r\nAuthorization: Bearer abc.def\r\nCookie: k=v; k2=v2\r\n\r\n",
];

fn env_key(name: &str) -> String {
    let upper = name.to_ascii_uppercase().replace('-', "_");
    match upper.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => upper,
        _ => format!("HTTP_{}", upper),
    }
}

#[test]
fn agrees_with_httparse() -> Result<(), Error> {
    common::setup_logger();

    for raw in REQUESTS {
        let mut req = Request::new();
        assert!(req.parse(raw)?, "{}", String::from_utf8_lossy(raw));
        let env = req.env();

        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut other = httparse::Request::new(&mut headers);
        let status = other.parse(raw).expect("httparse accepts");
        assert!(status.is_complete());

        assert_eq!(env.get("REQUEST_METHOD"), other.method);

        let path = other.path.expect("path");
        let without_fragment = path.split('#').next().unwrap();
        assert_eq!(env.get("REQUEST_URI"), Some(without_fragment));

        let version = format!("HTTP/1.{}", other.version.expect("version"));
        assert_eq!(env.get("SERVER_PROTOCOL"), Some(version.as_str()));

        for h in other.headers.iter() {
            let value = std::str::from_utf8(h.value).unwrap();
            assert_eq!(env.get(&env_key(h.name)), Some(value), "header {}", h.name);
        }
    }

    Ok(())
}

#[test]
fn rejects_what_httparse_rejects() {
    let bad: &[&[u8]] = &[
        b"GET / HTTP/1.1\r\nBad Name: x\r\n\r\n",
        b"GET / HTTP/1.1\r\n: x\r\n\r\n",
        b"GET / HTTX/1.1\r\n\r\n",
        b"\x00\x01\x02 / HTTP/1.1\r\n\r\n",
    ];

    for raw in bad {
        let mut headers = [httparse::EMPTY_HEADER; 8];
        assert!(httparse::Request::new(&mut headers).parse(raw).is_err());

        let mut req = Request::new();
        assert!(req.parse(raw).is_err(), "{}", String::from_utf8_lossy(raw));
    }
}
