//! Decoding arbitrary bytes as a server response never panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tuplespace_proto::ServerMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = ServerMessage::decode(data) {
        let mut buf = vec![0u8; 1 << 20];
        let len = message.encode_into(&mut buf).unwrap();
        assert_eq!(ServerMessage::decode(&buf[..len]).unwrap(), message);
    }
});
