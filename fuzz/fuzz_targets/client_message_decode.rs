//! Decoding arbitrary bytes as a client request never panics, and anything
//! that decodes re-encodes to a message that decodes to the same value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tuplespace_proto::ClientMessage;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = ClientMessage::decode(data) else {
        return;
    };
    let mut buf = vec![0u8; 1 << 20];
    let len = message.encode_into(&mut buf).unwrap();
    assert_eq!(ClientMessage::decode(&buf[..len]).unwrap(), message);
});
