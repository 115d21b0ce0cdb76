#![no_main]

use libfuzzer_sys::fuzz_target;
use peerlink::bytes::Bytes;
use peerlink::core::archive::Archive;
use peerlink::core::buffer::BufferReader;
use std::collections::BTreeSet;

fuzz_target!(|data: &[u8]| {
    // Untrusted peer bytes must decode or fail, never panic or over-allocate
    let swap = data.first().is_some_and(|b| b & 1 == 1);
    let body = Bytes::copy_from_slice(data.get(1..).unwrap_or_default());

    let mut text = String::new();
    let _ = BufferReader::new(body.clone()).with_swap(swap).load(&mut text);

    let mut nested: Vec<Vec<u32>> = Vec::new();
    let _ = BufferReader::new(body.clone()).with_swap(swap).load(&mut nested);

    let mut set: BTreeSet<char> = BTreeSet::new();
    let _ = BufferReader::new(body).with_swap(swap).load(&mut set);
});
