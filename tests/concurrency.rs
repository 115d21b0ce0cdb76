#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Concurrent use of one connection from several threads

use peerlink::core::archive::Archive;
use peerlink::protocol::handshake::encode_marker;
use peerlink::Connection;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

/// Connect to a raw peer that echoes every byte after the handshake
fn echo_connection() -> (Arc<Connection>, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let echo = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .write_all(&[encode_marker(cfg!(target_endian = "little"))])
            .unwrap();
        let mut marker = [0u8; 1];
        stream.read_exact(&mut marker).unwrap();

        let mut inbound: TcpStream = stream.try_clone().unwrap();
        // Ends when the client shuts the socket down
        let _ = io::copy(&mut inbound, &mut stream);
    });

    let conn = Connection::connect("127.0.0.1", port, "echo").unwrap();
    (Arc::new(conn), echo)
}

#[test]
fn full_duplex_reader_and_writer_threads() {
    let (conn, echo) = echo_connection();
    let count = 20_000u64;

    let writer = {
        let conn = conn.clone();
        thread::spawn(move || {
            for i in 0..count {
                let mut value = i;
                conn.save(&mut value).unwrap();
            }
        })
    };

    let reader = {
        let conn = conn.clone();
        thread::spawn(move || {
            for expected in 0..count {
                let mut value = 0u64;
                conn.load(&mut value).unwrap();
                assert_eq!(value, expected);
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    let snapshot = conn.metrics().snapshot();
    assert_eq!(snapshot.values_saved, count);
    assert_eq!(snapshot.values_loaded, count);
    assert_eq!(snapshot.bytes_sent, count * 8);

    conn.close();
    echo.join().unwrap();
}

#[test]
fn writer_handles_keep_records_contiguous() {
    let (conn, echo) = echo_connection();
    let threads = 4u32;
    let records_per_thread = 200usize;
    let record_len = 64usize;

    let reader = {
        let conn = conn.clone();
        thread::spawn(move || {
            let mut per_thread = vec![0usize; threads as usize];
            let mut reader = conn.reader().unwrap();
            for _ in 0..(threads as usize * records_per_thread) {
                let mut record: Vec<u32> = Vec::new();
                reader.field(&mut record).unwrap();
                assert_eq!(record.len(), record_len);
                let owner = record[0];
                // A record mixed with another thread's bytes would not be uniform
                assert!(record.iter().all(|&v| v == owner));
                per_thread[owner as usize] += 1;
            }
            per_thread
        })
    };

    let writers: Vec<_> = (0..threads)
        .map(|id| {
            let conn = conn.clone();
            thread::spawn(move || {
                for _ in 0..records_per_thread {
                    let mut writer = conn.writer().unwrap();
                    writer.field(&mut vec![id; record_len]).unwrap();
                    writer.flush().unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    let per_thread = reader.join().unwrap();
    assert!(per_thread.iter().all(|&n| n == records_per_thread));

    conn.close();
    echo.join().unwrap();
}
