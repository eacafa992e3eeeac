//! Integration tests for the `tracing` feature.
//!
//! These run zone growth and thread start under a subscriber that writes
//! into a buffer, and check which events were recorded.

#![cfg(feature = "tracing")]

use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use tracing::Level;
use tracing_subscriber::fmt;
use vm_core::{os_thread, Zone, ZoneConfig};

/// Formatted subscriber output, shared with the subscriber's writer.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-scoped subscriber and return what it logged.
fn capture(f: impl FnOnce()) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = fmt()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    captured.contents()
}

fn small_config(trace_zones: bool) -> ZoneConfig {
    ZoneConfig {
        segment_size: 1024,
        trace_zones,
    }
}

#[test]
fn test_zone_expand_logged_when_tracing_zones() {
    let output = capture(|| {
        let zone = Zone::with_config(small_config(true));
        for _ in 0..100 {
            zone.allocate(64);
        }
        assert!(zone.segment_count() > 1);
    });
    assert!(output.contains("zone_expand"), "output: {output}");
    assert!(output.contains("size_in_bytes="), "output: {output}");
}

#[test]
fn test_zone_expand_silent_without_tracing_zones() {
    let output = capture(|| {
        let mut zone = Zone::with_config(small_config(false));
        for _ in 0..100 {
            zone.allocate(64);
        }
        zone.allocate(1 << 20);
        assert!(zone.segment_count() > 1);
        assert_eq!(zone.large_segment_count(), 1);
        zone.destroy_all();
    });
    assert!(!output.contains("zone_expand"), "output: {output}");
    assert!(output.contains("zone_large_segment"), "output: {output}");
    assert!(output.contains("zone_destroy"), "output: {output}");
}

#[test]
fn test_events_carry_zone_id() {
    let mut id = None;
    let output = capture(|| {
        let zone = Zone::with_config(small_config(false));
        zone.allocate(1 << 16);
        id = Some(zone.id());
    });
    let id = id.unwrap();
    assert!(
        output.contains(&format!("zone_id={}", id.0)),
        "output: {output}"
    );
}

#[test]
fn test_zone_ids_are_unique() {
    let a = Zone::new();
    let b = Zone::nested(&a);
    assert_ne!(a.id(), b.id());
    assert!(b.id().0 > a.id().0);
}

#[test]
fn test_thread_start_with_tracing() {
    let (tx, rx) = mpsc::channel();
    os_thread::spawn(move || {
        tx.send(os_thread::thread_id_to_integer(os_thread::current_thread_id()))
            .unwrap();
    })
    .unwrap();
    let id = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_ne!(id, os_thread::INVALID_THREAD_ID);
}
