// src/bridge/testutil.rs
//
// In-memory stand-in for the serial device, scriptable from tests: reads
// pull from a channel of scripted chunks and time out like a real port when
// nothing is pending; writes land in a shared sink and can be made to fail.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum SerialScript {
    Chunk(Vec<u8>),
    ReadError(io::ErrorKind),
}

pub struct FakeSerial {
    script_rx: Receiver<SerialScript>,
    pending: VecDeque<u8>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
}

pub struct SerialScriptHandle {
    script_tx: Sender<SerialScript>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
}

pub fn fake_serial() -> (FakeSerial, SerialScriptHandle) {
    let (script_tx, script_rx) = channel();
    let written = Arc::new(Mutex::new(Vec::new()));
    let fail_writes = Arc::new(AtomicBool::new(false));

    let device = FakeSerial {
        script_rx,
        pending: VecDeque::new(),
        written: Arc::clone(&written),
        fail_writes: Arc::clone(&fail_writes),
    };
    let handle = SerialScriptHandle { script_tx, written, fail_writes };
    (device, handle)
}

impl SerialScriptHandle {
    /// Queue a chunk for the reader. An empty chunk makes the next read
    /// return `Ok(0)` with no error.
    pub fn feed(&self, bytes: &[u8]) {
        let _ = self.script_tx.send(SerialScript::Chunk(bytes.to_vec()));
    }

    /// Make the next read fail with the given kind.
    pub fn fail_read(&self, kind: io::ErrorKind) {
        let _ = self.script_tx.send(SerialScript::ReadError(kind));
    }

    /// Everything written to the device so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Read for FakeSerial {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            match self.script_rx.recv_timeout(Duration::from_millis(5)) {
                Ok(SerialScript::Chunk(chunk)) => {
                    if chunk.is_empty() {
                        return Ok(0);
                    }
                    self.pending.extend(chunk);
                }
                Ok(SerialScript::ReadError(kind)) => {
                    return Err(io::Error::new(kind, "scripted read failure"));
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "no scripted data"));
                }
            }
        }
        let n = buf.len().min(self.pending.len());
        for slot in buf[..n].iter_mut() {
            match self.pending.pop_front() {
                Some(byte) => *slot = byte,
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for FakeSerial {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
