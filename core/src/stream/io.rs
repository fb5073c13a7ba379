// ## Normalized I/O for the pipeline endpoints

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

use crate::types::StreamError;

/// Canonical input abstraction
pub enum InputSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Canonical output abstraction
pub enum OutputSink {
    Writer(Box<dyn Write + Send>),
    File(PathBuf),
    /// Collect output in memory; it is returned in the run snapshot.
    Memory,
}

/// An opened input together with its total length, when the source can tell.
pub struct OpenedInput {
    pub reader: Box<dyn Read + Send>,
    pub len: Option<u64>,
}

/// Normalize input source into a boxed reader
pub fn open_input(src: InputSource) -> Result<OpenedInput, StreamError> {
    let opened = match src {
        InputSource::Reader(reader) => OpenedInput { reader, len: None },
        InputSource::File(p) => {
            let file = File::open(&p).map_err(StreamError::SourceReadFailure)?;
            let len = file.metadata().map_err(StreamError::SourceReadFailure)?.len();
            OpenedInput { reader: Box::new(file), len: Some(len) }
        }
        InputSource::Memory(b) => {
            let len = b.len() as u64;
            OpenedInput { reader: Box::new(Cursor::new(b)), len: Some(len) }
        }
    };
    Ok(opened)
}

/// Normalize output sink into a boxed writer, plus the shared buffer for `Memory`.
pub fn open_output(
    sink: OutputSink,
) -> Result<(Box<dyn Write + Send>, Option<Arc<Mutex<Vec<u8>>>>), StreamError> {
    match sink {
        OutputSink::Writer(w) => Ok((w, None)),
        OutputSink::File(p) => {
            let file = File::create(p).map_err(StreamError::SinkWriteFailure)?;
            Ok((Box::new(io::BufWriter::new(file)), None))
        }
        OutputSink::Memory => {
            let buf = Arc::new(Mutex::new(Vec::new()));
            let writer = SharedBufferWriter { buf: buf.clone() };
            Ok((Box::new(writer), Some(buf)))
        }
    }
}

pub struct SharedBufferWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for SharedBufferWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads up to `len` bytes, stopping early only at EOF. An empty result means EOF.
pub fn read_exact_or_eof<R: Read + ?Sized>(r: &mut R, len: usize) -> io::Result<Bytes> {
    let mut buf = vec![0u8; len];
    let mut off = 0;

    while off < len {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(off);
    Ok(Bytes::from(buf))
}
