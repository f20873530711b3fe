//! Audio sources.
//!
//! An [`AudioStream`] is single-pass: once an attempt has read it, the bytes
//! are gone. Failover needs a second, complete copy of the audio, so the
//! coordinator takes an [`AudioSource`] and opens a fresh stream per attempt.

use futures_util::lock::Mutex;
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

/// Chunk size used when reading audio from files or readers.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Size of a canonical RIFF/WAVE header in front of PCM data.
pub const WAV_HEADER_LEN: u64 = 44;

/// Ordered, single-pass sequence of audio chunks.
pub type AudioStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// Produces a fresh [`AudioStream`] for every attempt.
pub trait AudioSource: Send + Sync {
    /// Open a new stream positioned at the start of the audio.
    fn open(&self) -> AudioStream;
}

impl<F> AudioSource for F
where
    F: Fn() -> AudioStream + Send + Sync,
{
    fn open(&self) -> AudioStream {
        self()
    }
}

/// Turn any async reader into an [`AudioStream`] of `chunk_size` pieces.
pub fn reader_stream<R>(reader: R, chunk_size: usize) -> AudioStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    stream::try_unfold(reader, move |mut reader| async move {
        let mut buf = vec![0u8; chunk_size];
        let n = reader.read(&mut buf).await?;
        let next = (n > 0).then(|| {
            buf.truncate(n);
            (buf, reader)
        });
        Ok::<_, io::Error>(next)
    })
    .boxed()
}

// ============================================================================
// In-memory replay
// ============================================================================

/// Audio held in memory and replayed chunk for chunk on every `open`.
///
/// Built by draining a single-pass stream once, which suits the short
/// utterances a voice assistant produces.
#[derive(Debug, Clone, Default)]
pub struct BufferedAudio {
    chunks: Arc<Vec<Vec<u8>>>,
}

impl BufferedAudio {
    /// Drain `stream` into memory, keeping chunk boundaries.
    pub async fn from_stream<S>(stream: S) -> io::Result<Self>
    where
        S: futures_util::Stream<Item = io::Result<Vec<u8>>>,
    {
        let chunks: Vec<Vec<u8>> = stream.try_collect().await?;
        tracing::debug!(
            chunks = chunks.len(),
            bytes = chunks.iter().map(Vec::len).sum::<usize>(),
            "Buffered audio stream"
        );
        Ok(Self {
            chunks: Arc::new(chunks),
        })
    }

    /// Split `bytes` into chunks of `chunk_size`.
    pub fn from_bytes(bytes: &[u8], chunk_size: usize) -> Self {
        let chunks = bytes
            .chunks(chunk_size.max(1))
            .map(<[u8]>::to_vec)
            .collect();
        Self {
            chunks: Arc::new(chunks),
        }
    }

    /// Total number of buffered bytes.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioSource for BufferedAudio {
    fn open(&self) -> AudioStream {
        let chunks = Arc::clone(&self.chunks);
        stream::iter((0..chunks.len()).map(move |i| Ok(chunks[i].clone()))).boxed()
    }
}

// ============================================================================
// Live tee
// ============================================================================

/// A single-pass stream forwarded live and recorded as it goes.
///
/// Every `open` replays the chunks recorded so far and then keeps pulling
/// from the live stream. The first attempt therefore uploads while audio is
/// still arriving, and a later attempt still gets the whole utterance even
/// if the first one stopped reading early.
#[derive(Clone)]
pub struct TeeAudio {
    shared: Arc<Mutex<Tee>>,
}

struct Tee {
    live: Option<AudioStream>,
    recorded: Vec<Vec<u8>>,
}

impl Tee {
    async fn chunk_at(&mut self, index: usize) -> io::Result<Option<Vec<u8>>> {
        if let Some(chunk) = self.recorded.get(index) {
            return Ok(Some(chunk.clone()));
        }
        let Some(live) = self.live.as_mut() else {
            return Ok(None);
        };
        match live.next().await {
            Some(Ok(chunk)) => {
                self.recorded.push(chunk.clone());
                Ok(Some(chunk))
            }
            Some(Err(e)) => Err(e),
            None => {
                tracing::trace!(chunks = self.recorded.len(), "Live audio stream ended");
                self.live = None;
                Ok(None)
            }
        }
    }
}

impl TeeAudio {
    pub fn new(live: AudioStream) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Tee {
                live: Some(live),
                recorded: Vec::new(),
            })),
        }
    }

    /// Bytes recorded from the live stream so far.
    pub async fn recorded_len(&self) -> usize {
        self.shared.lock().await.recorded.iter().map(Vec::len).sum()
    }
}

impl AudioSource for TeeAudio {
    fn open(&self) -> AudioStream {
        let shared = Arc::clone(&self.shared);
        stream::try_unfold((shared, 0usize), |(shared, index)| async move {
            let chunk = {
                let mut tee = shared.lock().await;
                tee.chunk_at(index).await?
            };
            Ok::<_, io::Error>(chunk.map(|chunk| (chunk, (shared, index + 1))))
        })
        .boxed()
    }
}

// ============================================================================
// File on disk
// ============================================================================

/// Audio read from a file, re-opened from the start on every `open`.
#[derive(Debug, Clone)]
pub struct FileAudio {
    path: PathBuf,
    offset: u64,
    chunk_size: usize,
}

impl FileAudio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Raw PCM behind a canonical WAV header when the path ends in `.wav`.
    pub fn pcm(path: impl Into<PathBuf>) -> Self {
        let file = Self::new(path);
        let is_wav = file
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav {
            file.skip(WAV_HEADER_LEN)
        } else {
            file
        }
    }

    /// Skip `offset` leading bytes on every read.
    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSource for FileAudio {
    fn open(&self) -> AudioStream {
        let path = self.path.clone();
        let offset = self.offset;
        let chunk_size = self.chunk_size;

        // Open errors surface as the first stream item.
        stream::once(async move {
            let mut file = tokio::fs::File::open(&path).await?;
            if offset > 0 {
                file.seek(SeekFrom::Start(offset)).await?;
            }
            Ok::<_, io::Error>(reader_stream(file, chunk_size))
        })
        .try_flatten()
        .boxed()
    }
}
