use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use cappie_core::models::error::CaptureError;
use cappie_core::models::recording::FinishedMovie;
use cappie_core::models::sample::{SampleBuffer, SamplePayload};
use cappie_core::traits::movie_muxer::{MovieMuxer, MovieSink, WriteRequest};

pub const MOVIE_MAGIC: &[u8; 8] = b"CAPPIEMV";
pub const MOVIE_VERSION: u32 = 1;
pub const HEADER_SIZE: u64 = 32;
const COUNTS_OFFSET: u64 = 16;

/// Writes movies in a simple chunked container.
///
/// Parent directories are created as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileMuxer;

impl FileMuxer {
    pub fn new() -> Self {
        Self
    }
}

impl MovieMuxer for FileMuxer {
    fn start_writing(&self, request: &WriteRequest) -> Result<Box<dyn MovieSink>, CaptureError> {
        let mut writer = RawMovieWriter::new(request.path.clone());
        writer.open(request.codec.fourcc())?;
        Ok(Box::new(writer))
    }
}

/// Streaming movie file writer.
///
/// ## File Format
///
/// ```text
/// [8-byte magic "CAPPIEMV"]
/// [4-byte codec fourcc][4-byte LE version]
/// [8-byte LE video frame count][8-byte LE audio chunk count]  <- patched on close
/// [Record: 1-byte kind 'V'|'A' | 8-byte LE pts µs | 4-byte LE length | payload]
/// ...
/// ```
///
/// Audio payloads are little-endian f32 samples.
pub struct RawMovieWriter {
    file_path: PathBuf,
    file: Option<BufWriter<File>>,
    total_bytes_written: u64,
    video_frames: u64,
    audio_chunks: u64,
}

impl RawMovieWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            total_bytes_written: 0,
            video_frames: 0,
            audio_chunks: 0,
        }
    }

    /// Create the file and write the header with zeroed counts.
    pub fn open(&mut self, fourcc: [u8; 4]) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create {}: {}", self.file_path.display(), e)))?;
        self.file = Some(BufWriter::new(file));

        let mut header = Vec::with_capacity(HEADER_SIZE as usize);
        header.extend_from_slice(MOVIE_MAGIC);
        header.extend_from_slice(&fourcc);
        header.extend_from_slice(&MOVIE_VERSION.to_le_bytes());
        header.extend_from_slice(&[0u8; 16]);
        self.write_raw(&header)
    }

    pub fn write_sample(&mut self, sample: &SampleBuffer) -> Result<(), CaptureError> {
        let (kind, payload) = match &sample.payload {
            SamplePayload::Video { data, .. } => {
                self.video_frames += 1;
                (b'V', data.clone())
            }
            SamplePayload::Audio { samples, .. } => {
                self.audio_chunks += 1;
                (b'A', samples.iter().flat_map(|s| s.to_le_bytes()).collect())
            }
        };

        let pts = sample.presentation_time.as_micros() as u64;
        let mut record = Vec::with_capacity(13 + payload.len());
        record.push(kind);
        record.extend_from_slice(&pts.to_le_bytes());
        record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&payload);
        self.write_raw(&record)
    }

    /// Patch the counts, flush, and checksum the finished file.
    pub fn close(&mut self) -> Result<FinishedMovie, CaptureError> {
        let Some(writer) = self.file.take() else {
            return Err(CaptureError::StorageError("file is not open".into()));
        };
        let mut file = writer
            .into_inner()
            .map_err(|e| CaptureError::StorageError(format!("flush failed: {}", e)))?;

        file.seek(SeekFrom::Start(COUNTS_OFFSET))
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.write_all(&self.video_frames.to_le_bytes())
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.write_all(&self.audio_chunks.to_le_bytes())
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        drop(file);

        let checksum = sha256_file(&self.file_path)?;
        log::debug!(
            "Closed {}: {} frames, {} audio chunks, {} bytes",
            self.file_path.display(),
            self.video_frames,
            self.audio_chunks,
            self.total_bytes_written
        );
        Ok(FinishedMovie {
            bytes_written: self.total_bytes_written,
            checksum: Some(checksum),
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

impl MovieSink for RawMovieWriter {
    fn append(&mut self, sample: &SampleBuffer) -> Result<(), CaptureError> {
        self.write_sample(sample)
    }

    fn finish(mut self: Box<Self>) -> Result<FinishedMovie, CaptureError> {
        self.close()
    }

    fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Header fields of a finished movie file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieHeader {
    pub fourcc: [u8; 4],
    pub version: u32,
    pub video_frames: u64,
    pub audio_chunks: u64,
}

/// Read the header of a movie written by `RawMovieWriter`.
pub fn read_header(path: &Path) -> Result<MovieHeader, CaptureError> {
    let mut file =
        File::open(path).map_err(|e| CaptureError::StorageError(format!("failed to open {}: {}", path.display(), e)))?;
    let mut header = [0u8; HEADER_SIZE as usize];
    file.read_exact(&mut header)
        .map_err(|e| CaptureError::StorageError(format!("truncated header: {}", e)))?;

    if &header[0..8] != MOVIE_MAGIC {
        return Err(CaptureError::StorageError(format!("{} is not a cappie movie", path.display())));
    }
    let word = |at: usize| [header[at], header[at + 1], header[at + 2], header[at + 3]];
    let long = |at: usize| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&header[at..at + 8]);
        u64::from_le_bytes(bytes)
    };
    Ok(MovieHeader {
        fourcc: word(8),
        version: u32::from_le_bytes(word(12)),
        video_frames: long(16),
        audio_chunks: long(24),
    })
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use cappie_core::models::device::Resolution;
    use cappie_core::models::output::{OutputHandle, VideoCodec};

    fn frame(index: u8) -> SampleBuffer {
        SampleBuffer {
            source_id: "cam".into(),
            presentation_time: Duration::from_millis(index as u64 * 33),
            payload: SamplePayload::Video {
                resolution: Resolution::new(2, 2),
                data: vec![index; 8],
            },
        }
    }

    #[test]
    fn header_counts_are_patched_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("take.mov");
        let request = WriteRequest {
            handle: OutputHandle::new(),
            path: path.clone(),
            codec: VideoCodec::Hevc,
        };

        let mut sink = FileMuxer::new().start_writing(&request).unwrap();
        for i in 0..3 {
            sink.append(&frame(i)).unwrap();
        }
        sink.append(&SampleBuffer {
            source_id: "mic".into(),
            presentation_time: Duration::ZERO,
            payload: SamplePayload::Audio {
                samples: vec![0.5; 4],
                sample_rate: 48_000.0,
                channels: 1,
            },
        })
        .unwrap();
        let finished = sink.finish().unwrap();

        let header = read_header(&path).unwrap();
        assert_eq!(&header.fourcc, b"hvc1");
        assert_eq!(header.version, MOVIE_VERSION);
        assert_eq!(header.video_frames, 3);
        assert_eq!(header.audio_chunks, 1);

        // header + 3 video records (13 + 8) + 1 audio record (13 + 16)
        let expected = HEADER_SIZE + 3 * 21 + 29;
        assert_eq!(finished.bytes_written, expected);
        assert_eq!(fs::metadata(&path).unwrap().len(), expected);
        assert_eq!(finished.checksum, Some(sha256_file(&path).unwrap()));
    }

    #[test]
    fn checksum_is_hex_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mov");
        let mut writer = RawMovieWriter::new(path);
        writer.open(*b"avc1").unwrap();

        let checksum = writer.close().unwrap().checksum.unwrap();
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn close_without_open_fails() {
        let mut writer = RawMovieWriter::new(PathBuf::from("never-opened.mov"));
        assert!(matches!(writer.close(), Err(CaptureError::StorageError(_))));
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.bin");
        fs::write(&path, [0u8; 64]).unwrap();

        assert!(read_header(&path).is_err());
    }
}
