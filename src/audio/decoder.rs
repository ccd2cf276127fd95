//! Symphonia-backed sample source
//!
//! Decodes on demand: a read seeks the demuxer when the requested range is
//! not reachable by decoding forward, then walks packets until the range is
//! covered. Nothing close to a whole file is ever resident.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::source::{SampleSource, SourceFactory};

/// How far ahead of the decode cursor a read may be before we seek instead
/// of decoding through the gap.
const MAX_FORWARD_DECODE: i64 = 262_144;

/// Random-access decoder over any container/codec symphonia can probe.
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: f64,
    channels: usize,
    len_samples: i64,
    /// Frame index the next decoded packet is expected to start at.
    next_frame: i64,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl SymphoniaSource {
    pub fn open(path: &Path) -> Result<Self, String> {
        let file = File::open(path).map_err(|e| format!("Failed to open file: {}", e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let format_opts = FormatOptions::default();
        let metadata_opts = MetadataOptions::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| format!("Failed to probe audio format: {}", e))?;

        let format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| "No decodable track found".to_string())?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100) as f64;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| "No channel layout in track".to_string())?;
        let len_samples = track.codec_params.n_frames.unwrap_or(0) as i64;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| format!("Failed to create decoder: {}", e))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            len_samples,
            next_frame: 0,
            sample_buf: None,
        })
    }

    fn seek_to(&mut self, frame: i64) -> Result<(), String> {
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: frame.max(0) as u64,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| format!("Seek to frame {} failed: {}", frame, e))?;
        self.decoder.reset();
        // Seeks can land on an earlier keyframe; decoding skips forward.
        self.next_frame = seeked.actual_ts as i64;
        Ok(())
    }
}

impl SampleSource for SymphoniaSource {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn len_samples(&self) -> i64 {
        self.len_samples
    }

    fn read(&mut self, dest: &mut [f32], start: i64, frames: usize) -> Result<(), String> {
        let needed = frames * self.channels;
        if dest.len() < needed {
            return Err(format!(
                "Destination holds {} samples, need {}",
                dest.len(),
                needed
            ));
        }
        dest[..needed].fill(0.0);
        if frames == 0 {
            return Ok(());
        }

        let start = start.max(0);
        let end = start + frames as i64;

        if start < self.next_frame || start > self.next_frame + MAX_FORWARD_DECODE {
            self.seek_to(start)?;
        }

        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(format!("Failed to read packet: {}", e)),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let packet_start = packet.ts() as i64;
            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                // Skip over a corrupt packet; the demuxer resynchronizes
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(format!("Decode failed: {}", e)),
            };

            let packet_frames = decoded.frames() as i64;
            self.next_frame = packet_start + packet_frames;
            if packet_frames == 0 || self.next_frame <= start {
                continue;
            }

            let buf_samples = decoded.capacity() * self.channels;
            if self
                .sample_buf
                .as_ref()
                .map_or(true, |b| b.capacity() < buf_samples)
            {
                self.sample_buf = Some(SampleBuffer::<f32>::new(
                    decoded.capacity() as u64,
                    *decoded.spec(),
                ));
            }
            let Some(sample_buf) = self.sample_buf.as_mut() else {
                return Err("Sample buffer unavailable".to_string());
            };
            sample_buf.copy_interleaved_ref(decoded);
            let data = sample_buf.samples();

            let copy_start = start.max(packet_start);
            let copy_end = end.min(packet_start + packet_frames);
            if copy_start < copy_end {
                let src = ((copy_start - packet_start) as usize) * self.channels;
                let dst = ((copy_start - start) as usize) * self.channels;
                let count = ((copy_end - copy_start) as usize) * self.channels;
                dest[dst..dst + count].copy_from_slice(&data[src..src + count]);
            }

            if self.next_frame >= end {
                break;
            }
        }

        Ok(())
    }
}

/// Default factory: opens a fresh [`SymphoniaSource`] per scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaFactory;

impl SourceFactory for SymphoniaFactory {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, String> {
        Ok(Box::new(SymphoniaSource::open(path)?))
    }
}
