//! Whole-payload audio decoding with Symphonia.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use audiotag_traits::{AudioBuffer, AudioDecoder, HostError, Result};

/// Decodes complete payloads into interleaved `f32` PCM. Format and codec
/// are probed from the payload itself; no hint from the URL is needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioDecoder for SymphoniaDecoder {
    async fn decode(&self, data: Bytes) -> Result<AudioBuffer> {
        // Decoding is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || decode_bytes(data))
            .await
            .map_err(|err| {
                HostError::OperationFailed(format!("decoder task panicked: {err}"))
            })?
    }
}

fn decode_bytes(data: Bytes) -> Result<AudioBuffer> {
    let cursor = Cursor::new(data.to_vec());
    let stream = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| HostError::Decode(format!("unrecognized format: {err}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| HostError::Decode("no decodable audio track".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| HostError::Decode("source is missing a sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|err| HostError::Decode(format!("unsupported codec: {err}")))?;

    let mut channels = params.channels.map(|ch| ch.count() as u16).unwrap_or(0);
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => {
                return Err(HostError::Decode(format!("failed to read packet: {err}")));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count() as u16;
                let mut converted = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                converted.copy_interleaved_ref(decoded);
                samples.extend_from_slice(converted.samples());
            }
            // A corrupt packet does not doom the rest of the stream.
            Err(SymphoniaError::DecodeError(err)) => {
                warn!(error = %err, "skipping undecodable packet");
            }
            Err(err) => {
                return Err(HostError::Decode(format!("decode failed: {err}")));
            }
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(HostError::Decode("no audio frames decoded".to_string()));
    }

    let buffer = AudioBuffer::new(samples, channels, sample_rate);
    debug!(
        frames = buffer.frames(),
        channels = buffer.channels,
        sample_rate = buffer.sample_rate,
        "decoded payload"
    );
    Ok(buffer)
}
