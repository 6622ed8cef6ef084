//! Sample-rate conversion using rubato
//!
//! FFT-based resampling with a linear-interpolation fallback, operating on
//! interleaved buffers of any channel count.

use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use tracing::debug;

/// Resample an interleaved buffer to `to_rate`, keeping its channel count
pub fn resample_buffer(buffer: &AudioBuffer, to_rate: u32) -> AudioBuffer {
    if buffer.sample_rate == to_rate || buffer.is_empty() {
        return AudioBuffer::new(buffer.samples.clone(), to_rate, buffer.channels);
    }

    let planar = deinterleave(&buffer.samples, buffer.channels as usize);
    let resampled = resample_planar(&planar, buffer.sample_rate, to_rate);
    AudioBuffer::new(interleave(&resampled), to_rate, buffer.channels)
}

/// Bring a buffer to the given sample rate and channel count
///
/// Mono is duplicated to stereo; stereo is averaged down to mono.
pub fn conform(buffer: &AudioBuffer, sample_rate: u32, channels: u16) -> AudioBuffer {
    let rechanneled = match (buffer.channels, channels) {
        (from, to) if from == to => buffer.clone(),
        (1, 2) => {
            let samples = buffer.samples.iter().flat_map(|s| [*s, *s]).collect();
            AudioBuffer::new(samples, buffer.sample_rate, 2)
        }
        (from, 1) => {
            let samples = buffer
                .samples
                .chunks(from as usize)
                .map(|frame| frame.iter().sum::<f32>() / from as f32)
                .collect();
            AudioBuffer::new(samples, buffer.sample_rate, 1)
        }
        (from, to) => {
            debug!("No channel mapping from {} to {}, keeping layout", from, to);
            buffer.clone()
        }
    };

    if rechanneled.sample_rate == sample_rate {
        rechanneled
    } else {
        resample_buffer(&rechanneled, sample_rate)
    }
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            out.push(channel[i]);
        }
    }
    out
}

/// High-quality resampling of planar channels using rubato
///
/// Uses FFT-based resampling with a proper anti-aliasing filter. The
/// resampler's output delay is removed and its tail flushed with silence, so
/// output frame 0 lines up with input frame 0 and the output holds
/// `ceil(len * to / from)` frames. Falls back to linear interpolation if
/// rubato fails to initialize or process.
pub fn resample_planar(channels: &[Vec<f32>], from_rate: u32, to_rate: u32) -> Vec<Vec<f32>> {
    let len = channels.first().map(Vec::len).unwrap_or(0);
    if from_rate == to_rate || len == 0 {
        return channels.to_vec();
    }

    let fallback = || -> Vec<Vec<f32>> {
        channels
            .iter()
            .map(|c| resample_linear_fallback(c, from_rate, to_rate))
            .collect()
    };

    // rubato works on fixed-size chunks
    const CHUNK_SIZE: usize = 1024;

    let mut resampler = match FftFixedInOut::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        channels.len(),
    ) {
        Ok(r) => r,
        Err(e) => {
            debug!("Rubato initialization failed ({}), using fallback", e);
            return fallback();
        }
    };

    let input_frames_per_chunk = resampler.input_frames_next();
    if resampler.output_frames_next() == 0 {
        return fallback();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let target_len = (len as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let needed = delay + target_len;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(needed); channels.len()];

    // Past the end of the input, zero chunks flush the filter tail
    let mut pos = 0;
    while output[0].len() < needed {
        let input: Vec<Vec<f32>> = channels
            .iter()
            .map(|c| {
                let mut chunk = Vec::with_capacity(input_frames_per_chunk);
                if pos < len {
                    chunk.extend_from_slice(&c[pos..(pos + input_frames_per_chunk).min(len)]);
                }
                chunk.resize(input_frames_per_chunk, 0.0);
                chunk
            })
            .collect();

        match resampler.process(&input, None) {
            Ok(resampled) => {
                for (out, channel) in output.iter_mut().zip(resampled.iter()) {
                    out.extend_from_slice(channel);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), using fallback", e);
                return fallback();
            }
        }

        pos += input_frames_per_chunk;
    }

    for out in &mut output {
        out.drain(..delay.min(out.len()));
        out.truncate(target_len);
    }
    output
}

/// Fallback linear interpolation resampler
///
/// Used only when rubato fails to initialize or process. May introduce
/// aliasing artifacts.
pub fn resample_linear_fallback(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < samples.len() {
            samples[src_idx] * (1.0 - frac as f32) + samples[src_idx + 1] * frac as f32
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };

        output.push(sample);
    }

    output
}
