//! Audio output using cpal
//!
//! `AudioSink` is the blocking streaming-output seam: `write` returns only
//! once the device side has consumed or queued the samples, which is what
//! paces the production loop to real time. `CpalSink` implements it by
//! bridging the producer thread to the cpal callback through a lock-free
//! ring buffer.

use crate::audio::generator::SAMPLE_RATE;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mono samples handed to the device per production-loop iteration
const PERIOD_SAMPLES: usize = 2048;

/// Ring capacity in periods; the producer blocks once this much is queued
const RING_PERIODS: usize = 4;

/// Producer back-off while the ring is full
const WRITE_POLL: Duration = Duration::from_millis(5);

/// Blocking streaming audio output.
///
/// A sink is created by and owned by exactly one production thread; release
/// happens on drop. Implementations need not be `Send`.
pub trait AudioSink {
    /// Preferred number of mono samples per `write` call
    fn preferred_buffer_len(&self) -> usize;

    /// Write samples, blocking until the device has consumed or queued them
    fn write(&mut self, samples: &[i16]) -> Result<()>;

    /// Stop the output stream; further writes are discarded
    fn stop(&mut self);
}

/// cpal-backed sink: mono i16 samples in, device-format frames out
pub struct CpalSink {
    stream: Option<Stream>,
    producer: ringbuf::HeapProd<i16>,
    period: usize,
}

impl CpalSink {
    /// List available audio output devices.
    ///
    /// Used by `--list-devices` and the GET /audio/devices endpoint.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioDevice(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device and start the stream.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    ///
    /// # Errors
    /// `Error::AudioDevice` if no device is available, no usable config is
    /// found, or the stream fails to build or start. Nothing is left running
    /// on failure.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioDevice(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                Some(dev) => {
                    info!("Found requested audio device: {}", name);
                    dev
                }
                None => {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        name
                    );
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioDevice(format!(
                            "Device '{}' not found and no default device available",
                            name
                        ))
                    })?
                }
            }
        } else {
            host.default_output_device()
                .ok_or_else(|| Error::AudioDevice("No default output device found".to_string()))?
        };

        let (config, sample_format) = Self::pick_config(&device)?;
        if config.sample_rate.0 != SAMPLE_RATE {
            warn!(
                "Device running at {} Hz instead of {} Hz",
                config.sample_rate.0, SAMPLE_RATE
            );
        }

        let ring = HeapRb::<i16>::new(PERIOD_SAMPLES * RING_PERIODS);
        let (producer, consumer) = ring.split();

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream_f32(&device, &config, consumer)?,
            SampleFormat::I16 => Self::build_stream_i16(&device, &config, consumer)?,
            other => {
                return Err(Error::AudioDevice(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioDevice(format!("Failed to start stream: {}", e)))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?sample_format,
            "audio stream started"
        );

        Ok(Self {
            stream: Some(stream),
            producer,
            period: PERIOD_SAMPLES,
        })
    }

    /// Pick the best supported configuration: 44.1 kHz with f32 samples,
    /// else 44.1 kHz i16, else whatever the device defaults to.
    fn pick_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioDevice(format!("Failed to get device configs: {}", e)))?
            .collect();

        for format in [SampleFormat::F32, SampleFormat::I16] {
            let preferred = supported.iter().find(|range| {
                range.sample_format() == format
                    && range.min_sample_rate().0 <= SAMPLE_RATE
                    && range.max_sample_rate().0 >= SAMPLE_RATE
            });
            if let Some(range) = preferred {
                let config = range
                    .clone()
                    .with_sample_rate(cpal::SampleRate(SAMPLE_RATE))
                    .config();
                return Ok((config, format));
            }
        }

        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioDevice(format!("Failed to get default config: {}", e)))?;
        let sample_format = default.sample_format();
        Ok((default.config(), sample_format))
    }

    fn build_stream_f32(
        device: &Device,
        config: &StreamConfig,
        mut consumer: ringbuf::HeapCons<i16>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;

        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        // Underrun outputs silence rather than crashing
                        let sample = consumer
                            .try_pop()
                            .map(|s| s as f32 / 32768.0)
                            .unwrap_or(0.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioDevice(format!("Failed to build stream: {}", e)))
    }

    fn build_stream_i16(
        device: &Device,
        config: &StreamConfig,
        mut consumer: ringbuf::HeapCons<i16>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;

        device
            .build_output_stream(
                config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.try_pop().unwrap_or(0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioDevice(format!("Failed to build stream: {}", e)))
    }
}

impl AudioSink for CpalSink {
    fn preferred_buffer_len(&self) -> usize {
        self.period
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let mut offset = 0;
        while offset < samples.len() {
            offset += self.producer.push_slice(&samples[offset..]);
            if offset < samples.len() {
                if self.stream.is_none() {
                    return Err(Error::AudioDevice("audio stream stopped".to_string()));
                }
                // Ring full: the device paces us
                thread::sleep(WRITE_POLL);
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            if let Err(e) = stream.pause() {
                warn!("Failed to pause stream: {}", e);
            }
            drop(stream);
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_does_not_panic() {
        // No audio hardware on CI; any outcome is acceptable
        let _ = CpalSink::list_devices();
    }
}
