use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::{Audio as AudioFrame, Video as VideoFrame};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::resampling::Context as ResamplerContext;
use ffmpeg_next::software::scaling::{Context as ScalerContext, Flags};
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;
use ffmpeg_next::codec::decoder;
use ffmpeg_next::{codec, Packet, Rational};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::circular_buffer::CircularBuffer;
use super::clock::AudioClock;
use crate::locator::Locator;

const IDLE_SLEEP: Duration = Duration::from_millis(10);
const FULL_QUEUE_SLEEP: Duration = Duration::from_millis(1);

/// A decoded video frame ready for display
pub struct DecodedVideoFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pts: f64, // seconds
}

/// Commands sent to the decoder thread
#[derive(Debug)]
pub enum DecoderCommand {
    Seek(f64),
    Pause,
    Resume,
    Stop,
}

/// Notifications sent back from the decoder thread
#[derive(Debug)]
pub enum DecoderEvent {
    /// The demuxer hit EOF; every remaining frame has been queued.
    EndOfStream,
    Failed(String),
}

/// Stream properties read before playback starts
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub has_audio: bool,
}

pub fn probe_media(locator: &Locator) -> Result<MediaInfo> {
    let input = ffmpeg_next::format::input(locator.as_input())
        .with_context(|| format!("failed to open input {locator}"))?;

    let video_stream = input
        .streams()
        .best(Type::Video)
        .ok_or_else(|| anyhow!("no video stream found"))?;

    let video_decoder = codec::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let (sample_rate, has_audio) = match input.streams().best(Type::Audio) {
        Some(audio) => {
            let audio_decoder = codec::Context::from_parameters(audio.parameters())?
                .decoder()
                .audio()?;
            (audio_decoder.rate(), true)
        }
        // Silent clock so video-only media still advances
        None => (44100, false),
    };

    let duration = if input.duration() > 0 {
        input.duration() as f64 / ffmpeg_next::ffi::AV_TIME_BASE as f64
    } else {
        0.0
    };

    debug!(
        %locator,
        width = video_decoder.width(),
        height = video_decoder.height(),
        duration,
        has_audio,
        "probed media"
    );

    Ok(MediaInfo {
        width: video_decoder.width(),
        height: video_decoder.height(),
        duration,
        sample_rate,
        // Output is always resampled to stereo
        channels: 2,
        has_audio,
    })
}

/// Everything the decoder thread owns besides the input itself.
pub struct DecoderLinks {
    pub video_sender: Sender<DecodedVideoFrame>,
    pub event_sender: Sender<DecoderEvent>,
    pub audio_buffer: Arc<CircularBuffer<f32>>,
    pub command_receiver: Receiver<DecoderCommand>,
    pub clock: AudioClock,
    pub stop_flag: Arc<AtomicBool>,
}

pub fn start_decoder_thread(locator: &Locator, links: DecoderLinks) -> Result<JoinHandle<()>> {
    let input: PathBuf = locator.as_input().to_path_buf();
    let name = format!("decoder-{}", locator.display_name());

    let handle = thread::Builder::new().name(name).spawn(move || {
        let events = links.event_sender.clone();
        if let Err(e) = decode_loop(&input, links) {
            error!(input = %input.display(), "decoder error: {e:#}");
            let _ = events.try_send(DecoderEvent::Failed(format!("{e:#}")));
        }
    })?;

    Ok(handle)
}

/// What the command drain asks the loop to do next.
enum Flow {
    Continue,
    Seek(f64),
    Exit,
}

struct PlaybackFlags {
    paused: bool,
    at_eof: bool,
}

/// Apply every pending command. A seek wins over any later non-stop command.
fn drain_commands(
    commands: &Receiver<DecoderCommand>,
    clock: &AudioClock,
    flags: &mut PlaybackFlags,
) -> Flow {
    let mut seek = None;
    loop {
        match commands.try_recv() {
            Ok(DecoderCommand::Stop) | Err(TryRecvError::Disconnected) => return Flow::Exit,
            Ok(DecoderCommand::Pause) => {
                flags.paused = true;
                clock.pause();
            }
            Ok(DecoderCommand::Resume) => {
                flags.paused = false;
                clock.resume();
            }
            Ok(DecoderCommand::Seek(target)) => seek = Some(target),
            Err(TryRecvError::Empty) => break,
        }
    }
    match seek {
        Some(target) => Flow::Seek(target),
        None => Flow::Continue,
    }
}

struct VideoPath {
    decoder: decoder::Video,
    scaler: ScalerContext,
    time_base: Rational,
    decoded: VideoFrame,
    rgba: VideoFrame,
}

impl VideoPath {
    fn next_frame(&mut self) -> Result<Option<DecodedVideoFrame>> {
        if self.decoder.receive_frame(&mut self.decoded).is_err() {
            return Ok(None);
        }
        self.scaler.run(&self.decoded, &mut self.rgba)?;
        let pts = self.decoded.pts().unwrap_or(0);
        let (width, height) = (self.rgba.width(), self.rgba.height());
        Ok(Some(DecodedVideoFrame {
            rgba: packed_rgba(
                self.rgba.data(0),
                self.rgba.stride(0),
                width as usize,
                height as usize,
            ),
            width,
            height,
            pts: pts as f64 * f64::from(self.time_base),
        }))
    }
}

/// Copy `height` rows of `width` RGBA pixels out of a plane whose rows are
/// `stride` bytes apart. Scaler output rows are padded to 32-byte alignment.
fn packed_rgba(data: &[u8], stride: usize, width: usize, height: usize) -> Vec<u8> {
    let row = width * 4;
    if stride == row {
        return data[..(row * height).min(data.len())].to_vec();
    }
    let mut packed = Vec::with_capacity(row * height);
    for line in data.chunks(stride).take(height) {
        packed.extend_from_slice(&line[..row.min(line.len())]);
    }
    packed
}

/// Consecutive packet read failures before the input is given up on.
const MAX_READ_ERRORS: u32 = 16;

/// Tracks back-to-back read failures. A single corrupt packet is skipped;
/// a failing input ends the decode loop.
#[derive(Default)]
struct ReadErrors {
    consecutive: u32,
}

impl ReadErrors {
    fn record(&mut self, e: ffmpeg_next::Error) -> Result<()> {
        self.consecutive += 1;
        if self.consecutive >= MAX_READ_ERRORS {
            return Err(anyhow!(
                "input unreadable after {} consecutive errors: {e}",
                self.consecutive
            ));
        }
        debug!(count = self.consecutive, "skipping unreadable packet: {e}");
        Ok(())
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

struct AudioPath {
    decoder: decoder::Audio,
    resampler: ResamplerContext,
    decoded: AudioFrame,
}

impl AudioPath {
    fn push_decoded(&mut self, buffer: &CircularBuffer<f32>) {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            let mut resampled = AudioFrame::empty();
            if self.resampler.run(&self.decoded, &mut resampled).is_err() {
                continue;
            }
            let data = resampled.data(0);
            // Packed f32 output: plane 0 holds interleaved samples
            let samples: &[f32] = unsafe {
                std::slice::from_raw_parts(data.as_ptr() as *const f32, data.len() / 4)
            };
            buffer.push_slice(samples);
        }
    }
}

/// Outcome of handing one frame to the display queue.
enum Delivery {
    Sent,
    Interrupted(Flow),
}

fn deliver(
    mut frame: DecodedVideoFrame,
    links: &DecoderLinks,
    flags: &mut PlaybackFlags,
) -> Delivery {
    loop {
        match drain_commands(&links.command_receiver, &links.clock, flags) {
            Flow::Continue => {}
            flow => return Delivery::Interrupted(flow),
        }
        match links.video_sender.try_send(frame) {
            Ok(()) => return Delivery::Sent,
            Err(TrySendError::Full(f)) => {
                frame = f;
                thread::sleep(FULL_QUEUE_SLEEP);
            }
            Err(TrySendError::Disconnected(_)) => return Delivery::Interrupted(Flow::Exit),
        }
    }
}

fn decode_loop(path: &Path, links: DecoderLinks) -> Result<()> {
    let mut input = ffmpeg_next::format::input(path)?;

    let video_index = input
        .streams()
        .best(Type::Video)
        .ok_or_else(|| anyhow!("no video stream"))?
        .index();
    let audio_index = input.streams().best(Type::Audio).map(|s| s.index());

    let video_stream = input
        .stream(video_index)
        .ok_or_else(|| anyhow!("video stream {video_index} vanished"))?;
    let time_base = video_stream.time_base();
    let video_decoder = codec::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let scaler = ScalerContext::get(
        video_decoder.format(),
        video_decoder.width(),
        video_decoder.height(),
        Pixel::RGBA,
        video_decoder.width(),
        video_decoder.height(),
        Flags::BILINEAR,
    )?;
    let mut video = VideoPath {
        decoder: video_decoder,
        scaler,
        time_base,
        decoded: VideoFrame::empty(),
        rgba: VideoFrame::empty(),
    };

    let mut audio = match audio_index {
        Some(idx) => {
            let stream = input
                .stream(idx)
                .ok_or_else(|| anyhow!("audio stream {idx} vanished"))?;
            let decoder = codec::Context::from_parameters(stream.parameters())?
                .decoder()
                .audio()?;
            let resampler = ResamplerContext::get(
                decoder.format(),
                decoder.channel_layout(),
                decoder.rate(),
                Sample::F32(ffmpeg_next::util::format::sample::Type::Packed),
                ChannelLayout::STEREO,
                links.clock.sample_rate(),
            )?;
            Some(AudioPath {
                decoder,
                resampler,
                decoded: AudioFrame::empty(),
            })
        }
        None => None,
    };

    let mut flags = PlaybackFlags {
        paused: true,
        at_eof: false,
    };
    let mut pending_seek: Option<f64> = None;
    let mut read_errors = ReadErrors::default();

    loop {
        if links.stop_flag.load(Ordering::Relaxed) {
            return Ok(());
        }

        match drain_commands(&links.command_receiver, &links.clock, &mut flags) {
            Flow::Exit => return Ok(()),
            Flow::Seek(target) => pending_seek = Some(target),
            Flow::Continue => {}
        }

        if let Some(target) = pending_seek.take() {
            let target_ts = (target * ffmpeg_next::ffi::AV_TIME_BASE as f64) as i64;
            match input.seek(target_ts, ..target_ts) {
                Ok(()) => {
                    video.decoder.flush();
                    if let Some(audio) = audio.as_mut() {
                        audio.decoder.flush();
                    }
                    links.clock.set_position(target);
                    flags.at_eof = false;
                }
                Err(e) => warn!(target, "seek failed: {e}"),
            }
        }

        if flags.paused || flags.at_eof {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        let mut packet = Packet::empty();
        match packet.read(&mut input) {
            Ok(()) => {
                read_errors.reset();
                let stream_index = packet.stream();

                if stream_index == video_index {
                    video.decoder.send_packet(&packet)?;
                    while let Some(frame) = video.next_frame()? {
                        match deliver(frame, &links, &mut flags) {
                            Delivery::Sent => {}
                            Delivery::Interrupted(Flow::Exit) => return Ok(()),
                            Delivery::Interrupted(Flow::Seek(target)) => {
                                // Abandon the rest of this packet's frames
                                pending_seek = Some(target);
                                break;
                            }
                            Delivery::Interrupted(Flow::Continue) => {}
                        }
                    }
                } else if Some(stream_index) == audio_index {
                    if let Some(audio) = audio.as_mut() {
                        audio.decoder.send_packet(&packet)?;
                        audio.push_decoded(&links.audio_buffer);
                    }
                }
            }
            Err(ffmpeg_next::Error::Eof) => {
                read_errors.reset();
                flags.at_eof = true;
                video.decoder.send_eof()?;
                while let Some(frame) = video.next_frame()? {
                    if let Delivery::Interrupted(flow) = deliver(frame, &links, &mut flags) {
                        match flow {
                            Flow::Exit => return Ok(()),
                            Flow::Seek(target) => pending_seek = Some(target),
                            Flow::Continue => {}
                        }
                        break;
                    }
                }
                if let Some(audio) = audio.as_mut() {
                    audio.decoder.send_eof()?;
                    audio.push_decoded(&links.audio_buffer);
                }
                if pending_seek.is_none() {
                    debug!(input = %path.display(), "end of stream");
                    let _ = links.event_sender.try_send(DecoderEvent::EndOfStream);
                }
            }
            Err(e) => read_errors.record(e)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_packed() {
        // 3 px wide (12 bytes) rows padded to 32 bytes
        let (width, height, stride) = (3, 2, 32);
        let mut data = vec![0xEE_u8; stride * height];
        for y in 0..height {
            for x in 0..width * 4 {
                data[y * stride + x] = (y * 100 + x) as u8;
            }
        }

        let packed = packed_rgba(&data, stride, width, height);

        assert_eq!(packed.len(), width * height * 4);
        assert!(!packed.contains(&0xEE));
        assert_eq!(packed[0], 0);
        assert_eq!(packed[12], 100);
        assert_eq!(packed[23], 111);
    }

    #[test]
    fn odd_width_frame_fits_the_texture_size() {
        let (width, height, stride) = (854, 480, 3424);
        let data = vec![0_u8; stride * height];
        assert_eq!(packed_rgba(&data, stride, width, height).len(), width * height * 4);
    }

    #[test]
    fn unpadded_rows_are_copied_whole() {
        let data: Vec<u8> = (0..32).collect();
        assert_eq!(packed_rgba(&data, 16, 4, 2), data);
    }

    #[test]
    fn isolated_read_errors_are_skipped() {
        let mut errors = ReadErrors::default();
        for _ in 0..MAX_READ_ERRORS - 1 {
            assert!(errors.record(ffmpeg_next::Error::InvalidData).is_ok());
        }
        errors.reset();
        for _ in 0..MAX_READ_ERRORS - 1 {
            assert!(errors.record(ffmpeg_next::Error::InvalidData).is_ok());
        }
    }

    #[test]
    fn persistent_read_errors_end_decoding() {
        let mut errors = ReadErrors::default();
        for _ in 0..MAX_READ_ERRORS - 1 {
            assert!(errors.record(ffmpeg_next::Error::InvalidData).is_ok());
        }
        let err = errors
            .record(ffmpeg_next::Error::InvalidData)
            .unwrap_err();
        assert!(err.to_string().contains("consecutive errors"));
    }
}
