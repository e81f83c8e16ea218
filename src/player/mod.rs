//! The embedded video widget: FFmpeg decoding on a worker thread, audio
//! through rodio, picture through an egui texture.

mod audio;
mod circular_buffer;
mod clock;
mod decoder;
mod video;

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use egui::{ColorImage, Context, TextureHandle, TextureOptions};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::locator::Locator;
use audio::AudioSource;
use circular_buffer::CircularBuffer;
use clock::AudioClock;
use decoder::{probe_media, start_decoder_thread, DecoderCommand, DecoderEvent, DecoderLinks};
use video::VideoFrameQueue;

/// Fastest playback speed the sink accepts
pub const MAX_RATE: f32 = 16.0;

const FRAME_QUEUE_LEN: usize = 30;
const COMMAND_QUEUE_LEN: usize = 16;

/// Playback state as reported to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
    /// Media played to its end
    Ended,
}

pub struct VideoPlayer {
    locator: Locator,
    state: PlayerState,
    seeking: bool,
    seek_target: f64,

    width: u32,
    height: u32,
    duration: f64,

    decoder_handle: Option<JoinHandle<()>>,
    command_sender: Sender<DecoderCommand>,
    events: Receiver<DecoderEvent>,
    stop_flag: Arc<AtomicBool>,
    at_eof: bool,
    end_reached: bool,
    failure: Option<String>,

    _output_stream: OutputStream, // Keep alive
    _stream_handle: OutputStreamHandle,
    sink: Sink,
    clock: AudioClock,

    frame_queue: VideoFrameQueue,
    texture: TextureHandle,
}

impl VideoPlayer {
    /// Open media and show its first frame. Playback starts with [`play`](Self::play).
    pub fn open(locator: &Locator, ctx: Context) -> Result<Self> {
        let info = probe_media(locator)?;
        let clock = AudioClock::new(info.sample_rate, info.channels);

        let (output_stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;

        // About two seconds of interleaved samples
        let audio_buffer =
            CircularBuffer::new(info.sample_rate as usize * info.channels as usize * 2);
        sink.append(AudioSource::new(
            audio_buffer.clone(),
            clock.clone(),
            info.has_audio,
        ));
        sink.pause();

        let (video_sender, video_receiver) = bounded(FRAME_QUEUE_LEN);
        let (command_sender, command_receiver) = bounded(COMMAND_QUEUE_LEN);
        let (event_sender, events) = bounded(4);
        let stop_flag = Arc::new(AtomicBool::new(false));

        let decoder_handle = start_decoder_thread(
            locator,
            DecoderLinks {
                video_sender,
                event_sender,
                audio_buffer,
                command_receiver,
                clock: clock.clone(),
                stop_flag: stop_flag.clone(),
            },
        )?;

        let texture = ctx.load_texture(
            format!("video_frame:{locator}"),
            ColorImage::new(
                [info.width as usize, info.height as usize],
                egui::Color32::BLACK,
            ),
            TextureOptions::LINEAR,
        );

        info!(%locator, width = info.width, height = info.height, "opened media");

        let mut player = Self {
            locator: locator.clone(),
            state: PlayerState::Stopped,
            seeking: false,
            seek_target: 0.0,
            width: info.width,
            height: info.height,
            duration: info.duration,
            decoder_handle: Some(decoder_handle),
            command_sender,
            events,
            stop_flag,
            at_eof: false,
            end_reached: false,
            failure: None,
            _output_stream: output_stream,
            _stream_handle: stream_handle,
            sink,
            clock,
            frame_queue: VideoFrameQueue::new(video_receiver, FRAME_QUEUE_LEN),
            texture,
        };

        // Let the decoder produce the first picture
        player.send_command(DecoderCommand::Resume);
        player.seek(0.0);

        Ok(player)
    }

    /// Start, resume, or restart after the end.
    pub fn play(&mut self) {
        if self.state == PlayerState::Ended {
            self.seek(0.0);
        }
        if self.state != PlayerState::Playing {
            self.state = PlayerState::Playing;
            self.sink.play();
            self.send_command(DecoderCommand::Resume);
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
            self.sink.pause();
            self.send_command(DecoderCommand::Pause);
        }
    }

    /// Halt and rewind.
    pub fn stop(&mut self) {
        self.state = PlayerState::Stopped;
        self.sink.pause();
        self.send_command(DecoderCommand::Pause);
        self.seek(0.0);
    }

    pub fn seek(&mut self, position: f64) {
        let position = position.clamp(0.0, self.duration.max(0.0));
        self.seeking = true;
        self.seek_target = position;
        self.at_eof = false;
        self.sink.pause();
        self.frame_queue.clear();
        self.clock.set_position(position);
        self.send_command(DecoderCommand::Seek(position));
    }

    fn send_command(&self, command: DecoderCommand) {
        send_command(&self.command_sender, &self.locator, command);
    }

    /// Speed multiplier. Callers keep it within `(0, MAX_RATE]`.
    pub fn set_rate(&mut self, rate: f32) {
        debug!(locator = %self.locator, rate, "set playback rate");
        self.sink.set_speed(rate);
    }

    /// Pump decoder events and upload the frame due now. Call once per frame.
    pub fn update(&mut self, ctx: &Context) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                DecoderEvent::EndOfStream => self.at_eof = true,
                DecoderEvent::Failed(reason) => {
                    warn!(locator = %self.locator, %reason, "playback failed");
                    self.failure = Some(reason);
                    self.state = PlayerState::Stopped;
                    self.seeking = false;
                    self.sink.pause();
                }
            }
        }

        if self.seeking {
            if let Some(frame) = self.frame_queue.first_after_seek(self.seek_target) {
                let image = ColorImage::from_rgba_unmultiplied(
                    [frame.width as usize, frame.height as usize],
                    &frame.rgba,
                );
                let pts = frame.pts;
                self.texture.set(image, TextureOptions::LINEAR);
                self.clock.set_position(pts);
                self.seeking = false;
                if self.state == PlayerState::Playing {
                    self.sink.play();
                }
            }
            ctx.request_repaint();
            return;
        }

        if self.state != PlayerState::Playing {
            return;
        }

        let now = self.clock.position();
        if let Some(frame) = self.frame_queue.next_due(now) {
            let image = ColorImage::from_rgba_unmultiplied(
                [frame.width as usize, frame.height as usize],
                &frame.rgba,
            );
            self.texture.set(image, TextureOptions::LINEAR);
        }

        if self.at_eof && self.frame_queue.is_drained() {
            info!(locator = %self.locator, "end of media");
            self.state = PlayerState::Ended;
            self.end_reached = true;
            self.sink.pause();
            self.send_command(DecoderCommand::Pause);
        }

        ctx.request_repaint();
    }

    /// True once per end-of-media.
    pub fn take_end_reached(&mut self) -> bool {
        std::mem::take(&mut self.end_reached)
    }

    /// Most recent decoder failure, cleared on read.
    pub fn take_failure(&mut self) -> Option<String> {
        self.failure.take()
    }

    pub fn texture(&self) -> &TextureHandle {
        &self.texture
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn video_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self) -> f64 {
        if self.seeking {
            self.seek_target
        } else {
            self.clock.position()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }
}

/// Queue a command without blocking the UI thread on a stalled decoder.
/// Returns false if the command was dropped.
fn send_command(
    sender: &Sender<DecoderCommand>,
    locator: &Locator,
    command: DecoderCommand,
) -> bool {
    match sender.try_send(command) {
        Ok(()) => true,
        Err(TrySendError::Full(command)) => {
            warn!(%locator, ?command, "decoder busy, dropping command");
            false
        }
        Err(TrySendError::Disconnected(command)) => {
            debug!(%locator, ?command, "decoder gone, dropping command");
            false
        }
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        let _ = self.command_sender.try_send(DecoderCommand::Stop);

        if let Some(handle) = self.decoder_handle.take() {
            let _ = handle.join();
        }
        debug!(locator = %self.locator, "decoder joined");
    }
}
