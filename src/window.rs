//! The main window: three panes under one pause-all toggle.

use egui::{CentralPanel, Context, Rect, TopBottomPanel};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::backend::{FfmpegBackend, MediaBackend};
use crate::config::PanePreset;
use crate::dispatch::{UiDispatcher, DEFAULT_CAPACITY};
use crate::locator::Locator;
use crate::ui::controls::{empty_state, fit_size, PaneAction, PaneHeader, PauseAllBar};
use crate::viewer::{Posted, ViewerControl, ViewerHandle, ViewerId};

pub const PANE_COUNT: usize = 3;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "ts"];

pub struct MainWindow<B> {
    viewers: [ViewerControl<B>; PANE_COUNT],
    /// Last value pushed to every pane. Not reconciled with what the panes
    /// actually did.
    paused: bool,
    dispatcher: UiDispatcher<Posted>,
    pane_rects: [Option<Rect>; PANE_COUNT],
}

impl<B: MediaBackend> MainWindow<B> {
    /// Build the window on the calling thread, which becomes the UI thread
    /// if `dispatcher` was created here.
    pub fn new(backends: [B; PANE_COUNT], dispatcher: UiDispatcher<Posted>) -> Self {
        let mut index = 0;
        let viewers = backends.map(|backend| {
            let viewer = ViewerControl::new(ViewerId(index), backend, dispatcher.handle());
            index += 1;
            viewer
        });
        Self {
            viewers,
            paused: false,
            dispatcher,
            pane_rects: [None; PANE_COUNT],
        }
    }

    /// Flip the shared flag and push it to every pane. Returns the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        info!(paused = self.paused, "toggle pause on all panes");
        for viewer in &mut self.viewers {
            if let Err(e) = viewer.set_pause_playback(self.paused) {
                warn!(viewer = viewer.id().0, "pause toggle failed: {e}");
            }
        }
        self.paused
    }

    /// Rate first so the media opens at its configured speed.
    pub fn apply_presets(&mut self, presets: [PanePreset; PANE_COUNT]) {
        for (viewer, preset) in self.viewers.iter_mut().zip(presets) {
            if let Some(rate) = preset.rate {
                if let Err(e) = viewer.set_playback_rate(rate) {
                    warn!(viewer = viewer.id().0, "preset rate not applied: {e}");
                }
            }
            if preset.locator.is_some() {
                if let Err(e) = viewer.set_file_path(preset.locator) {
                    warn!(viewer = viewer.id().0, "preset media not opened: {e}");
                }
            }
            if preset.paused {
                if let Err(e) = viewer.set_pause_playback(true) {
                    warn!(viewer = viewer.id().0, "preset pause not applied: {e}");
                }
            }
        }
    }

    /// Run changes posted from other threads, then per-pane housekeeping.
    pub fn pump(&mut self) {
        match self.dispatcher.drain() {
            Ok(posted) => {
                for Posted { viewer, change } in posted {
                    match self.viewers.get_mut(viewer.0) {
                        Some(target) => {
                            if let Err(e) = target.apply(change) {
                                warn!(viewer = viewer.0, "posted change failed: {e}");
                            }
                        }
                        None => warn!(viewer = viewer.0, "change for unknown pane dropped"),
                    }
                }
            }
            Err(e) => warn!("{e}"),
        }
        for viewer in &mut self.viewers {
            if let Err(e) = viewer.poll() {
                warn!(viewer = viewer.id().0, "pane housekeeping failed: {e}");
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn viewers(&self) -> &[ViewerControl<B>; PANE_COUNT] {
        &self.viewers
    }

    pub fn viewer(&self, id: ViewerId) -> Option<&ViewerControl<B>> {
        self.viewers.get(id.0)
    }

    pub fn viewer_mut(&mut self, id: ViewerId) -> Option<&mut ViewerControl<B>> {
        self.viewers.get_mut(id.0)
    }

    pub fn handle(&self, id: ViewerId) -> Option<ViewerHandle> {
        self.viewer(id).map(ViewerControl::handle)
    }

    fn open_file(&mut self, index: usize) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Video", VIDEO_EXTENSIONS)
            .pick_file()
        {
            self.assign(index, path);
        }
    }

    fn assign(&mut self, index: usize, path: PathBuf) {
        if let Some(viewer) = self.viewers.get_mut(index) {
            if let Err(e) = viewer.set_file_path(Some(Locator::from_path(path))) {
                warn!(viewer = index, "could not open file: {e}");
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &Context) {
        let (dropped, pointer) = ctx.input(|i| {
            let paths: Vec<PathBuf> = i
                .raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect();
            (paths, i.pointer.latest_pos())
        });
        if dropped.is_empty() {
            return;
        }

        let start = pointer
            .and_then(|pos| {
                self.pane_rects
                    .iter()
                    .position(|r| r.is_some_and(|r| r.contains(pos)))
            })
            .unwrap_or(0);
        // Several files fill consecutive panes
        for (index, path) in (start..PANE_COUNT).zip(dropped) {
            self.assign(index, path);
        }
    }

    fn show_pane(ui: &mut egui::Ui, viewer: &ViewerControl<B>) -> (Option<PaneAction>, Rect) {
        let action = PaneHeader::show(ui, viewer);
        ui.separator();

        let rect = ui.available_rect_before_wrap();
        match viewer.backend().frame() {
            Some(frame) => {
                let size = fit_size(frame.size, ui.available_size());
                ui.centered_and_justified(|ui| {
                    ui.image((frame.texture, size));
                });
                if let Some(err) = viewer.last_error() {
                    ui.colored_label(egui::Color32::RED, err);
                }
            }
            None => empty_state(ui, viewer.last_error()),
        }
        (action, rect)
    }
}

impl MainWindow<FfmpegBackend> {
    pub fn create(cc: &eframe::CreationContext<'_>, presets: [PanePreset; PANE_COUNT]) -> Self {
        let ctx = cc.egui_ctx.clone();
        let dispatcher = UiDispatcher::new(DEFAULT_CAPACITY).with_waker(ctx.clone());
        let backends = std::array::from_fn(|_| FfmpegBackend::new(ctx.clone()));
        let mut window = Self::new(backends, dispatcher);
        window.apply_presets(presets);
        window
    }
}

impl<B: MediaBackend> eframe::App for MainWindow<B> {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.pump();
        for viewer in &mut self.viewers {
            viewer.backend_mut().update(ctx);
        }

        TopBottomPanel::top("pause_all").show(ctx, |ui| {
            if PauseAllBar::show(ui, self.paused) {
                self.toggle_pause();
            }
        });

        let mut actions = [None; PANE_COUNT];
        CentralPanel::default().show(ctx, |ui| {
            ui.columns(PANE_COUNT, |columns| {
                for (index, column) in columns.iter_mut().enumerate() {
                    let (action, rect) = Self::show_pane(column, &self.viewers[index]);
                    actions[index] = action;
                    self.pane_rects[index] = Some(rect);
                }
            });
        });

        for (index, action) in actions.into_iter().enumerate() {
            match action {
                Some(PaneAction::Open) => self.open_file(index),
                Some(PaneAction::Rate(rate)) => {
                    if let Err(e) = self.viewers[index].set_playback_rate(rate) {
                        warn!(viewer = index, "rate change failed: {e}");
                    }
                }
                None => {}
            }
        }

        self.handle_dropped_files(ctx);

        if self.viewers.iter().any(ViewerControl::is_playing) {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerState;
    use crate::test_utils::{Call, RecordingBackend};
    use crate::viewer::AttributeChange;
    use std::thread;

    fn window() -> (MainWindow<RecordingBackend>, [RecordingBackend; PANE_COUNT]) {
        let backends: [RecordingBackend; PANE_COUNT] = Default::default();
        let window = MainWindow::new(backends.clone(), UiDispatcher::new(16));
        (window, backends)
    }

    #[test]
    fn double_toggle_pauses_then_resumes_every_pane() {
        let (mut window, backends) = window();
        for backend in &backends {
            backend.set_state(PlayerState::Playing);
        }
        assert!(!window.is_paused());

        assert!(window.toggle_pause());
        assert!(!window.toggle_pause());

        for backend in &backends {
            assert_eq!(backend.calls(), vec![Call::Pause, Call::Play]);
        }
        for viewer in window.viewers() {
            assert!(!viewer.pause_playback());
        }
    }

    #[test]
    fn shared_flag_drifts_from_stopped_panes() {
        let (mut window, backends) = window();
        backends[0].set_state(PlayerState::Playing);

        window.toggle_pause();
        assert!(window.is_paused());
        assert_eq!(backends[0].calls(), vec![Call::Pause]);
        assert!(backends[1].calls().is_empty());
        assert!(backends[2].calls().is_empty());
    }

    #[test]
    fn pump_routes_posted_changes_on_the_ui_thread() {
        let (mut window, backends) = window();
        let owner = thread::current().id();
        let handle = window.handle(ViewerId(2)).unwrap();

        thread::spawn(move || {
            handle.set_playback_rate(0.5).unwrap();
            handle
                .post(AttributeChange::FilePath(Some(Locator::from_path("c.mp4"))))
                .unwrap();
        })
        .join()
        .unwrap();

        assert!(backends[2].calls().is_empty());
        window.pump();

        assert_eq!(
            backends[2].calls(),
            vec![
                Call::SetRate(0.5),
                Call::PlayLocator(Locator::from_path("c.mp4"))
            ]
        );
        assert!(backends[2].call_threads().iter().all(|t| *t == owner));
        assert!(backends[0].calls().is_empty());
        assert_eq!(
            window.viewer(ViewerId(2)).unwrap().file_path(),
            Some(&Locator::from_path("c.mp4"))
        );
    }

    #[test]
    fn pump_clears_finished_panes() {
        let (mut window, backends) = window();
        window
            .viewer_mut(ViewerId(1))
            .unwrap()
            .set_file_path(Some(Locator::from_path("b.mp4")))
            .unwrap();
        backends[1].finish();

        window.pump();
        assert_eq!(window.viewer(ViewerId(1)).unwrap().file_path(), None);
        assert_eq!(backends[1].calls().last(), Some(&Call::Stop));
    }

    #[test]
    fn presets_apply_rate_before_media() {
        let (mut window, backends) = window();
        let presets = [
            PanePreset {
                locator: Some(Locator::from_path("a.mp4")),
                rate: Some(2.0),
                paused: true,
            },
            PanePreset::default(),
            PanePreset::default(),
        ];
        window.apply_presets(presets);

        assert_eq!(
            backends[0].calls(),
            vec![
                Call::SetRate(2.0),
                Call::PlayLocator(Locator::from_path("a.mp4")),
                Call::Pause
            ]
        );
        assert!(backends[1].calls().is_empty());
    }

    #[test]
    fn failed_preset_does_not_block_other_panes() {
        let (mut window, backends) = window();
        backends[0].fail_next_open();
        let presets = [
            PanePreset {
                locator: Some(Locator::from_path("broken.mp4")),
                rate: None,
                paused: true,
            },
            PanePreset {
                locator: Some(Locator::from_path("b.mp4")),
                rate: None,
                paused: false,
            },
            PanePreset::default(),
        ];
        window.apply_presets(presets);

        assert!(window.viewer(ViewerId(0)).unwrap().last_error().is_some());
        assert_eq!(
            backends[1].calls(),
            vec![Call::PlayLocator(Locator::from_path("b.mp4"))]
        );
        assert_eq!(window.viewer(ViewerId(1)).unwrap().last_error(), None);
    }

    #[test]
    fn unknown_pane_has_no_handle() {
        let (window, _) = window();
        assert!(window.handle(ViewerId(PANE_COUNT)).is_none());
    }
}
