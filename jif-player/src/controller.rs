//! Playback state machine
//!
//! The controller never performs I/O. Each message returns the commands the
//! host must run: start a background processing job, arm a one-shot timer,
//! or quit. Messages produced by superseded jobs or timers carry an id that
//! no longer matches and are dropped.

use crate::PlayerConfig;
use jif_render::Progress;
use log::{debug, error, trace};
use std::time::Duration;

/// Terminal size in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub width: u16,
    pub height: u16,
}

impl TermSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Half-block glyph grid that fits this terminal; each glyph is two columns wide
    pub fn grid(&self) -> (u32, u32) {
        (self.width as u32 / 2, self.height as u32)
    }
}

/// User intents decoded from key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TogglePause,
    ToggleHelp,
    NextFrame,
    PrevFrame,
    Quit,
}

/// Inputs to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Begin loading
    Start,
    /// Partial rasterization of the first frame
    Progress { job: u64, progress: Progress },
    /// Every frame rasterized
    ProcessingComplete { job: u64, frames: Vec<String> },
    /// The worker died before producing frames
    ProcessingFailed { job: u64, reason: String },
    /// A one-shot timer fired
    FrameAdvance { token: u64 },
    /// A key was pressed
    Key(Action),
    /// The terminal was resized
    Resize { width: u16, height: u16 },
}

/// Side effects requested by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Composite and rasterize every frame for a `cell_width` x `cell_height` glyph grid
    StartProcessing {
        job: u64,
        cell_width: u32,
        cell_height: u32,
    },
    /// Deliver `Message::FrameAdvance { token }` once `after` has elapsed
    ScheduleAdvance { token: u64, after: Duration },
    /// Stop the host loop
    Quit,
}

#[derive(Debug, Clone, Copy)]
struct Job {
    id: u64,
    size: TermSize,
}

/// Playback controller holding all session state
#[derive(Debug)]
pub struct PlaybackController {
    config: PlayerConfig,
    delays: Vec<u16>,

    frames: Vec<String>,
    current_frame: usize,

    size: Option<TermSize>,
    paused: bool,
    show_help: bool,
    ready: bool,
    loading: bool,
    progress: Option<Progress>,

    job: Option<Job>,
    last_job: u64,
    timer: u64,
    quit: bool,
    failure: Option<String>,
}

impl PlaybackController {
    /// Creates a controller for an animation with the given per-frame delays
    pub fn new(delays: Vec<u16>, config: PlayerConfig) -> Self {
        Self {
            paused: config.start_paused,
            show_help: config.show_help,
            config,
            delays,
            frames: Vec::new(),
            current_frame: 0,
            size: None,
            ready: false,
            loading: false,
            progress: None,
            job: None,
            last_job: 0,
            timer: 0,
            quit: false,
            failure: None,
        }
    }

    /// Applies one message and returns the commands it triggers
    pub fn update(&mut self, message: Message) -> Vec<Command> {
        if self.quit {
            trace!("Ignoring {:?} after quit", message);
            return Vec::new();
        }

        match message {
            Message::Start => self.handle_start(),
            Message::Progress { job, progress } => self.handle_progress(job, progress),
            Message::ProcessingComplete { job, frames } => {
                self.handle_processing_complete(job, frames)
            }
            Message::ProcessingFailed { job, reason } => {
                self.handle_processing_failed(job, reason)
            }
            Message::FrameAdvance { token } => self.handle_frame_advance(token),
            Message::Key(action) => self.handle_key(action),
            Message::Resize { width, height } => {
                self.handle_resize(TermSize::new(width, height))
            }
        }
    }

    fn handle_start(&mut self) -> Vec<Command> {
        self.loading = true;
        match (self.size, self.job) {
            (Some(size), None) => vec![self.start_job(size)],
            _ => Vec::new(),
        }
    }

    fn handle_progress(&mut self, job: u64, progress: Progress) -> Vec<Command> {
        if !self.loading || self.ready || !self.is_current_job(job) {
            trace!("Dropping stale progress from job {}", job);
            return Vec::new();
        }
        self.progress = Some(progress);
        Vec::new()
    }

    fn handle_processing_complete(&mut self, job: u64, frames: Vec<String>) -> Vec<Command> {
        let Some(finished) = self.job.filter(|j| j.id == job) else {
            trace!("Dropping result of stale job {}", job);
            return Vec::new();
        };
        self.job = None;

        if let Some(size) = self.size.filter(|&size| size != finished.size) {
            debug!(
                "Terminal resized to {}x{} while loading, reprocessing",
                size.width, size.height
            );
            self.progress = None;
            return vec![self.start_job(size)];
        }

        debug!("Job {} finished with {} frames", job, frames.len());
        self.frames = frames;
        self.ready = true;
        self.loading = false;
        self.progress = None;
        self.current_frame = 0;

        if self.paused || self.frames.is_empty() {
            return Vec::new();
        }
        vec![self.schedule_advance()]
    }

    fn handle_processing_failed(&mut self, job: u64, reason: String) -> Vec<Command> {
        if !self.is_current_job(job) {
            trace!("Dropping failure of stale job {}", job);
            return Vec::new();
        }
        error!("Job {} failed: {}", job, reason);
        self.job = None;
        self.loading = false;
        self.failure = Some(reason);
        self.quit = true;
        vec![Command::Quit]
    }

    fn handle_frame_advance(&mut self, token: u64) -> Vec<Command> {
        if !self.ready || self.paused || self.frames.is_empty() || token != self.timer {
            trace!("Dropping stale frame timer {}", token);
            return Vec::new();
        }
        self.current_frame = (self.current_frame + 1) % self.frames.len();
        vec![self.schedule_advance()]
    }

    fn handle_key(&mut self, action: Action) -> Vec<Command> {
        match action {
            Action::TogglePause => {
                self.paused = !self.paused;
                if !self.paused && self.ready && !self.frames.is_empty() {
                    return vec![self.schedule_advance()];
                }
            }
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::NextFrame => self.step(1),
            Action::PrevFrame => self.step(-1),
            Action::Quit => {
                self.quit = true;
                return vec![Command::Quit];
            }
        }
        Vec::new()
    }

    fn handle_resize(&mut self, size: TermSize) -> Vec<Command> {
        let previous = self.size.replace(size);

        match previous {
            // First size report: processing may have been waiting for it
            None => {
                if self.loading && self.job.is_none() {
                    return vec![self.start_job(size)];
                }
                return Vec::new();
            }
            Some(previous) if previous == size => return Vec::new(),
            Some(_) => {}
        }

        // Loading (or not yet started): the finished job notices the new size
        if !self.ready {
            return Vec::new();
        }

        self.ready = false;
        self.loading = true;
        self.progress = None;
        self.frames.clear();
        vec![self.start_job(size)]
    }

    fn step(&mut self, delta: isize) {
        let count = self.frames.len();
        if count == 0 {
            return;
        }
        self.paused = true;
        let index = self.current_frame as isize + delta;
        self.current_frame = index.rem_euclid(count as isize) as usize;
    }

    fn start_job(&mut self, size: TermSize) -> Command {
        self.last_job += 1;
        self.job = Some(Job {
            id: self.last_job,
            size,
        });
        let (cell_width, cell_height) = size.grid();
        debug!(
            "Starting job {} for {}x{} terminal",
            self.last_job, size.width, size.height
        );
        Command::StartProcessing {
            job: self.last_job,
            cell_width,
            cell_height,
        }
    }

    /// Arms a fresh timer for the current frame; any earlier timer becomes stale
    fn schedule_advance(&mut self) -> Command {
        self.timer += 1;
        let delay = self.delays.get(self.current_frame).copied().unwrap_or(0);
        Command::ScheduleAdvance {
            token: self.timer,
            after: self.config.frame_duration(delay),
        }
    }

    fn is_current_job(&self, job: u64) -> bool {
        self.job.is_some_and(|j| j.id == job)
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Text of the frame on screen, once ready
    pub fn current_frame_text(&self) -> Option<&str> {
        if !self.ready {
            return None;
        }
        self.frames.get(self.current_frame).map(String::as_str)
    }

    pub fn size(&self) -> Option<TermSize> {
        self.size
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    /// Latest partial rasterization while loading
    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// True while a processing job is outstanding
    pub fn is_processing(&self) -> bool {
        self.job.is_some()
    }

    pub fn has_quit(&self) -> bool {
        self.quit
    }

    /// Why the session ended early, if a processing job failed
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("frame {i}\n")).collect()
    }

    fn progress(rows: usize, total: usize) -> Progress {
        Progress {
            partial: "▀▀\n".repeat(rows),
            rows_complete: rows,
            total_rows: total,
        }
    }

    /// Controller with a known size, started, job 1 in flight
    fn loading(delays: Vec<u16>) -> PlaybackController {
        let mut controller = PlaybackController::new(delays, PlayerConfig::default());
        assert!(controller.update(Message::Resize { width: 80, height: 24 }).is_empty());
        let commands = controller.update(Message::Start);
        assert_eq!(
            commands,
            vec![Command::StartProcessing {
                job: 1,
                cell_width: 40,
                cell_height: 24
            }]
        );
        controller
    }

    fn ready(delays: Vec<u16>) -> (PlaybackController, u64) {
        let count = delays.len();
        let mut controller = loading(delays);
        let commands = controller.update(Message::ProcessingComplete {
            job: 1,
            frames: frames(count),
        });
        let token = match commands.as_slice() {
            [Command::ScheduleAdvance { token, .. }] => *token,
            other => panic!("unexpected commands {other:?}"),
        };
        (controller, token)
    }

    fn advance_token(commands: &[Command]) -> u64 {
        match commands {
            [Command::ScheduleAdvance { token, .. }] => *token,
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn test_start_waits_for_size() {
        let mut controller = PlaybackController::new(vec![10], PlayerConfig::default());
        assert!(controller.update(Message::Start).is_empty());
        assert!(controller.is_loading());

        let commands = controller.update(Message::Resize { width: 100, height: 30 });
        assert_eq!(
            commands,
            vec![Command::StartProcessing {
                job: 1,
                cell_width: 50,
                cell_height: 30
            }]
        );
    }

    #[test]
    fn test_progress_accepted_while_loading() {
        let mut controller = loading(vec![10]);
        controller.update(Message::Progress {
            job: 1,
            progress: progress(2, 10),
        });
        let snapshot = controller.progress().unwrap();
        assert_eq!((snapshot.rows_complete, snapshot.total_rows), (2, 10));
    }

    #[test]
    fn test_progress_ignored_when_ready_or_stale() {
        let (mut controller, _) = ready(vec![10, 10]);
        controller.update(Message::Progress {
            job: 1,
            progress: progress(2, 10),
        });
        assert!(controller.progress().is_none());

        let mut controller = loading(vec![10]);
        controller.update(Message::Progress {
            job: 7,
            progress: progress(2, 10),
        });
        assert!(controller.progress().is_none());
    }

    #[test]
    fn test_processing_complete_enters_ready() {
        let mut controller = loading(vec![30, 30]);
        controller.update(Message::Progress {
            job: 1,
            progress: progress(4, 4),
        });
        let commands = controller.update(Message::ProcessingComplete {
            job: 1,
            frames: frames(2),
        });

        assert!(controller.is_ready());
        assert!(!controller.is_loading());
        assert!(controller.progress().is_none());
        assert_eq!(controller.current_frame(), 0);
        assert_eq!(
            commands,
            vec![Command::ScheduleAdvance {
                token: 1,
                after: Duration::from_millis(300)
            }]
        );
    }

    #[test]
    fn test_processing_complete_while_paused_does_not_schedule() {
        let config = PlayerConfig {
            start_paused: true,
            ..PlayerConfig::default()
        };
        let mut controller = PlaybackController::new(vec![10], config);
        controller.update(Message::Resize { width: 80, height: 24 });
        controller.update(Message::Start);
        let commands = controller.update(Message::ProcessingComplete {
            job: 1,
            frames: frames(1),
        });
        assert!(commands.is_empty());
        assert!(controller.is_ready());
    }

    #[test]
    fn test_frame_advance_wraps() {
        let (mut controller, mut token) = ready(vec![30, 30, 30]);
        for expected in [1, 2, 0, 1] {
            let commands = controller.update(Message::FrameAdvance { token });
            assert_eq!(controller.current_frame(), expected);
            token = advance_token(&commands);
        }
    }

    #[test]
    fn test_frame_advance_uses_new_frame_delay() {
        let (mut controller, token) = ready(vec![30, 0, 5]);
        let commands = controller.update(Message::FrameAdvance { token });
        assert_eq!(
            commands,
            vec![Command::ScheduleAdvance {
                token: token + 1,
                after: Duration::from_millis(100)
            }]
        );
    }

    #[test]
    fn test_frame_advance_ignored_when_paused() {
        let (mut controller, token) = ready(vec![10, 10]);
        controller.update(Message::Key(Action::TogglePause));
        assert!(controller.update(Message::FrameAdvance { token }).is_empty());
        assert_eq!(controller.current_frame(), 0);
    }

    #[test]
    fn test_frame_advance_ignored_when_not_ready() {
        let mut controller = loading(vec![10, 10]);
        assert!(controller.update(Message::FrameAdvance { token: 0 }).is_empty());
        assert_eq!(controller.current_frame(), 0);
    }

    #[test]
    fn test_resume_voids_previous_timer() {
        let (mut controller, old_token) = ready(vec![10, 10, 10]);
        assert!(controller.update(Message::Key(Action::TogglePause)).is_empty());
        let commands = controller.update(Message::Key(Action::TogglePause));
        let new_token = advance_token(&commands);

        assert!(controller.update(Message::FrameAdvance { token: old_token }).is_empty());
        assert_eq!(controller.current_frame(), 0);

        controller.update(Message::FrameAdvance { token: new_token });
        assert_eq!(controller.current_frame(), 1);
    }

    #[test]
    fn test_toggle_pause_before_ready_does_not_schedule() {
        let mut controller = loading(vec![10]);
        assert!(controller.update(Message::Key(Action::TogglePause)).is_empty());
        assert!(controller.is_paused());
        assert!(controller.update(Message::Key(Action::TogglePause)).is_empty());
        assert!(!controller.is_paused());
    }

    #[test]
    fn test_manual_step_pauses_and_wraps() {
        let (mut controller, _) = ready(vec![10, 10, 10]);

        controller.update(Message::Key(Action::PrevFrame));
        assert!(controller.is_paused());
        assert_eq!(controller.current_frame(), 2);

        controller.update(Message::Key(Action::NextFrame));
        controller.update(Message::Key(Action::NextFrame));
        assert_eq!(controller.current_frame(), 1);
    }

    #[test]
    fn test_manual_step_without_frames_is_noop() {
        let mut controller = loading(vec![10]);
        controller.update(Message::Key(Action::NextFrame));
        assert!(!controller.is_paused());
        assert_eq!(controller.current_frame(), 0);
    }

    #[test]
    fn test_toggle_help() {
        let mut controller = loading(vec![10]);
        assert!(!controller.show_help());
        controller.update(Message::Key(Action::ToggleHelp));
        assert!(controller.show_help());
        controller.update(Message::Key(Action::ToggleHelp));
        assert!(!controller.show_help());
    }

    #[test]
    fn test_quit_stops_everything() {
        let (mut controller, token) = ready(vec![10, 10]);
        assert_eq!(controller.update(Message::Key(Action::Quit)), vec![Command::Quit]);
        assert!(controller.has_quit());
        assert!(controller.update(Message::FrameAdvance { token }).is_empty());
        assert!(controller
            .update(Message::Resize { width: 10, height: 10 })
            .is_empty());
        assert_eq!(controller.current_frame(), 0);
    }

    #[test]
    fn test_processing_failure_quits() {
        let mut controller = loading(vec![10]);
        let commands = controller.update(Message::ProcessingFailed {
            job: 1,
            reason: "boom".into(),
        });
        assert_eq!(commands, vec![Command::Quit]);
        assert!(controller.has_quit());
        assert!(!controller.is_processing());
        assert_eq!(controller.failure(), Some("boom"));
    }

    #[test]
    fn test_stale_processing_failure_ignored() {
        let (mut controller, _) = ready(vec![10]);
        controller.update(Message::Resize { width: 120, height: 40 });

        let commands = controller.update(Message::ProcessingFailed {
            job: 1,
            reason: "boom".into(),
        });
        assert!(commands.is_empty());
        assert!(!controller.has_quit());
        assert!(controller.failure().is_none());
        assert!(controller.is_processing());
    }

    #[test]
    fn test_resize_same_size_is_noop() {
        let (mut controller, _) = ready(vec![10]);
        assert!(controller
            .update(Message::Resize { width: 80, height: 24 })
            .is_empty());
        assert!(controller.is_ready());
    }

    #[test]
    fn test_resize_when_ready_restarts_processing() {
        let (mut controller, token) = ready(vec![10, 10]);
        controller.update(Message::FrameAdvance { token });

        let commands = controller.update(Message::Resize { width: 120, height: 40 });
        assert_eq!(
            commands,
            vec![Command::StartProcessing {
                job: 2,
                cell_width: 60,
                cell_height: 40
            }]
        );
        assert!(!controller.is_ready());
        assert!(controller.is_loading());
        assert!(controller.frames().is_empty());
        assert!(controller.current_frame_text().is_none());
    }

    #[test]
    fn test_resize_while_loading_reprocesses_once_with_latest_size() {
        let mut controller = loading(vec![10, 10]);

        assert!(controller
            .update(Message::Resize { width: 100, height: 30 })
            .is_empty());
        assert!(controller
            .update(Message::Resize { width: 120, height: 40 })
            .is_empty());
        assert!(controller.is_processing());

        let commands = controller.update(Message::ProcessingComplete {
            job: 1,
            frames: frames(2),
        });
        assert_eq!(
            commands,
            vec![Command::StartProcessing {
                job: 2,
                cell_width: 60,
                cell_height: 40
            }]
        );
        assert!(!controller.is_ready());
        assert!(controller.is_loading());

        // Progress from the superseded job is dropped
        controller.update(Message::Progress {
            job: 1,
            progress: progress(2, 2),
        });
        assert!(controller.progress().is_none());

        let commands = controller.update(Message::ProcessingComplete {
            job: 2,
            frames: frames(2),
        });
        assert!(controller.is_ready());
        assert_eq!(advance_token(&commands), 1);
    }

    #[test]
    fn test_resize_back_to_original_while_loading_keeps_result() {
        let mut controller = loading(vec![10]);
        controller.update(Message::Resize { width: 100, height: 30 });
        controller.update(Message::Resize { width: 80, height: 24 });

        let commands = controller.update(Message::ProcessingComplete {
            job: 1,
            frames: frames(1),
        });
        assert!(controller.is_ready());
        assert!(matches!(commands.as_slice(), [Command::ScheduleAdvance { .. }]));
    }

    #[test]
    fn test_current_frame_text() {
        let (mut controller, token) = ready(vec![10, 10]);
        assert_eq!(controller.current_frame_text(), Some("frame 0\n"));
        controller.update(Message::FrameAdvance { token });
        assert_eq!(controller.current_frame_text(), Some("frame 1\n"));
    }
}
