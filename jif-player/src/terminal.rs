//! Crossterm host loop
//!
//! The loop owns the terminal, runs the controller's commands, and feeds it
//! messages from three sources: key and resize events (read on a helper
//! thread), worker results, and one-shot frame timers.

use crate::controller::{Action, Command, Message, PlaybackController};
use crate::pipeline::{Pipeline, CHANNEL_CAPACITY};
use crate::view::{self, Layer};
use crate::{Error, PlayerConfig, Result};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{
    self, BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use jif_core::FrameSource;
use log::{debug, error, info};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{self, Write};
use std::thread;
use std::time::Instant;

/// Plays `source` in the current terminal until the user quits
pub fn run(source: FrameSource, config: PlayerConfig) -> Result<()> {
    let pipeline = Pipeline::new(source);
    let controller = PlaybackController::new(pipeline.delays(), config);
    let (width, height) = terminal::size()?;
    info!(
        "Playing {} frames in a {}x{} terminal",
        pipeline.source().len(),
        width,
        height
    );

    let _guard = TerminalGuard::enter()?;
    let input = spawn_input_reader()?;
    let (worker_tx, worker_rx) = bounded(CHANNEL_CAPACITY);

    let mut host = Host {
        controller,
        pipeline,
        worker_tx,
        timers: BinaryHeap::new(),
        out: io::stdout(),
    };
    host.dispatch(Message::Resize { width, height })?;
    host.dispatch(Message::Start)?;
    host.draw()?;

    let mut input_open = true;
    while input_open && !host.controller.has_quit() {
        let timer = match host.timers.peek() {
            Some(Reverse((deadline, _))) => crossbeam_channel::at(*deadline),
            None => crossbeam_channel::never(),
        };

        select! {
            recv(worker_rx) -> message => {
                if let Ok(message) = message {
                    host.dispatch(message)?;
                }
            }
            recv(input) -> event => match event {
                Ok(event) => host.handle_event(event)?,
                Err(_) => {
                    error!("Terminal input closed");
                    input_open = false;
                }
            },
            recv(timer) -> _ => host.fire_due_timers()?,
        }

        host.draw()?;
    }

    match host.controller.failure() {
        Some(reason) => Err(Error::Worker(reason.to_string())),
        None => Ok(()),
    }
}

/// Maps a key press to a player action
pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePause),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('n') | KeyCode::Right => Some(Action::NextFrame),
        KeyCode::Char('p') | KeyCode::Left => Some(Action::PrevFrame),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

struct Host {
    controller: PlaybackController,
    pipeline: Pipeline,
    worker_tx: Sender<Message>,
    timers: BinaryHeap<Reverse<(Instant, u64)>>,
    out: io::Stdout,
}

impl Host {
    fn dispatch(&mut self, message: Message) -> Result<()> {
        for command in self.controller.update(message) {
            match command {
                Command::StartProcessing {
                    job,
                    cell_width,
                    cell_height,
                } => {
                    // Workers are detached; results come back through the channel
                    self.pipeline
                        .spawn(job, cell_width, cell_height, self.worker_tx.clone())?;
                }
                Command::ScheduleAdvance { token, after } => {
                    self.timers.push(Reverse((Instant::now() + after, token)));
                }
                Command::Quit => debug!("Quit requested"),
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => match action_for(key) {
                Some(action) => self.dispatch(Message::Key(action)),
                None => Ok(()),
            },
            Event::Resize(width, height) => self.dispatch(Message::Resize { width, height }),
            _ => Ok(()),
        }
    }

    fn fire_due_timers(&mut self) -> Result<()> {
        let now = Instant::now();
        while let Some(&Reverse((deadline, token))) = self.timers.peek() {
            if deadline > now {
                break;
            }
            self.timers.pop();
            self.dispatch(Message::FrameAdvance { token })?;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        if self.controller.has_quit() {
            return Ok(());
        }
        let height = self.controller.size().map_or(0, |s| s.height);
        draw_layers(&mut self.out, &view::layers(&self.controller), height)?;
        Ok(())
    }
}

fn draw_layers<W: Write>(out: &mut W, layers: &[Layer], height: u16) -> io::Result<()> {
    queue!(out, BeginSynchronizedUpdate, Clear(ClearType::All))?;
    for layer in layers {
        for (row, line) in layer.lines.iter().enumerate() {
            let y = layer.y as usize + row;
            if y >= height as usize {
                break;
            }
            queue!(out, MoveTo(layer.x, y as u16), Print(line))?;
        }
    }
    queue!(out, EndSynchronizedUpdate)?;
    out.flush()
}

/// Reads terminal events on a helper thread. The thread exits when the
/// receiver is dropped and the next event arrives.
fn spawn_input_reader() -> Result<Receiver<Event>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("jif-input".to_string())
        .spawn(move || loop {
            match event::read() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read terminal event: {}", e);
                    break;
                }
            }
        })
        .map_err(|source| Error::Spawn {
            name: "input",
            source,
        })?;
    Ok(rx)
}

/// Raw mode plus alternate screen for the lifetime of the guard
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            error!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = terminal::disable_raw_mode() {
            error!("Failed to disable raw mode: {}", e);
        }
    }
}
