use crate::audio::{MediaPlayer, NullMediaPlayer, RodioMediaPlayer};
use crate::config;
use crate::core::{Focus, HubCommand, HubCore, VOLUME_STEP};
use crate::logging;
use crate::presence::{LanyardClient, PresenceDisplay, PresencePoller};
use crate::ui::{self, Button, HubLayout};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::Rect;
use std::io::{Stdout, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct AppOptions {
    pub config_path: Option<PathBuf>,
    pub null_audio: bool,
}

pub fn run(options: AppOptions) -> Result<()> {
    config::ensure_config_dir()?;
    logging::init(&config::log_path()?);

    let config_path = match options.config_path {
        Some(path) => path,
        None => config::config_path()?,
    };
    let hub_config = config::load_config_from(&config_path)?;
    let media_base = config::media_base_for(&config_path);
    info!(
        "loaded {} ({} tracks)",
        config_path.display(),
        hub_config.tracks.len()
    );

    let mut player = open_player(options.null_audio);
    let mut core = HubCore::new(
        hub_config.playlist(&media_base),
        hub_config.initial_volume,
        hub_config.default_cover_path(&media_base),
    );

    let poller = hub_config.presence_id().map(|id| {
        PresencePoller::start(
            LanyardClient::new(),
            id.to_string(),
            Duration::from_secs(hub_config.presence_poll_seconds),
        )
    });
    if poller.is_some() {
        core.set_presence(PresenceDisplay::Pending);
    }

    core.start(&mut *player, hub_config.random_on_load, hub_config.autoplay);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut core, &mut *player, poller.as_ref());

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    if let Some(poller) = &poller {
        poller.shutdown();
    }
    info!("session ended");
    result
}

fn open_player(null_audio: bool) -> Box<dyn MediaPlayer> {
    if null_audio {
        return Box::new(NullMediaPlayer::new());
    }
    match RodioMediaPlayer::new() {
        Ok(player) => Box::new(player),
        Err(err) => {
            warn!("no audio output, falling back to the null player: {err:#}");
            Box::new(NullMediaPlayer::new())
        }
    }
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    core: &mut HubCore,
    player: &mut dyn MediaPlayer,
    poller: Option<&PresencePoller>,
) -> Result<()> {
    let output_name = player.output_name();
    let mut command_line: Option<String> = None;
    let mut layout = HubLayout::new(Rect::default());
    let mut last_tick = Instant::now();

    loop {
        for event in player.poll_events() {
            core.handle_media_event(event, player);
        }
        if let Some(update) = poller.and_then(PresencePoller::latest) {
            core.set_presence(update);
        }

        if core.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                layout = HubLayout::new(frame.area());
                ui::draw(frame, core, &output_name, command_line.as_deref())
            })?;
            core.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        match event::read()? {
            Event::Mouse(mouse) => handle_mouse(core, player, &layout, mouse),
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(core, player, &mut command_line, key) == Flow::Quit {
                    return Ok(());
                }
            }
            Event::Resize(_, _) => core.dirty = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn handle_key(
    core: &mut HubCore,
    player: &mut dyn MediaPlayer,
    command_line: &mut Option<String>,
    key: KeyEvent,
) -> Flow {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Quit;
    }
    if let Some(buffer) = command_line {
        match key.code {
            KeyCode::Esc => *command_line = None,
            KeyCode::Enter => {
                let input = std::mem::take(buffer);
                *command_line = None;
                match HubCommand::parse(&input) {
                    Ok(command) => {
                        if core.run_command(command, player) {
                            return Flow::Quit;
                        }
                    }
                    Err(message) => core.set_status(&message),
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(ch) => buffer.push(ch),
            _ => {}
        }
        core.dirty = true;
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char(' ') => core.toggle_play(player),
        KeyCode::Left if core.focus == Focus::SeekBar => core.seek_step(false, player),
        KeyCode::Right if core.focus == Focus::SeekBar => core.seek_step(true, player),
        KeyCode::Left => core.previous(player),
        KeyCode::Right => core.next(player),
        KeyCode::Tab | KeyCode::BackTab => core.cycle_focus(),
        KeyCode::Char('+') | KeyCode::Char('=') => core.adjust_volume(VOLUME_STEP, player),
        KeyCode::Char('-') => core.adjust_volume(-VOLUME_STEP, player),
        KeyCode::Char(':') => {
            *command_line = Some(String::new());
            core.dirty = true;
        }
        _ => {}
    }
    Flow::Continue
}

fn handle_mouse(
    core: &mut HubCore,
    player: &mut dyn MediaPlayer,
    layout: &HubLayout,
    mouse: MouseEvent,
) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(fraction) = layout.seek_fraction_at(mouse.column, mouse.row) {
                core.seek_fraction(fraction, player);
                return;
            }
            if !matches!(mouse.kind, MouseEventKind::Down(_)) {
                return;
            }
            match layout.button_at(mouse.column, mouse.row) {
                Some(Button::Previous) => core.previous(player),
                Some(Button::TogglePlay) => core.toggle_play(player),
                Some(Button::Next) => core.next(player),
                None => {}
            }
        }
        MouseEventKind::ScrollUp if mouse.row >= layout.controls.y => {
            core.adjust_volume(VOLUME_STEP, player)
        }
        MouseEventKind::ScrollDown if mouse.row >= layout.controls.y => {
            core.adjust_volume(-VOLUME_STEP, player)
        }
        _ => {}
    }
}
