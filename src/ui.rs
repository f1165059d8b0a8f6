use crate::core::{Focus, HubCore};
use crate::cover::COVER_COLUMNS;
use crate::model::PresenceStatus;
use crate::transport::TransportState;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

const APP_TITLE: &str = "LinkHub  ";
const BUTTON_WIDTH: u16 = 5;
const TIME_LABEL_WIDTH: u16 = 7;

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    focus_border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(24, 38, 58),
    border: Color::Rgb(69, 121, 176),
    focus_border: Color::Rgb(255, 122, 165),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Previous,
    TogglePlay,
    Next,
}

const BUTTONS: [Button; 3] = [Button::Previous, Button::TogglePlay, Button::Next];

/// Screen regions shared by the renderer and mouse hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubLayout {
    pub header: Rect,
    pub cover: Rect,
    pub now_playing: Rect,
    pub presence: Rect,
    pub seek_bar: Rect,
    pub controls: Rect,
    pub message: Rect,
}

impl HubLayout {
    pub fn new(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(COVER_COLUMNS + 2),
                Constraint::Min(20),
                Constraint::Percentage(34),
            ])
            .split(vertical[1]);

        Self {
            header: vertical[0],
            cover: body[0],
            now_playing: body[1],
            presence: body[2],
            seek_bar: vertical[2],
            controls: vertical[3],
            message: vertical[4],
        }
    }

    /// The clickable track of the seek bar, between the two time labels.
    pub fn seek_track(&self) -> Rect {
        let inner = self.seek_bar.inner(Margin {
            vertical: 1,
            horizontal: 1,
        });
        Rect {
            x: inner.x.saturating_add(TIME_LABEL_WIDTH),
            y: inner.y,
            width: inner.width.saturating_sub(TIME_LABEL_WIDTH * 2),
            height: inner.height.min(1),
        }
    }

    /// Fraction of the track under a click, if the click hit it.
    pub fn seek_fraction_at(&self, column: u16, row: u16) -> Option<f64> {
        let track = self.seek_track();
        if track.width == 0 || !contains(track, column, row) {
            return None;
        }
        Some(f64::from(column - track.x) / f64::from(track.width))
    }

    fn button_rect(&self, slot: u16) -> Rect {
        let inner = self.controls.inner(Margin {
            vertical: 1,
            horizontal: 1,
        });
        Rect {
            x: inner.x.saturating_add(slot * (BUTTON_WIDTH + 1)),
            y: inner.y,
            width: BUTTON_WIDTH.min(inner.width),
            height: inner.height.min(1),
        }
    }

    pub fn button_at(&self, column: u16, row: u16) -> Option<Button> {
        BUTTONS
            .iter()
            .enumerate()
            .find(|(slot, _)| contains(self.button_rect(*slot as u16), column, row))
            .map(|(_, button)| *button)
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

pub fn draw(frame: &mut Frame, core: &HubCore, output_name: &str, command_line: Option<&str>) {
    let colors = PALETTE;
    let layout = HubLayout::new(frame.area());
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    draw_header(frame, core, output_name, layout.header, &colors);
    draw_cover(frame, core, layout.cover, &colors);
    draw_now_playing(frame, core, layout.now_playing, &colors);
    draw_presence(frame, core, layout.presence, &colors);
    draw_seek_bar(frame, core, &layout, &colors);
    draw_controls(frame, core, &layout, &colors);
    draw_message(frame, core, command_line, layout.message, &colors);
}

fn draw_header(frame: &mut Frame, core: &HubCore, output_name: &str, area: Rect, colors: &Palette) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Tracks {}", core.transport.tracks().len()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(output_name.to_string(), Style::default().fg(colors.muted)),
    ]))
    .block(panel_block("Hub", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(header, area);
}

fn draw_cover(frame: &mut Frame, core: &HubCore, area: Rect, colors: &Palette) {
    let block = panel_block("Cover", colors.panel_alt_bg, colors.text, colors.border);
    let lines = match core.cover() {
        Some(cover) => cover.lines(),
        None => vec![
            Line::from(""),
            Line::from(Span::styled("   ♪", Style::default().fg(colors.muted))),
        ],
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn state_label(state: TransportState) -> &'static str {
    match state {
        TransportState::Idle => "Stopped",
        TransportState::LoadedPaused => "Paused",
        TransportState::LoadedPlaying => "Playing",
        TransportState::PendingPlay => "Starting…",
    }
}

fn draw_now_playing(frame: &mut Frame, core: &HubCore, area: Rect, colors: &Palette) {
    let transport = &core.transport;
    let text = match transport.current_track() {
        Some(track) => vec![
            Line::from(Span::styled(
                track.display_title().to_string(),
                Style::default()
                    .fg(colors.text)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                track.artist.clone(),
                Style::default().fg(colors.muted),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "Track   {}/{}",
                    transport.current_index() + 1,
                    transport.tracks().len()
                ),
                Style::default().fg(colors.alert),
            )),
            Line::from(Span::styled(
                format!("State   {}", state_label(transport.state())),
                Style::default().fg(colors.accent),
            )),
        ],
        None if transport.is_empty() => vec![Line::from(Span::styled(
            "No songs found",
            Style::default().fg(colors.muted),
        ))],
        None => vec![Line::from(Span::styled(
            "Nothing loaded",
            Style::default().fg(colors.muted),
        ))],
    };

    let panel = Paragraph::new(text)
        .block(panel_block(
            "Now Playing",
            colors.panel_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(panel, area);
}

fn status_color(status: PresenceStatus) -> Color {
    match status {
        PresenceStatus::Online => Color::Rgb(67, 181, 129),
        PresenceStatus::Idle => Color::Rgb(250, 166, 26),
        PresenceStatus::Dnd => Color::Rgb(240, 71, 71),
        PresenceStatus::Offline => Color::Rgb(116, 127, 141),
    }
}

fn draw_presence(frame: &mut Frame, core: &HubCore, area: Rect, colors: &Palette) {
    let presence = &core.presence;
    let status = presence.status();
    let text = vec![
        Line::from(vec![
            Span::styled("● ", Style::default().fg(status_color(status))),
            Span::styled(
                presence.name().to_string(),
                Style::default()
                    .fg(colors.text)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            presence.activity().to_string(),
            Style::default().fg(colors.accent),
        )),
        Line::from(""),
        Line::from(Span::styled(
            presence.avatar_uri().to_string(),
            Style::default().fg(colors.muted),
        )),
    ];

    let card = Paragraph::new(text)
        .block(panel_block(
            "Discord",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(card, area);
}

pub fn seek_track_text(ratio: f64, width: usize) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
    let mut bar = String::with_capacity(width * 3);
    bar.push_str(&"━".repeat(filled));
    bar.push_str(&"─".repeat(width.saturating_sub(filled)));
    bar
}

fn draw_seek_bar(frame: &mut Frame, core: &HubCore, layout: &HubLayout, colors: &Palette) {
    let progress = core.transport.progress();
    let border = if core.focus == Focus::SeekBar {
        colors.focus_border
    } else {
        colors.border
    };
    let title = format!("Seek {}%", progress.value_now());
    frame.render_widget(
        panel_block(&title, colors.panel_bg, colors.text, border),
        layout.seek_bar,
    );

    let track = layout.seek_track();
    let inner = layout.seek_bar.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let elapsed = Rect {
        width: TIME_LABEL_WIDTH.min(inner.width),
        height: inner.height.min(1),
        ..inner
    };
    let duration = Rect {
        x: track.x.saturating_add(track.width),
        width: TIME_LABEL_WIDTH.min(inner.width),
        ..elapsed
    };

    frame.render_widget(
        Paragraph::new(Span::styled(
            progress.elapsed_label(),
            Style::default().fg(colors.text),
        )),
        elapsed,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            seek_track_text(progress.ratio(), usize::from(track.width)),
            Style::default().fg(colors.accent),
        )),
        track,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            progress.duration_label(),
            Style::default().fg(colors.text),
        ))
        .alignment(Alignment::Right),
        duration,
    );
}

fn button_glyph(button: Button, state: TransportState) -> &'static str {
    match button {
        Button::Previous => " ⏮  ",
        Button::Next => " ⏭  ",
        Button::TogglePlay => match state {
            TransportState::LoadedPlaying | TransportState::PendingPlay => " ❚❚  ",
            _ => " ▶  ",
        },
    }
}

pub fn volume_bar(value: u8, width: usize) -> String {
    let ratio = f64::from(value.min(100)) / 100.0;
    let filled = (ratio * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn draw_controls(frame: &mut Frame, core: &HubCore, layout: &HubLayout, colors: &Palette) {
    let border = if core.focus == Focus::Controls {
        colors.focus_border
    } else {
        colors.border
    };
    frame.render_widget(
        panel_block("Controls", colors.panel_bg, colors.text, border),
        layout.controls,
    );

    let state = core.transport.state();
    for (slot, button) in BUTTONS.iter().enumerate() {
        let glyph = Paragraph::new(Span::styled(
            button_glyph(*button, state),
            Style::default()
                .fg(colors.bg)
                .bg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(glyph, layout.button_rect(slot as u16));
    }

    let buttons_width = (BUTTON_WIDTH + 1) * BUTTONS.len() as u16 + 2;
    let inner = layout.controls.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let volume_area = Rect {
        x: inner.x.saturating_add(buttons_width),
        width: inner.width.saturating_sub(buttons_width),
        height: inner.height.min(1),
        ..inner
    };
    let volume = core.volume.value();
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Vol ", Style::default().fg(colors.muted)),
            Span::styled(volume_bar(volume, 14), Style::default().fg(colors.text)),
            Span::styled(format!(" {volume:>3}%"), Style::default().fg(colors.alert)),
        ])),
        volume_area,
    );
}

fn draw_message(
    frame: &mut Frame,
    core: &HubCore,
    command_line: Option<&str>,
    area: Rect,
    colors: &Palette,
) {
    let line = match command_line {
        Some(buffer) => Line::from(vec![
            Span::styled(":", Style::default().fg(colors.alert)),
            Span::styled(buffer.to_string(), Style::default().fg(colors.text)),
            Span::styled("▏", Style::default().fg(colors.accent)),
        ]),
        None => Line::from(vec![
            Span::styled(
                "Keys: Space play/pause, ←/→ prev/next or seek, Tab focus, +/- volume, : command, q quit",
                Style::default().fg(colors.muted),
            ),
            Span::styled("  |  ", Style::default().fg(colors.muted)),
            Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
        ]),
    };
    let title = if command_line.is_some() {
        "Command"
    } else {
        "Message"
    };
    frame.render_widget(
        Paragraph::new(line).block(panel_block(title, colors.panel_bg, colors.text, colors.border)),
        area,
    );
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullMediaPlayer;
    use crate::model::TrackDescriptor;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    fn screen() -> HubLayout {
        HubLayout::new(Rect::new(0, 0, 100, 30))
    }

    #[test]
    fn seek_clicks_map_to_fractions() {
        let layout = screen();
        let track = layout.seek_track();
        assert!(track.width > 0);

        assert_eq!(layout.seek_fraction_at(track.x, track.y), Some(0.0));
        let quarter = track.x + track.width / 4;
        let fraction = layout.seek_fraction_at(quarter, track.y).expect("hit");
        assert!((fraction - 0.25).abs() < 0.05);

        assert_eq!(layout.seek_fraction_at(track.x, track.y + 1), None);
        assert_eq!(layout.seek_fraction_at(track.x + track.width, track.y), None);
    }

    #[test]
    fn buttons_are_hit_tested_in_order() {
        let layout = screen();
        let first = layout.button_rect(0);
        let second = layout.button_rect(1);
        let third = layout.button_rect(2);

        assert_eq!(layout.button_at(first.x, first.y), Some(Button::Previous));
        assert_eq!(layout.button_at(second.x + 2, second.y), Some(Button::TogglePlay));
        assert_eq!(layout.button_at(third.x + 4, third.y), Some(Button::Next));
        assert_eq!(layout.button_at(first.x + BUTTON_WIDTH, first.y), None);
        assert_eq!(layout.button_at(0, 0), None);
    }

    #[test]
    fn bars_fill_proportionally() {
        assert_eq!(seek_track_text(0.5, 4), "━━──");
        assert_eq!(seek_track_text(3.0, 2), "━━");
        assert_eq!(volume_bar(10, 10), "[#---------]");
        assert_eq!(volume_bar(100, 4), "[####]");
    }

    #[test]
    fn renders_track_and_placeholder_presence() {
        let mut player = NullMediaPlayer::new();
        let mut core = HubCore::new(
            vec![TrackDescriptor {
                title: String::from("Piano Man"),
                artist: String::from("Billy Joel"),
                media_source: PathBuf::from("song5.mp3"),
                cover_image: PathBuf::from("missing.jpg"),
            }],
            10,
            PathBuf::from("missing-default.jpg"),
        );
        core.start(&mut player, false, false);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal
            .draw(|frame| draw(frame, &core, "Null audio output", None))
            .expect("draw");

        let rendered: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("Piano Man"));
        assert!(rendered.contains("Paused"));
        assert!(rendered.contains("Add your Discord ID"));
        assert!(rendered.contains("Tracks 1"));
    }
}
