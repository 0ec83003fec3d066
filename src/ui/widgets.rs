use super::AppState;
use crate::metrics::format_bytes;
use crate::network::packet::node_label;
use crate::network::PacketStatus;
use crate::render::{palette, present, DrawCommand, Frame as MeshFrame, Rgba, Surface};
use crate::simulation::{Message, Sender};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine},
        Block, BorderType, Borders, List, ListItem, Paragraph, Widget,
    },
    Frame,
};

const PACKET_LOG_LEN: usize = 5;
// newest packet gets an extra payload line
const PACKET_LOG_ROWS: u16 = PACKET_LOG_LEN as u16 + 1;
// braille dots need more contrast than canvas pixels
const MIN_TERMINAL_ALPHA: f64 = 0.35;

fn color(c: Rgba) -> Color {
    let (r, g, b) = c.with_alpha(c.a.max(MIN_TERMINAL_ALPHA)).over(palette::BACKGROUND);
    Color::Rgb(r, g, b)
}

fn muted() -> Style {
    Style::default().fg(Color::Gray)
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(color(palette::ACCENT)).add_modifier(Modifier::BOLD),
        ))
}

pub fn draw(f: &mut Frame, app: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(1), // status bar
            Constraint::Min(0),    // body
        ])
        .split(f.area());

    render_header(f, chunks[0]);
    render_status_bar(f, chunks[1], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(PACKET_LOG_ROWS + 2)])
        .split(body[0]);

    render_topology(f, left[0], app);
    render_packet_log(f, left[1], app);
    render_terminal(f, body[1], app);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " OBARO LABS ",
            Style::default().fg(color(palette::ACCENT)).add_modifier(Modifier::BOLD),
        ),
        Span::styled("// ECHO PROTOCOL v1.0", muted()),
    ]));
    f.render_widget(header, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let stats = app.snapshot.stats;
    let (dot, label) = if app.mesh_active {
        (palette::DELIVERED, "MESH ACTIVE")
    } else {
        (palette::FAILED, "DISCONNECTED")
    };

    let bar = Paragraph::new(Line::from(vec![
        Span::styled(" ● ", Style::default().fg(color(dot))),
        Span::styled(format!("{:<14}", label), muted()),
        Span::styled("PACKETS: ", muted()),
        Span::styled(
            format!("{}  ", stats.packets_transmitted),
            Style::default().fg(color(palette::ACCENT)),
        ),
        Span::styled("TRANSFER: ", muted()),
        Span::styled(
            format!("{}  ", format_bytes(stats.bytes_transferred)),
            Style::default().fg(color(palette::PLAINTEXT)),
        ),
        Span::styled("ENCRYPTED: ", muted()),
        Span::styled(
            format!("{:.1}%  ", stats.encryption_rate),
            Style::default().fg(color(palette::ENCRYPTED)),
        ),
        Span::styled("LATENCY: ", muted()),
        Span::styled(
            format!("{:.0}ms", stats.latency_ms),
            Style::default().fg(color(palette::DELIVERED)),
        ),
    ]));
    f.render_widget(bar, area);
}

/// Paints mesh frames onto a region of the terminal buffer.
struct CanvasSurface<'a> {
    area: Rect,
    buf: &'a mut Buffer,
}

impl Surface for CanvasSurface<'_> {
    fn is_ready(&self) -> bool {
        self.area.width > 2 && self.area.height > 2
    }

    fn draw(&mut self, frame: &MeshFrame) {
        let background = frame
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Clear { color } => Some(*color),
                _ => None,
            })
            .unwrap_or(palette::BACKGROUND);

        let (r, g, b) = background.over(palette::BACKGROUND);
        Canvas::default()
            .block(panel(" NETWORK TOPOLOGY "))
            .marker(Marker::Braille)
            .background_color(Color::Rgb(r, g, b))
            .x_bounds([0.0, frame.width])
            .y_bounds([0.0, frame.height])
            .paint(|ctx| paint(ctx, frame))
            .render(self.area, self.buf);
    }
}

fn paint(ctx: &mut Context, frame: &MeshFrame) {
    // canvas y grows upwards, frame y grows downwards
    let flip = |y: f64| frame.height - y;
    let mut previous_was_line = false;

    for command in &frame.commands {
        match command {
            DrawCommand::Clear { .. } => {}
            DrawCommand::Line { from, to, color: c, .. } => {
                previous_was_line = true;
                ctx.draw(&CanvasLine {
                    x1: from.x,
                    y1: flip(from.y),
                    x2: to.x,
                    y2: flip(to.y),
                    color: color(*c),
                });
            }
            DrawCommand::Glow { center, radius, inner } => {
                if previous_was_line {
                    ctx.layer();
                    previous_was_line = false;
                }
                for step in [1.0, 0.66, 0.33] {
                    ctx.draw(&Circle {
                        x: center.x,
                        y: flip(center.y),
                        radius: radius * step,
                        color: color(inner.with_alpha(inner.a * (1.0 - step) + 0.1)),
                    });
                }
            }
            DrawCommand::Circle { center, radius, color: c } => {
                let mut r = *radius;
                while r > 0.0 {
                    ctx.draw(&Circle {
                        x: center.x,
                        y: flip(center.y),
                        radius: r,
                        color: color(*c),
                    });
                    r -= 1.0;
                }
            }
            DrawCommand::Label { at, text, color: c } => {
                ctx.print(
                    at.x,
                    flip(at.y),
                    Span::styled(text.clone(), Style::default().fg(color(*c))),
                );
            }
        }
    }
}

fn render_topology(f: &mut Frame, area: Rect, app: &mut AppState) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    app.observe_canvas(inner.width, inner.height);

    let mut surface = CanvasSurface {
        area,
        buf: f.buffer_mut(),
    };
    present(Some(&mut surface), &app.snapshot.frame);
}

fn status_color(status: PacketStatus) -> Color {
    match status {
        PacketStatus::Delivered => color(palette::DELIVERED),
        PacketStatus::Failed => color(palette::FAILED),
        PacketStatus::Transit => color(palette::ACCENT),
        PacketStatus::Pending => Color::DarkGray,
    }
}

fn render_packet_log(f: &mut Frame, area: Rect, app: &AppState) {
    let items: Vec<ListItem> = app
        .snapshot
        .packets
        .iter()
        .rev()
        .take(PACKET_LOG_LEN)
        .enumerate()
        .map(|(i, p)| {
            let (tag, tag_color) = if p.encrypted {
                ("ENC", palette::ENCRYPTED)
            } else {
                ("PLN", palette::PLAINTEXT)
            };
            let summary = Line::from(vec![
                Span::styled(" ● ", Style::default().fg(status_color(p.status()))),
                Span::styled(
                    format!("{} → {} ", node_label(p.sender), node_label(p.receiver)),
                    muted(),
                ),
                Span::styled(format!("{} ", tag), Style::default().fg(color(tag_color))),
                Span::styled(format!("{}B", p.size_bytes), Style::default().fg(Color::White)),
            ]);
            if i == 0 {
                let payload = Line::from(Span::styled(
                    format!("   └ {}", p.payload_hex()),
                    Style::default().fg(Color::DarkGray),
                ));
                ListItem::new(vec![summary, payload])
            } else {
                ListItem::new(summary)
            }
        })
        .collect();

    f.render_widget(List::new(items).block(panel(" PACKET LOG ")), area);
}

fn message_lines(message: &Message) -> [Line<'static>; 2] {
    let (direction, indent) = match message.sender {
        Sender::Local => ("TX", "    "),
        Sender::Remote => ("RX", ""),
    };
    let (lock, lock_color) = if message.encrypted {
        ("[E2E]", palette::ENCRYPTED)
    } else {
        ("[PLN]", palette::PLAINTEXT)
    };
    let content_color = match (message.sender, message.encrypted) {
        (Sender::Local, true) => color(palette::ENCRYPTED),
        (Sender::Local, false) => color(palette::PLAINTEXT),
        (Sender::Remote, _) => Color::White,
    };

    [
        Line::from(vec![
            Span::raw(indent),
            Span::styled(format!("{} ", direction), muted()),
            Span::styled(format!("{} ", lock), Style::default().fg(color(lock_color))),
            Span::styled(format!("#{}", message.hash), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::raw(indent),
            Span::styled(message.content.clone(), Style::default().fg(content_color)),
        ]),
    ]
}

fn render_terminal(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let messages = &app.snapshot.messages;
    let log_block = panel(" SECURE TERMINAL ");
    let visible_rows = log_block.inner(chunks[0]).height as usize;

    let log = if messages.is_empty() {
        Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("AWAITING TRANSMISSION", muted())).centered(),
        ])
    } else {
        // newest entries stay in view
        let fits = (visible_rows / 2).max(1);
        let start = messages.len().saturating_sub(fits);
        let lines: Vec<Line> = messages[start..].iter().flat_map(message_lines).collect();
        Paragraph::new(lines)
    };
    f.render_widget(log.block(log_block), chunks[0]);

    let (toggle, toggle_color) = if app.encrypted {
        ("[LOCK] ", palette::ENCRYPTED)
    } else {
        ("[OPEN] ", palette::PLAINTEXT)
    };
    let input = Paragraph::new(Line::from(vec![
        Span::styled(toggle, Style::default().fg(color(toggle_color))),
        if app.input.is_empty() {
            Span::styled("Enter message...", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(app.input.clone(), Style::default().fg(Color::White))
        },
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color(palette::ACCENT))),
    );
    f.render_widget(input, chunks[1]);

    let hint = if app.encrypted {
        Span::styled("MESSAGE WILL BE ENCRYPTED WITH AES-256-GCM", muted())
    } else {
        Span::styled(
            "WARNING: MESSAGE WILL BE SENT UNENCRYPTED",
            Style::default().fg(Color::Yellow),
        )
    };
    let keys = Span::styled("   tab: toggle  F2: mesh  esc: quit", Style::default().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(Line::from(vec![hint, keys])), chunks[2]);
}
