//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────────────┐
//! │  ☀ solarwatch   http://127.0.0.1:8000   ⚠ FLARE ALERT     │
//! ├────────────────────┬─────────────────────────────────────┤
//! │                    │  Flux  B1.3 ╭──────────────────────  │
//! │    ( animated )    │             ╰──────────────────────  │
//! │    (   sun    )    ├─────────────────────────────────────┤
//! │                    │  Forecast  75% X-Class              │
//! ├────────────────────┴──────────────┬──────────────────────┤
//! │  Telemetry: events, regions       │  Model metrics       │
//! ├───────────────────────────────────┴──────────────────────┤
//! │  p: predict   q: quit                                    │
//! └──────────────────────────────────────────────────────────┘

use super::app::{App, FLUX_LOG_BOUNDS, PREDICTION_CHART_LEN, flux_points, prediction_points};
use ratatui::{
    prelude::*,
    widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine},
    widgets::*,
};
use solarwatch_core::animation::{CANVAS_SIZE, CoreShade, SUN_GRADIENT, SurfaceFrame};
use solarwatch_core::{FlareClass, FluxClass, MetricsView};

/// Spacing between the concentric rings that fill a disc.
const DISC_RING_STEP: f64 = 3.0;
const REGION_RING_STEP: f64 = 1.5;

const HALO_RGB: [u8; 3] = [0xFF, 0x45, 0x00];
const FLARE_RGB: [u8; 3] = [0xFF, 0xD7, 0x00];
const SPACE_RGB: [u8; 3] = [0, 0, 0];

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(14),   // surface + charts
            Constraint::Length(9), // telemetry + metrics
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_main(f, rows[1], app);
    draw_panels(f, rows[2], app);
    draw_keys(f, rows[3], app);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let alert = app.view().alert;
    let banner = if alert.state.is_active() {
        Span::styled(
            "  ⚠ FLARE ALERT ",
            Style::default().bold().fg(Color::White).bg(Color::Red),
        )
    } else {
        Span::styled(
            format!("  alert idle · {} checks ", alert.checks),
            Style::default().fg(Color::DarkGray),
        )
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if alert.state.is_active() {
            Color::Red
        } else {
            Color::Yellow
        }))
        .title(Line::from(vec![
            Span::styled(" ☀ solarwatch ", Style::default().bold().fg(Color::Yellow)),
            Span::raw("  api: "),
            Span::styled(app.api_base(), Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("  up {}s", app.uptime().as_secs()),
                Style::default().fg(Color::DarkGray),
            ),
            banner,
        ]));

    f.render_widget(block, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    draw_surface(f, cols[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[1]);

    draw_flux_chart(f, right[0], app);
    draw_prediction_chart(f, right[1], app);
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

fn draw_surface(f: &mut Frame, area: Rect, app: &App) {
    let Some(frame) = app.view().surface.clone() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Solar surface ");
        f.render_widget(Paragraph::new("animation stopped").block(block), area);
        return;
    };

    let title = if frame.flare_active() {
        " Solar surface  ✦ flare "
    } else {
        " Solar surface "
    };
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, CANVAS_SIZE])
        .y_bounds([0.0, CANVAS_SIZE])
        .paint(move |ctx| paint_surface(ctx, &frame));
    f.render_widget(canvas, area);
}

fn paint_surface(ctx: &mut Context, frame: &SurfaceFrame) {
    let (cx, cy) = to_canvas(frame.center);
    fill_disc(ctx, cx, cy, frame.radius, DISC_RING_STEP, |offset| {
        rgb(gradient_at(offset))
    });
    ctx.layer();

    let limb = SUN_GRADIENT[SUN_GRADIENT.len() - 1].1;
    for region in &frame.regions {
        let (x, y) = to_canvas(region.center);
        if let Some(halo) = region.halo {
            ctx.draw(&Circle {
                x,
                y,
                radius: halo.radius,
                color: rgb(blend(HALO_RGB, limb, halo.alpha)),
            });
        }
        let color = shade_color(region.shade);
        fill_disc(ctx, x, y, region.radius, REGION_RING_STEP, |_| color);
    }

    if let Some(flare) = frame.flare {
        let (x1, y1) = to_canvas(flare.from);
        let (x2, y2) = to_canvas(flare.to);
        ctx.draw(&CanvasLine {
            x1,
            y1,
            x2,
            y2,
            color: rgb(blend(FLARE_RGB, SPACE_RGB, flare.alpha)),
        });
    }
}

/// Concentric rings from the edge inwards; `color` gets the ring's offset
/// from the centre in `[0, 1]`.
fn fill_disc(
    ctx: &mut Context,
    x: f64,
    y: f64,
    radius: f64,
    step: f64,
    color: impl Fn(f64) -> Color,
) {
    let mut r = radius;
    while r > 0.0 {
        ctx.draw(&Circle {
            x,
            y,
            radius: r,
            color: color(r / radius),
        });
        r -= step;
    }
}

/// Surface coordinates have y growing downwards; the canvas has it up.
fn to_canvas((x, y): (f64, f64)) -> (f64, f64) {
    (x, CANVAS_SIZE - y)
}

/// Linear interpolation of the disc gradient at `offset` in `[0, 1]`.
fn gradient_at(offset: f64) -> [u8; 3] {
    let offset = offset.clamp(0.0, 1.0);
    for pair in SUN_GRADIENT.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if offset <= hi.0 {
            let t = (offset - lo.0) / (hi.0 - lo.0);
            return blend(hi.1, lo.1, t);
        }
    }
    SUN_GRADIENT[SUN_GRADIENT.len() - 1].1
}

/// `alpha` of `fg` over `bg`.
fn blend(fg: [u8; 3], bg: [u8; 3], alpha: f64) -> [u8; 3] {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |f: u8, b: u8| (b as f64 + (f as f64 - b as f64) * a).round() as u8;
    [mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])]
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(r, g, b)
}

fn shade_color(shade: CoreShade) -> Color {
    match shade {
        CoreShade::Intense => Color::Rgb(0x8B, 0x00, 0x00),
        CoreShade::Normal => Color::Rgb(0x4B, 0x00, 0x82),
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

fn flux_color(class: FluxClass) -> Color {
    match class {
        FluxClass::B => Color::Green,
        FluxClass::C => Color::Yellow,
        FluxClass::M => Color::LightRed,
        FluxClass::X => Color::Red,
    }
}

fn flare_color(class: FlareClass) -> Color {
    match class {
        FlareClass::Insignificant => Color::Green,
        FlareClass::C => Color::Yellow,
        FlareClass::M => Color::LightRed,
        FlareClass::X => Color::Red,
    }
}

fn draw_flux_chart(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let Some(reading) = &view.latest_flux else {
        let block = Block::default().borders(Borders::ALL).title(" X-ray flux ");
        let p = Paragraph::new("Waiting for the first reading...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let data = flux_points(&view.stream);
    let class = reading.class();
    let color = flux_color(class);
    let datasets = vec![
        Dataset::default()
            .name(reading.display())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&data),
    ];

    let x_max = (view.stream.len() as f64).max(10.0);
    let [y_min, y_max] = FLUX_LOG_BOUNDS;
    let chart = Chart::new(datasets)
        .block(
            Block::default().borders(Borders::ALL).title(Line::from(vec![
                Span::raw(" X-ray flux  "),
                Span::styled(reading.display(), Style::default().bold().fg(color)),
                Span::styled(
                    format!("  {}  {} ", reading.energy_band, reading.source),
                    Style::default().fg(Color::DarkGray),
                ),
            ])),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]).labels(vec![
            Line::from("0"),
            Line::from(format!("{}", view.stream.len())),
        ]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from("1e-7"),
            Line::from("1e-5"),
            Line::from("1e-3"),
        ]));

    f.render_widget(chart, area);
}

fn draw_prediction_chart(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let Some(latest) = view.latest_prediction() else {
        let block = Block::default().borders(Borders::ALL).title(" Forecast ");
        let p = Paragraph::new("Press p to request a flare prediction")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let data = prediction_points(app.prediction_samples());
    let color = flare_color(latest.flare_class);
    let datasets = vec![
        Dataset::default()
            .name(latest.percent())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&data),
    ];

    let source = if latest.fallback {
        "local draw"
    } else {
        latest.model_used.as_str()
    };
    let chart = Chart::new(datasets)
        .block(
            Block::default().borders(Borders::ALL).title(Line::from(vec![
                Span::raw(" Forecast  "),
                Span::styled(
                    format!("{} {}", latest.percent(), latest.flare_class.label()),
                    Style::default().bold().fg(color),
                ),
                Span::styled(
                    format!("  {} confidence · {source} ", latest.confidence.label()),
                    Style::default().fg(Color::DarkGray),
                ),
            ])),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, (PREDICTION_CHART_LEN - 1) as f64])
                .labels(vec![Line::from("older"), Line::from("latest")]),
        )
        .y_axis(Axis::default().bounds([0.0, 1.0]).labels(vec![
            Line::from("0%"),
            Line::from("50%"),
            Line::from("100%"),
        ]));

    f.render_widget(chart, area);
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

fn draw_panels(f: &mut Frame, area: Rect, app: &App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    draw_telemetry(f, cols[0], app);
    draw_metrics(f, cols[1], app);
}

fn draw_telemetry(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title(" Telemetry ");
    let Some(snapshot) = &app.view().telemetry else {
        f.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(&snapshot.status, Style::default().bold().fg(Color::Green)),
        Span::raw(format!("  {} active regions", snapshot.region_count())),
        Span::styled(
            format!("  {}", snapshot.source.as_deref().unwrap_or("")),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if snapshot.live_events.is_empty() {
        lines.push(Line::from(Span::styled(
            "No recent events",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for event in &snapshot.live_events {
        let color = event.flux_class().map(flux_color).unwrap_or(Color::White);
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<6}", event.class_type),
                Style::default().bold().fg(color),
            ),
            Span::raw(format!(
                "{:<9}",
                event.active_region.as_deref().unwrap_or("-")
            )),
            Span::styled(&event.begin_time, Style::default().fg(Color::DarkGray)),
        ]));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}

fn draw_metrics(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title(" Model metrics ");
    let view = &app.view().metrics;

    let (metrics, note) = match view {
        MetricsView::Loading => {
            f.render_widget(Paragraph::new("Loading...").block(block), area);
            return;
        }
        MetricsView::Unavailable { message } => {
            let p = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(p, area);
            return;
        }
        MetricsView::Ready { metrics } => (metrics, None),
        MetricsView::Degraded { metrics, note } => (metrics, Some(note.as_str())),
    };

    let rows: Vec<Row> = [
        ("Accuracy", metrics.accuracy),
        ("Precision", metrics.precision),
        ("Recall", metrics.recall),
        ("F1", metrics.f1),
        ("AUC-ROC", metrics.auc_roc),
    ]
    .into_iter()
    .map(|(name, v)| Row::new(vec![name.to_string(), format!("{:.1}%", v * 100.0)]))
    .collect();

    let title = match note {
        Some(note) => Line::from(vec![
            Span::raw(" Model metrics "),
            Span::styled(format!("({note}) "), Style::default().fg(Color::Yellow)),
        ]),
        None => Line::from(format!(
            " Model metrics  {} features · {} ",
            metrics.features_used, metrics.training_date
        )),
    };

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Length(8)])
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn draw_keys(f: &mut Frame, area: Rect, app: &App) {
    let mut text = String::from(" p: predict   q/Esc: quit");
    if let Some(status) = app.status() {
        text.push_str("   ");
        text.push_str(status);
    }
    let bar = Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_hits_stops() {
        assert_eq!(gradient_at(0.0), [0xFF, 0xD7, 0x00]);
        assert_eq!(gradient_at(0.7), [0xFF, 0x8C, 0x00]);
        assert_eq!(gradient_at(1.0), [0xFF, 0x45, 0x00]);
        assert_eq!(gradient_at(5.0), gradient_at(1.0));
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend([200, 100, 0], [0, 0, 0], 1.0), [200, 100, 0]);
        assert_eq!(blend([200, 100, 0], [0, 0, 0], 0.0), [0, 0, 0]);
        assert_eq!(blend([200, 100, 0], [0, 0, 0], 0.5), [100, 50, 0]);
    }

    #[test]
    fn canvas_flips_y() {
        assert_eq!(to_canvas((120.0, 150.0)), (120.0, 250.0));
        assert_eq!(to_canvas((200.0, 200.0)), (200.0, 200.0));
    }

    #[test]
    fn class_colours_escalate() {
        assert_eq!(flare_color(FlareClass::X), Color::Red);
        assert_eq!(flux_color(FluxClass::B), Color::Green);
    }
}
