//! Terminal Kanban board.
//!
//! One bordered list per stage, a task panel, a status line, and an optional
//! metrics footer. Space picks up the selected lead and drops it on the
//! selected column, driving the drag state machine.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};

use crate::drag::DragHandler;
use crate::errors::Error;
use crate::events::DataEvent;
use crate::export;
use crate::filters::{filter, LeadFilters};
use crate::metrics;
use crate::model::{Lead, LeadDraft, Priority, TaskDraft, Theme};
use crate::pipeline::Pipeline;

const REPORT_FILE: &str = "leadkan_report.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Board,
    Tasks,
}

struct Status {
    text: String,
    error: bool,
}

pub struct App {
    pipeline: Pipeline,
    events: Receiver<DataEvent>,
    filters: LeadFilters,
    drag: DragHandler,
    focus: Focus,
    selected_stage: usize,
    selected_lead: usize,
    selected_task: usize,
    show_metrics: bool,
    status: Option<Status>,
    report_path: PathBuf,
}

impl App {
    pub fn new(mut pipeline: Pipeline, data_dir: &std::path::Path) -> Self {
        let events = pipeline.subscribe();
        Self {
            pipeline,
            events,
            filters: LeadFilters::default(),
            drag: DragHandler::new(),
            focus: Focus::Board,
            selected_stage: 0,
            selected_lead: 0,
            selected_task: 0,
            show_metrics: false,
            status: None,
            report_path: data_dir.join(REPORT_FILE),
        }
    }

    /// Leads shown in a column: the active filters applied, then the stage.
    fn visible_leads(&self, stage_id: &str) -> Vec<Lead> {
        filter(self.pipeline.leads(), &self.filters, Utc::now())
            .into_iter()
            .filter(|l| l.stage == stage_id)
            .collect()
    }

    fn selected_lead_id(&self) -> Option<i64> {
        let stage = self.pipeline.stages().get(self.selected_stage)?;
        self.visible_leads(&stage.id)
            .get(self.selected_lead)
            .map(|l| l.id)
    }

    fn ok(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            error: false,
        });
    }

    fn fail(&mut self, err: &Error) {
        self.status = Some(Status {
            text: err.to_string(),
            error: true,
        });
    }

    /// Invalidation signals only move the cursors back into range; the data
    /// itself is re-read from the pipeline on the next draw.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                DataEvent::LeadsUpdated | DataEvent::StagesUpdated => {
                    let stages = self.pipeline.stages().len();
                    if self.selected_stage >= stages {
                        self.selected_stage = stages.saturating_sub(1);
                    }
                    self.clamp_lead_cursor();
                }
                DataEvent::TasksUpdated => {
                    let tasks = self.pipeline.tasks().len();
                    if self.selected_task >= tasks {
                        self.selected_task = tasks.saturating_sub(1);
                    }
                }
            }
        }
    }

    fn clamp_lead_cursor(&mut self) {
        let count = self
            .pipeline
            .stages()
            .get(self.selected_stage)
            .map(|s| self.visible_leads(&s.id).len())
            .unwrap_or(0);
        if self.selected_lead >= count {
            self.selected_lead = count.saturating_sub(1);
        }
    }

    fn base_style(&self) -> Style {
        match self.pipeline.theme() {
            Theme::Dark => Style::default().fg(Color::White),
            Theme::Light => Style::default().fg(Color::Black).bg(Color::White),
        }
    }

    fn render(&self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![
                Constraint::Min(8),
                Constraint::Length(7),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_board(f, rows[0]);
        self.render_tasks(f, rows[1]);
        self.render_status(f, rows[2]);
        self.render_footer(f, rows[3]);
    }

    fn render_board(&self, f: &mut Frame, area: Rect) {
        let stages = self.pipeline.stages();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                stages
                    .iter()
                    .map(|_| Constraint::Ratio(1, stages.len().max(1) as u32))
                    .collect::<Vec<_>>(),
            )
            .split(area);

        for (i, stage) in stages.iter().enumerate() {
            let leads = self.visible_leads(&stage.id);
            let items: Vec<ListItem> = leads
                .iter()
                .enumerate()
                .map(|(j, lead)| {
                    let grabbed = self.drag.dragging() == Some(lead.id);
                    let selected = self.focus == Focus::Board
                        && i == self.selected_stage
                        && j == self.selected_lead;
                    let marker = if grabbed { "> " } else { "  " };
                    let mut style = self.base_style();
                    if grabbed {
                        style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                    } else if selected {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    ListItem::new(Line::from(vec![
                        Span::raw(marker),
                        Span::styled(lead.name.clone(), style),
                        Span::styled(
                            format!(" ${:.0}", lead.expected_revenue),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]))
                })
                .collect();

            let border = if self.focus == Focus::Board && i == self.selected_stage {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(stage_color(&stage.color))
            };
            let list = List::new(items).block(
                Block::default()
                    .title(format!("{} ({})", stage.name, leads.len()))
                    .borders(Borders::ALL)
                    .border_style(border),
            );
            f.render_widget(list, columns[i]);
        }
    }

    fn render_tasks(&self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .pipeline
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let mark = if task.completed { "[x]" } else { "[ ]" };
                let due = task
                    .due_date
                    .map(|d| format!(" due {d}"))
                    .unwrap_or_default();
                let lead = task
                    .lead_id
                    .and_then(|id| self.pipeline.lead(id))
                    .map(|l| format!(" · {}", l.name))
                    .unwrap_or_default();
                let mut style = self.base_style();
                if self.focus == Focus::Tasks && i == self.selected_task {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                ListItem::new(Line::from(Span::styled(
                    format!(
                        "{mark} {} ({}){due}{lead}",
                        task.title,
                        priority_label(task.priority)
                    ),
                    style,
                )))
            })
            .collect();

        let border = if self.focus == Focus::Tasks {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let list = List::new(items).block(
            Block::default()
                .title("Tasks")
                .borders(Borders::ALL)
                .border_style(border),
        );
        f.render_widget(list, area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let line = match &self.status {
            Some(status) => {
                let color = if status.error { Color::Red } else { Color::Green };
                Line::from(Span::styled(
                    status.text.clone(),
                    Style::default().fg(color),
                ))
            }
            None => Line::from(Span::styled(
                "space grab/drop · a add · d delete · f/r/s filters · m metrics · t theme · e export · q quit",
                Style::default().fg(Color::DarkGray),
            )),
        };
        f.render_widget(Paragraph::new(line), area);
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let sub = self.pipeline.subscription();
        let plan = sub.plan();
        let usage = match sub.lead_limit() {
            Some(limit) => format!(
                "plan: {} {}/{} ({}%)",
                plan.label(),
                self.pipeline.leads().len(),
                limit,
                self.pipeline.usage_percent()
            ),
            None => format!("plan: {} (unlimited)", plan.label()),
        };
        let text = if self.show_metrics {
            let m = metrics::compute(self.pipeline.leads(), Utc::now());
            format!(
                "{usage} · leads: {} · new this week: {} · qualified: {} · proposals: {} · won: ${:.0} · conversion: {}%",
                m.total, m.new_this_week, m.qualified, m.proposals, m.won_revenue, m.conversion_rate
            )
        } else {
            let user = self
                .pipeline
                .auth()
                .current_user()
                .unwrap_or("anonymous (not saving)");
            format!("{usage} · user: {user}")
        };
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(Color::DarkGray),
            ))),
            area,
        );
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.drain_events();
        terminal.draw(|f| app.render(f))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        app.status = None;
        match key.code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Esc => app.drag.cancel(),
            KeyCode::Tab => {
                app.focus = match app.focus {
                    Focus::Board => Focus::Tasks,
                    Focus::Tasks => Focus::Board,
                };
            }
            KeyCode::Left => {
                if app.focus == Focus::Board && app.selected_stage > 0 {
                    app.selected_stage -= 1;
                    app.clamp_lead_cursor();
                }
            }
            KeyCode::Right => {
                if app.focus == Focus::Board
                    && app.selected_stage + 1 < app.pipeline.stages().len()
                {
                    app.selected_stage += 1;
                    app.clamp_lead_cursor();
                }
            }
            KeyCode::Up => match app.focus {
                Focus::Board => app.selected_lead = app.selected_lead.saturating_sub(1),
                Focus::Tasks => app.selected_task = app.selected_task.saturating_sub(1),
            },
            KeyCode::Down => match app.focus {
                Focus::Board => {
                    app.selected_lead += 1;
                    app.clamp_lead_cursor();
                }
                Focus::Tasks => {
                    if app.selected_task + 1 < app.pipeline.tasks().len() {
                        app.selected_task += 1;
                    }
                }
            },
            KeyCode::Char(' ') => grab_or_drop(app),
            KeyCode::Char('a') => add_lead(app),
            KeyCode::Char('n') => add_task(app),
            KeyCode::Char('c') => {
                if app.focus == Focus::Tasks {
                    if let Some(id) = app.pipeline.tasks().get(app.selected_task).map(|t| t.id) {
                        if let Err(err) = app.pipeline.toggle_task(id) {
                            app.fail(&err);
                        }
                    }
                }
            }
            KeyCode::Char('d') => delete_selected(app),
            KeyCode::Char('f') => app.filters.high_value = !app.filters.high_value,
            KeyCode::Char('r') => app.filters.recent = !app.filters.recent,
            KeyCode::Char('s') => app.filters.stale = !app.filters.stale,
            KeyCode::Char('m') => app.show_metrics = !app.show_metrics,
            KeyCode::Char('t') => match app.pipeline.toggle_theme() {
                Ok(Theme::Light) => app.ok("theme: light"),
                Ok(Theme::Dark) => app.ok("theme: dark"),
                Err(err) => app.fail(&err),
            },
            KeyCode::Char('e') => export_report(app),
            KeyCode::Char('u') => {
                let plan = app.pipeline.upgrade_plan();
                app.ok(format!("upgraded to {} plan", plan.label()));
            }
            KeyCode::Char('o') => {
                app.pipeline.sign_out();
                app.ok("signed out, changes stay in memory only");
            }
            KeyCode::Char('S') => add_stage(app),
            KeyCode::Char('X') => remove_stage(app),
            KeyCode::Char('<') => move_stage(app, -1),
            KeyCode::Char('>') => move_stage(app, 1),
            _ => {}
        }
    }
}

fn grab_or_drop(app: &mut App) {
    if app.drag.dragging().is_some() {
        let Some(stage_id) = app
            .pipeline
            .stages()
            .get(app.selected_stage)
            .map(|s| s.id.clone())
        else {
            app.drag.cancel();
            return;
        };
        match app.drag.drop_on(&mut app.pipeline, &stage_id) {
            Ok(Some(confirmation)) => app.ok(confirmation),
            Ok(None) => {}
            Err(err) => app.fail(&err),
        }
    } else if let Some(id) = app.selected_lead_id() {
        app.drag.start(id);
    }
}

fn add_lead(app: &mut App) {
    let Some(stage_id) = app
        .pipeline
        .stages()
        .get(app.selected_stage)
        .map(|s| s.id.clone())
    else {
        return;
    };
    let Some(name) = prompt("Lead name") else {
        return;
    };
    let company = prompt("Company").unwrap_or_default();
    let email = prompt("Email").unwrap_or_default();
    let revenue = prompt("Expected revenue").unwrap_or_default();
    let expected_revenue = if revenue.is_empty() {
        0.0
    } else {
        match revenue.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                app.fail(&Error::validation(
                    "expectedRevenue",
                    "expected revenue must be a number",
                ));
                return;
            }
        }
    };
    let draft = LeadDraft {
        name,
        company,
        email,
        stage: stage_id,
        expected_revenue,
        ..Default::default()
    };
    match app.pipeline.add_lead(draft) {
        Ok(_) => app.ok("lead added"),
        Err(err) => app.fail(&err),
    }
}

fn add_task(app: &mut App) {
    let Some(title) = prompt("Task title") else {
        return;
    };
    let priority = match prompt("Priority (low/medium/high)").as_deref() {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        _ => Priority::Medium,
    };
    let due_date = prompt("Due date (YYYY-MM-DD, blank for none)")
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok());
    let lead_id = app.selected_lead_id();
    let draft = TaskDraft {
        title,
        priority,
        due_date,
        lead_id,
        ..Default::default()
    };
    match app.pipeline.add_task(draft) {
        Ok(_) => app.ok("task added"),
        Err(err) => app.fail(&err),
    }
}

fn delete_selected(app: &mut App) {
    match app.focus {
        Focus::Board => {
            if let Some(id) = app.selected_lead_id() {
                match app.pipeline.remove_lead(id) {
                    Ok(()) => app.ok("lead removed"),
                    Err(err) => app.fail(&err),
                }
            }
        }
        Focus::Tasks => {
            if let Some(id) = app.pipeline.tasks().get(app.selected_task).map(|t| t.id) {
                match app.pipeline.remove_task(id) {
                    Ok(()) => app.ok("task removed"),
                    Err(err) => app.fail(&err),
                }
            }
        }
    }
}

fn add_stage(app: &mut App) {
    let Some(name) = prompt("Stage name") else {
        return;
    };
    let color = prompt("Color").unwrap_or_else(|| "white".to_string());
    match app.pipeline.add_stage(&name, &color) {
        Ok(id) => app.ok(format!("stage '{id}' added")),
        Err(err) => app.fail(&err),
    }
}

fn remove_stage(app: &mut App) {
    let Some(stage_id) = app
        .pipeline
        .stages()
        .get(app.selected_stage)
        .map(|s| s.id.clone())
    else {
        return;
    };
    match app.pipeline.remove_stage(&stage_id) {
        Ok(()) => app.ok(format!("stage '{stage_id}' removed, leads reassigned")),
        Err(err) => app.fail(&err),
    }
}

fn move_stage(app: &mut App, direction: isize) {
    let Some(stage_id) = app
        .pipeline
        .stages()
        .get(app.selected_stage)
        .map(|s| s.id.clone())
    else {
        return;
    };
    match app.pipeline.move_stage(&stage_id, direction) {
        Ok(()) => {
            if let Some(pos) = app.pipeline.stages().iter().position(|s| s.id == stage_id) {
                app.selected_stage = pos;
            }
        }
        Err(err) => app.fail(&err),
    }
}

fn export_report(app: &mut App) {
    let rows = metrics::monthly_report(app.pipeline.leads());
    match export::export_report(&rows, &app.report_path) {
        Ok(()) => app.ok(format!("report written to {}", app.report_path.display())),
        Err(err) => app.fail(&Error::Store(err)),
    }
}

fn stage_color(name: &str) -> Color {
    match name {
        "blue" => Color::Blue,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "red" => Color::Red,
        _ => Color::White,
    }
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input);
    enable_raw_mode().ok();
    match read {
        Ok(_) => Some(input.trim().to_string()),
        Err(_) => None,
    }
}
