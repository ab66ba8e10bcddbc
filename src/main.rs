mod backend;
mod config;
mod controller;
mod error;
mod history;
mod view_model;

use iced::{
    widget::{button, column, container, pick_list, row, scrollable, text, text_input, text_input::Id, Column},
    Element, Length, Task, Theme, Font, Subscription,
    time, clipboard,
    keyboard::{self, Key},
    event::{self, Event as IcedEvent},
    alignment,
    window,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use backend::{AskResponse, BackendClient, StatusResponse};
use controller::{BackendStatus, Controller, Phase};
use error::BackendError;
use history::{HistoryStore, KeyValueStore, MemoryStore, SqliteStore};
use view_model::OrderMode;

const PREVIEW_WIDTH: usize = 60;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = config::Config::load();
    let client = BackendClient::with_config(&config.backend.base_url, config.backend.timeout_secs)?;
    info!(base_url = client.base_url(), "using backend");

    let database = config.database_path();
    let storage: Box<dyn KeyValueStore> = match SqliteStore::open(&database) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, path = %database.display(), "history storage unavailable, keeping history in memory only");
            Box::new(MemoryStore::default())
        }
    };

    iced::application("Site Q&A", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: iced::Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(iced::Size::new(config.window.min_width as f32, config.window.min_height as f32)),
            position: window::Position::Centered,
            ..Default::default()
        })
        .default_font(Font::MONOSPACE)
        .run_with(move || App::new(client, storage))?;

    Ok(())
}

#[derive(Debug, Clone)]
enum Message {
    StatusChecked(Result<StatusResponse, Arc<BackendError>>),
    RecheckStatus,
    InputChanged(String),
    Submit,
    AnswerReceived(String, Result<AskResponse, Arc<BackendError>>),
    OrderChanged(OrderMode),
    SelectHistory(usize),
    ClearRequested,
    ClearConfirmed,
    ClearCancelled,
    Tick,
    CopyAnswer,
    Exit,
}

struct App {
    controller: Controller,
    client: BackendClient,
    loading_frame: usize,
    input_id: Id,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn check_status(client: BackendClient) -> Task<Message> {
    Task::future(async move {
        Message::StatusChecked(client.check_status().await.map_err(Arc::new))
    })
}

impl App {
    fn new(client: BackendClient, storage: Box<dyn KeyValueStore>) -> (Self, Task<Message>) {
        let mut controller = Controller::new(HistoryStore::load(storage));
        controller.begin_status_check();

        let input_id = Id::unique();
        let app = App {
            controller,
            client: client.clone(),
            loading_frame: 0,
            input_id: input_id.clone(),
        };

        let focus_task = text_input::focus(input_id);
        (app, Task::batch([focus_task, check_status(client)]))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::StatusChecked(result) => {
                self.controller.status_resolved(result);
                Task::none()
            }
            Message::RecheckStatus => {
                self.controller.begin_status_check();
                check_status(self.client.clone())
            }
            Message::InputChanged(value) => {
                self.controller.set_input(value);
                Task::none()
            }
            Message::Submit => {
                let question = match self.controller.begin_submit() {
                    Ok(question) => question,
                    Err(rejected) => {
                        info!(reason = %rejected, "submission rejected");
                        return Task::none();
                    }
                };
                self.loading_frame = 0;

                let client = self.client.clone();
                Task::future(async move {
                    let result = client.ask_question(&question).await.map_err(Arc::new);
                    Message::AnswerReceived(question, result)
                })
            }
            Message::AnswerReceived(question, result) => {
                match result {
                    Ok(response) => self.controller.answer_received(question, response, now_ms()),
                    Err(e) => self.controller.ask_failed(e),
                }
                Task::none()
            }
            Message::OrderChanged(mode) => {
                self.controller.set_order(mode);
                Task::none()
            }
            Message::SelectHistory(index) => {
                self.controller.select_history(index);
                Task::none()
            }
            Message::ClearRequested => {
                self.controller.request_clear();
                Task::none()
            }
            Message::ClearConfirmed => {
                self.controller.confirm_clear();
                Task::none()
            }
            Message::ClearCancelled => {
                self.controller.cancel_clear();
                Task::none()
            }
            Message::Tick => {
                if self.controller.phase() == Phase::Loading {
                    self.loading_frame = (self.loading_frame + 1) % 40;
                }
                Task::none()
            }
            Message::CopyAnswer => match self.controller.answer() {
                Some(answer) => clipboard::write(answer.text.clone()),
                None => Task::none(),
            },
            Message::Exit => {
                iced::exit()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.controller.phase() == Phase::Loading {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| {
            if let IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) = event
            {
                Some(Message::Exit)
            } else {
                None
            }
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<'_, Message> {
        let status = self.controller.status();
        let recheck = button(text("Recheck").size(13))
            .on_press_maybe((*status != BackendStatus::Checking).then_some(Message::RecheckStatus))
            .padding(6);
        let status_bar = row![text(status.label()).size(14).width(Length::Fill), recheck]
            .spacing(10)
            .align_y(alignment::Vertical::Center);

        let input = text_input("Ask a question about the site...", self.controller.input())
            .on_input(Message::InputChanged)
            .on_submit(Message::Submit)
            .padding(12)
            .size(16)
            .id(self.input_id.clone());
        let ask = button(text("Ask").size(16))
            .on_press_maybe(self.controller.can_submit().then_some(Message::Submit))
            .padding(12);
        let input_row = row![input, ask].spacing(10);

        let mut content = column![status_bar, input_row].spacing(12).padding(12);

        if let Some(notice) = self.controller.notice() {
            content = content.push(text(notice.to_string()).size(14));
        }

        content = content.push(self.answer_view());
        content = content.push(self.history_view());

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn answer_view(&self) -> Element<'_, Message> {
        if self.controller.phase() == Phase::Loading {
            let loading_frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            let loading_messages = [
                "Searching the site...",
                "Reading the relevant pages...",
                "Putting an answer together...",
                "Almost there...",
            ];

            let message_idx = (self.loading_frame / 10) % loading_messages.len();
            let spinner_idx = self.loading_frame % loading_frames.len();

            return container(
                column![
                    text(loading_frames[spinner_idx]).size(28),
                    text(loading_messages[message_idx]).size(14)
                ]
                .spacing(8)
                .align_x(alignment::Horizontal::Center),
            )
            .width(Length::Fill)
            .height(Length::FillPortion(3))
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .into();
        }

        let Some(answer) = self.controller.answer() else {
            return container(text("").size(14))
                .height(Length::FillPortion(3))
                .into();
        };

        let copy_button = container(
            button(text("[Copy]").size(13))
                .on_press(Message::CopyAnswer)
                .padding(6),
        )
        .width(Length::Fill)
        .align_x(alignment::Horizontal::Right);

        column![
            text(format!("Q: {}", answer.question)).size(14),
            scrollable(container(text(answer.text.clone()).size(15)).padding(8).width(Length::Fill))
                .height(Length::Fill),
            row![
                text(format!("Inference time: {}", answer.inference_time)).size(13).width(Length::Fill),
                copy_button
            ]
            .align_y(alignment::Vertical::Center),
        ]
        .spacing(8)
        .height(Length::FillPortion(3))
        .into()
    }

    fn history_view(&self) -> Element<'_, Message> {
        let order = pick_list(OrderMode::ALL, Some(self.controller.order()), Message::OrderChanged)
            .text_size(13);

        let clear_controls: Element<Message> = if self.controller.is_confirming_clear() {
            row![
                text("Clear all history?").size(13),
                button(text("Yes").size(13)).on_press(Message::ClearConfirmed).padding(6),
                button(text("No").size(13)).on_press(Message::ClearCancelled).padding(6),
            ]
            .spacing(8)
            .align_y(alignment::Vertical::Center)
            .into()
        } else {
            button(text("Clear history").size(13))
                .on_press(Message::ClearRequested)
                .padding(6)
                .into()
        };

        let header = row![text("History").size(16).width(Length::Fill), order, clear_controls]
            .spacing(10)
            .align_y(alignment::Vertical::Center);

        let records = self.controller.history_view();
        let list: Element<Message> = if records.is_empty() {
            text("No questions asked yet.").size(13).into()
        } else {
            Column::with_children(records.iter().enumerate().map(|(i, record)| {
                button(
                    row![
                        text(view_model::preview(&record.question, PREVIEW_WIDTH)).size(13).width(Length::Fill),
                        text(record.inference_time.clone()).size(12),
                    ]
                    .spacing(8),
                )
                .on_press(Message::SelectHistory(i))
                .width(Length::Fill)
                .padding(6)
                .into()
            }))
            .spacing(4)
            .into()
        };

        column![header, scrollable(list).height(Length::Fill)]
            .spacing(8)
            .height(Length::FillPortion(2))
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}
